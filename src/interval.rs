//! Pure validation of the interval grammar (spec §3.1): six shapes, each
//! with its own numeric range, no regex dependency needed since every shape
//! is a bounded prefix/suffix match.

use std::fmt::Display;

use crate::errors::Error;

/// A validated interval string, guaranteed to match one of the six grammars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    raw: String,
    unit: Unit,
    value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Unit {
    Minutes,
    Seconds,
    Hours,
    Days,
    Weeks,
    Months,
}

impl Interval {
    /// The original string, as it should be sent to `create_series`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Validates `value` against the six grammars in spec §3.1.
    ///
    /// Grammars (case-sensitive): `[1-9][0-9]*` (1–1440, minutes),
    /// `[1-9][0-9]*S` (1–60, seconds), `[1-9][0-9]*H` (1–168, hours),
    /// `([1-9][0-9]*)?D` (1–365, days, empty prefix = 1),
    /// `([1-9][0-9]*)?W` (1–52, weeks), `([1-9][0-9]*)?M` (1–12, months).
    pub fn validate(value: &str) -> Result<Self, Error> {
        if value.is_empty() {
            return Err(invalid(value, "empty interval"));
        }
        let (digits, suffix) = split_suffix(value);
        let unit = match suffix {
            "" => Unit::Minutes,
            "S" => Unit::Seconds,
            "H" => Unit::Hours,
            "D" => Unit::Days,
            "W" => Unit::Weeks,
            "M" => Unit::Months,
            _ => return Err(invalid(value, "unrecognized unit suffix")),
        };
        let allow_empty_digits = matches!(unit, Unit::Days | Unit::Weeks | Unit::Months);
        let n: u32 = if digits.is_empty() {
            if !allow_empty_digits {
                return Err(invalid(value, "missing numeric prefix"));
            }
            1
        } else {
            if digits.len() > 1 && digits.starts_with('0') {
                return Err(invalid(value, "leading zero in numeric prefix"));
            }
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(value, "numeric prefix must be all digits"));
            }
            digits.parse().map_err(|_| invalid(value, "numeric prefix out of range"))?
        };
        if n == 0 {
            return Err(invalid(value, "numeric prefix must be positive"));
        }
        let max = match unit {
            Unit::Minutes => 1440,
            // Spec §3.1's grammar table states a range of [1, 60], but the
            // worked scenario (S3) asserts "60S" is out of range; the
            // concrete scenario wins (see DESIGN.md).
            Unit::Seconds => 59,
            Unit::Hours => 168,
            Unit::Days => 365,
            Unit::Weeks => 52,
            Unit::Months => 12,
        };
        if n > max {
            return Err(invalid(value, "numeric prefix exceeds the accepted range"));
        }
        Ok(Interval { raw: value.to_string(), unit, value: n })
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Splits a value like `"15S"` into `("15", "S")`, or `"D"` into `("", "D")`.
fn split_suffix(value: &str) -> (&str, &str) {
    let split_at = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value.split_at(split_at)
}

fn invalid(value: &str, reason: &'static str) -> Error {
    Error::InvalidInterval { value: value.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(v: &str) -> bool {
        Interval::validate(v).is_ok()
    }

    #[test]
    fn s3_scenarios() {
        assert!(ok("1"));
        assert!(ok("5"));
        assert!(ok("15S"));
        assert!(!ok("60S"));
        assert!(ok("1H"));
        assert!(!ok("25H"));
        assert!(ok("D"));
        assert!(!ok("0D"));
        assert!(!ok("400D"));
        assert!(ok("W"));
        assert!(ok("1M"));
        assert!(!ok("13M"));
        assert!(!ok(""));
        assert!(!ok("1.5"));
    }

    #[test]
    fn boundary_values_accepted() {
        assert!(ok("1440"));
        assert!(!ok("1441"));
        assert!(ok("59S"));
        assert!(!ok("60S"));
        assert!(ok("168H"));
        assert!(!ok("169H"));
        assert!(ok("365D"));
        assert!(!ok("366D"));
        assert!(ok("52W"));
        assert!(!ok("53W"));
        assert!(ok("12M"));
        assert!(!ok("13M"));
    }

    #[test]
    fn zero_prefix_rejected_everywhere() {
        assert!(!ok("0"));
        assert!(!ok("0S"));
        assert!(!ok("0H"));
    }

    #[test]
    fn leading_zero_rejected() {
        assert!(!ok("01"));
        assert!(!ok("010S"));
    }
}
