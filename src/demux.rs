//! Demultiplexes the single stream of decoded JSON envelopes coming off a
//! [`crate::transport::Transport`] into typed domain events, keyed by the
//! verb the server used (spec §4.F).

use serde_json::Value;

use crate::entities::{Candle, QuoteSnapshot, SeriesUpdate};
use crate::errors::Error;

/// One classified inbound event. `Unknown` is not an error: the protocol
/// evolves server-side and an unrecognized verb should not tear down the
/// stream (spec §7, "unknown verbs are ignored, not fatal").
#[derive(Debug, Clone)]
pub enum Event {
    Series(SeriesUpdate),
    /// Marks that a chart session's backfill is complete; no more
    /// historical bars will arrive for it (spec §4.G, scenario S7).
    SeriesCompleted { chart_session: String },
    Quote(QuoteSnapshot),
    SymbolError { chart_session: String, message: String },
    CriticalError { code: i64, message: String },
    Unknown(String),
}

/// Classifies one decoded JSON envelope. `m` is the verb; `p` carries its
/// positional parameters exactly as the server sent them.
pub fn classify(envelope: &Value) -> Result<Event, Error> {
    let m = envelope
        .get("m")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedFrame("envelope missing 'm'".to_string()))?;
    let p = envelope
        .get("p")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::MalformedFrame("envelope missing 'p'".to_string()))?;

    match m {
        "du" | "timescale_update" => parse_series_update(p),
        "series_completed" => parse_series_completed(p),
        "qsd" => parse_quote_data(p),
        "symbol_error" => parse_symbol_error(p),
        "protocol_error" | "critical_error" => parse_critical_error(p),
        other => Ok(Event::Unknown(other.to_string())),
    }
}

fn parse_series_update(p: &[Value]) -> Result<Event, Error> {
    let chart_session = p
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedFrame("data update missing session id".to_string()))?
        .to_string();
    let body = p
        .get(1)
        .and_then(Value::as_object)
        .ok_or_else(|| Error::MalformedFrame("data update missing body".to_string()))?;

    let mut update = SeriesUpdate { session: chart_session, ..Default::default() };
    for (series_key, series_value) in body {
        let Some(points) = series_value.get("s").and_then(Value::as_array) else {
            continue;
        };
        let mut candles = Vec::with_capacity(points.len());
        for point in points {
            if let Some(candle) = parse_candle(point) {
                candles.push(candle);
            }
        }
        update.series.insert(series_key.clone(), candles);
    }
    Ok(Event::Series(update))
}

fn parse_candle(point: &Value) -> Option<Candle> {
    let v = point.get("v")?.as_array()?;
    Some(Candle {
        timestamp: v.first()?.as_f64()? as i64,
        open: v.get(1)?.as_f64()?,
        high: v.get(2)?.as_f64()?,
        low: v.get(3)?.as_f64()?,
        close: v.get(4)?.as_f64()?,
        volume: v.get(5).and_then(Value::as_f64).unwrap_or(0.0),
    })
}

/// `series_completed` carries the chart session as its first parameter,
/// followed by the series id and a status string we don't need to inspect:
/// its arrival is itself the readiness signal (spec §4.G).
fn parse_series_completed(p: &[Value]) -> Result<Event, Error> {
    let chart_session = p
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedFrame("series_completed missing session id".to_string()))?
        .to_string();
    Ok(Event::SeriesCompleted { chart_session })
}

fn parse_quote_data(p: &[Value]) -> Result<Event, Error> {
    let entry = p
        .get(1)
        .and_then(Value::as_object)
        .ok_or_else(|| Error::MalformedFrame("quote data missing body".to_string()))?;
    let symbol = entry
        .get("n")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedFrame("quote data missing symbol name".to_string()))?
        .to_string();

    let mut snapshot = QuoteSnapshot { symbol, ..Default::default() };
    if let Some(fields) = entry.get("v").and_then(Value::as_object) {
        snapshot.merge_fields(fields);
    }
    Ok(Event::Quote(snapshot))
}

fn parse_symbol_error(p: &[Value]) -> Result<Event, Error> {
    let chart_session = p.first().and_then(Value::as_str).unwrap_or_default().to_string();
    let message = p.get(1).and_then(Value::as_str).unwrap_or("unknown symbol error").to_string();
    Ok(Event::SymbolError { chart_session, message })
}

fn parse_critical_error(p: &[Value]) -> Result<Event, Error> {
    let code = p.first().and_then(Value::as_i64).unwrap_or(-1);
    let message = p.get(1).and_then(Value::as_str).unwrap_or("unknown protocol error").to_string();
    Ok(Event::CriticalError { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_data_update_into_candles() {
        let envelope = json!({
            "m": "du",
            "p": ["cs_x", {"sds_1": {"s": [{"i": 0, "v": [1_700_000_000.0, 1.0, 2.0, 0.5, 1.5, 100.0]}]}}]
        });
        let event = classify(&envelope).unwrap();
        match event {
            Event::Series(update) => {
                assert_eq!(update.session, "cs_x");
                let candles = &update.series["sds_1"];
                assert_eq!(candles.len(), 1);
                assert_eq!(candles[0].open, 1.0);
                assert_eq!(candles[0].volume, 100.0);
            }
            other => panic!("expected Series, got {other:?}"),
        }
    }

    #[test]
    fn data_update_without_volume_defaults_to_zero() {
        let envelope = json!({
            "m": "du",
            "p": ["cs_x", {"sds_1": {"s": [{"i": 0, "v": [1.0, 2.0, 3.0, 4.0, 5.0]}]}}]
        });
        let Event::Series(update) = classify(&envelope).unwrap() else { panic!("expected Series") };
        assert_eq!(update.series["sds_1"][0].volume, 0.0);
    }

    #[test]
    fn classifies_quote_data() {
        let envelope = json!({
            "m": "qsd",
            "p": ["qs_x", {"n": "BINANCE:BTCUSDT", "s": "ok", "v": {"lp": 65000.5, "volume": 12.0}}]
        });
        let Event::Quote(snap) = classify(&envelope).unwrap() else { panic!("expected Quote") };
        assert_eq!(snap.symbol, "BINANCE:BTCUSDT");
        assert_eq!(snap.current_price, Some(65000.5));
    }

    #[test]
    fn classifies_series_completed() {
        let envelope = json!({"m": "series_completed", "p": ["cs_x", "sds_1", "s1", "ok"]});
        let Event::SeriesCompleted { chart_session } = classify(&envelope).unwrap() else {
            panic!("expected SeriesCompleted")
        };
        assert_eq!(chart_session, "cs_x");
    }

    #[test]
    fn unrecognized_verb_is_unknown_not_error() {
        let envelope = json!({"m": "some_future_verb", "p": []});
        assert!(matches!(classify(&envelope).unwrap(), Event::Unknown(v) if v == "some_future_verb"));
    }

    #[test]
    fn critical_error_carries_code_and_message() {
        let envelope = json!({"m": "critical_error", "p": [429, "rate limited"]});
        let Event::CriticalError { code, message } = classify(&envelope).unwrap() else { panic!("expected CriticalError") };
        assert_eq!(code, 429);
        assert_eq!(message, "rate limited");
    }

    #[test]
    fn missing_m_field_is_malformed() {
        let envelope = json!({"p": []});
        assert!(matches!(classify(&envelope), Err(Error::MalformedFrame(_))));
    }
}
