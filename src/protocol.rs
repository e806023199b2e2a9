//! Message builder: constructs the JSON envelopes for each verb the
//! handshake/subscription driver (§4.E) sends, with the exact parameter
//! order the server expects (spec §4.C).

use serde::Serialize;
use serde_json::{json, Value};

/// The compact `{"m":<verb>,"p":[...]}` envelope. Field order is
/// significant on the wire (`m` before `p`); `serde_json` preserves struct
/// declaration order for named structs, so no custom `Serialize` is needed.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub m: String,
    pub p: Vec<Value>,
}

impl Envelope {
    fn new(method: &str, params: Vec<Value>) -> Self {
        Self { m: method.to_string(), p: params }
    }

    /// Serializes to the compact (no insignificant whitespace) JSON that
    /// goes into the frame payload.
    pub fn to_compact_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// The unauthenticated placeholder token sent as the very first outbound
/// frame; see spec §1 non-goals (no authenticated access).
pub const UNAUTHORIZED_TOKEN: &str = "unauthorized_user_token";

/// The volume-study id pinned by spec §4.C/§9; exposed so a future upstream
/// rename doesn't require a code change (see `Config::volume_study_id`).
pub const DEFAULT_VOLUME_STUDY_ID: &str = "Volume@tv-basicstudies-241";

/// The fixed 28 quote-field ids, order preserved, sent once via
/// `quote_set_fields`.
pub const QUOTE_FIELDS: [&str; 28] = [
    "base-currency-logoid",
    "ch",
    "chp",
    "currency-logoid",
    "currency_code",
    "current_session",
    "description",
    "exchange",
    "format",
    "fractional",
    "is_tradable",
    "language",
    "local_description",
    "logoid",
    "lp",
    "lp_time",
    "minmov",
    "minmove2",
    "original_name",
    "pricescale",
    "pro_name",
    "short_name",
    "type",
    "update_mode",
    "volume",
    "ask",
    "bid",
    "fundamentals",
];

pub fn set_auth_token() -> Envelope {
    Envelope::new("set_auth_token", vec![json!(UNAUTHORIZED_TOKEN)])
}

pub fn set_locale() -> Envelope {
    Envelope::new("set_locale", vec![json!("en"), json!("US")])
}

pub fn chart_create_session(chart_session: &str) -> Envelope {
    Envelope::new("chart_create_session", vec![json!(chart_session), json!("")])
}

pub fn quote_create_session(quote_session: &str) -> Envelope {
    Envelope::new("quote_create_session", vec![json!(quote_session)])
}

pub fn quote_set_fields(quote_session: &str) -> Envelope {
    let mut params = vec![json!(quote_session)];
    params.extend(QUOTE_FIELDS.iter().map(|f| json!(f)));
    Envelope::new("quote_set_fields", params)
}

pub fn quote_hibernate_all(quote_session: &str) -> Envelope {
    Envelope::new("quote_hibernate_all", vec![json!(quote_session)])
}

/// `{"adjustment":"splits","symbol":"<EXCHANGE:SYMBOL>"}`, serialized to a
/// JSON *string* (it is embedded as a string parameter, not a nested
/// object).
pub fn symbol_json(symbol: &str) -> String {
    json!({"adjustment": "splits", "symbol": symbol}).to_string()
}

/// The extended form used for the multi-symbol ticker, additionally setting
/// `currency-id` and `session`.
pub fn symbol_json_ticker(symbol: &str) -> String {
    json!({
        "adjustment": "splits",
        "symbol": symbol,
        "currency-id": "USD",
        "session": "regular",
    })
    .to_string()
}

pub fn quote_add_symbols(quote_session: &str, symbol_json: &str) -> Envelope {
    Envelope::new("quote_add_symbols", vec![json!(quote_session), json!(symbol_json)])
}

pub fn quote_fast_symbols(quote_session: &str, symbol: &str) -> Envelope {
    Envelope::new("quote_fast_symbols", vec![json!(quote_session), json!(symbol)])
}

pub fn resolve_symbol(chart_session: &str, symbol_key: &str, symbol_json: &str) -> Envelope {
    Envelope::new(
        "resolve_symbol",
        vec![json!(chart_session), json!(symbol_key), json!(format!("={symbol_json}"))],
    )
}

pub fn create_series(chart_session: &str, series_key: &str, symbol_key: &str, interval: &str, bar_count: u32) -> Envelope {
    Envelope::new(
        "create_series",
        vec![
            json!(chart_session),
            json!(series_key),
            json!("s1"),
            json!(symbol_key),
            json!(interval),
            json!(bar_count),
            json!(""),
        ],
    )
}

pub fn create_study(chart_session: &str, series_key: &str, volume_study_id: &str) -> Envelope {
    Envelope::new(
        "create_study",
        vec![
            json!(chart_session),
            json!("st1"),
            json!("st1"),
            json!(series_key),
            json!(volume_study_id),
            json!({}),
        ],
    )
}
