//! Domain entities produced by the demultiplexer and consumed by callers of
//! the facade (spec §3.3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar. Immutable once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Epoch seconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Zero for markets without volume, or when the server omits it.
    pub volume: f64,
}

impl Candle {
    /// `timestamp` as a calendar time, for callers that don't want to work
    /// in raw epoch seconds.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// A snapshot of a symbol's quote-side metadata, assembled from `qsd`
/// frames. Every field beyond `symbol` is optional because the server only
/// ever sends the fields that changed since the previous snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub current_price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<f64>,
    pub last_trade_time: Option<i64>,
    /// Every field the server sent under `p[1].v`, keyed by its wire name,
    /// for callers that need a field not promoted to a named attribute.
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl QuoteSnapshot {
    pub(crate) fn merge_fields(&mut self, fields: &serde_json::Map<String, serde_json::Value>) {
        for (key, value) in fields {
            match key.as_str() {
                "lp" => self.current_price = value.as_f64(),
                "ch" => self.change = value.as_f64(),
                "chp" => self.change_percent = value.as_f64(),
                "volume" => self.volume = value.as_f64(),
                "lp_time" => self.last_trade_time = value.as_i64(),
                _ => {}
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

/// One inbound `du`/`timescale_update` envelope's worth of candles, grouped
/// by the series key the server tagged them with.
#[derive(Debug, Clone, Default)]
pub struct SeriesUpdate {
    pub session: String,
    pub series: BTreeMap<String, Vec<Candle>>,
}

/// A sealed, handshake-time description of one subscription. Lives exactly
/// as long as its owning Transport.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub chart_session: String,
    pub quote_session: String,
    pub symbol: String,
    pub interval: String,
    pub bar_count: u32,
    pub series_key: String,
    pub symbol_key: String,
}

impl Subscription {
    pub(crate) fn new(chart_session: String, quote_session: String, symbol: String, interval: String, bar_count: u32) -> Self {
        Self {
            chart_session,
            quote_session,
            symbol,
            interval,
            bar_count,
            series_key: "sds_1".to_string(),
            symbol_key: "sds_sym_1".to_string(),
        }
    }
}
