//! This module provides a namespace to declare the errors that can occur
//! in this crate.

use tokio_tungstenite::tungstenite;

/// Error types that can occur while working with this crate.
///
/// This collapses the taxonomy of error kinds for the streaming core into a
/// single enum. The codec and demux loops recover locally from JSON parse
/// failures and unknown verbs; everything else surfaces through here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid interval '{value}': {reason}")]
    InvalidInterval { value: String, reason: &'static str },

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("error with the websocket {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("error in the conversion from/to JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("historical fetch timed out after {0:?} with partial data")]
    Timeout(std::time::Duration),

    #[error("no data received before the historical fetch deadline")]
    NoData,

    #[error("connection closed by peer or keep-alive watchdog")]
    ConnectionClosed,

    #[error("symbol validator request failed: {0}")]
    ValidatorTransport(#[from] reqwest::Error),
}
