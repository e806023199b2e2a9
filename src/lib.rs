//! # quotewire
//!
//! A streaming client for a length-framed, JSON-over-WebSocket market-data
//! service: candles, quotes, and historical backfills over one multiplexed
//! `~m~N~m~<payload>` connection.
//!
//! ## Layout
//!
//! * [`frame`] — the `~m~N~m~` length-prefix codec and heartbeat detection.
//! * [`session`] — opaque chart/quote session id generation.
//! * [`interval`] — validates the six interval grammars accepted by
//!   `create_series`.
//! * [`entities`] — the domain types a caller sees: [`entities::Candle`],
//!   [`entities::QuoteSnapshot`], [`entities::SeriesUpdate`].
//! * [`protocol`] — builds the outbound JSON envelopes for every verb the
//!   handshake and subscription flows send.
//! * [`config`] — tunables for timeouts, retries, and the upstream
//!   endpoint.
//! * [`symbol`] — the pre-flight HTTP symbol validator.
//! * [`transport`] — owns one WebSocket: framing, heartbeat echo, and the
//!   outbound keep-alive ping.
//! * [`handshake`] — drives the opening and subscription sequences over a
//!   connected transport.
//! * [`demux`] — classifies decoded envelopes into typed events.
//! * [`client`] — the facade: [`client::Client`] and its streaming/fetch
//!   operations.
//!
//! ## Quick start
//!
//! ```no_run
//! use futures::StreamExt;
//! use quotewire::{client::Client, config::Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), quotewire::errors::Error> {
//! let client = Client::new(Config::default());
//! let mut candles = Box::pin(client.stream_candles(
//!     "BINANCE:BTCUSDT".to_string(),
//!     "1".to_string(),
//!     300,
//! ));
//! while let Some(candle) = candles.next().await {
//!     let candle = candle?;
//!     println!("{candle:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod demux;
pub mod entities;
pub mod errors;
pub mod frame;
pub mod handshake;
pub mod interval;
pub mod protocol;
pub mod session;
pub mod symbol;
pub mod transport;
