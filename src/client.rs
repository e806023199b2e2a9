//! # Client
//!
//! The facade a caller actually builds: wraps the wire layer (`transport`,
//! `handshake`, `demux`) behind the four streaming/fetch operations (spec
//! §4.G). Each call owns exactly one [`crate::transport::Transport`] for
//! its lifetime; there is no connection pooling or reconnect-on-drop, both
//! left to the caller by spec §1 non-goals.
//!
//! A call's connection runs through a linear state machine:
//!
//! `Created -> Connecting -> Handshaking -> Subscribing -> Streaming -> (Closed | Failed)`
//!
//! `Failed` is reachable from any state; `Closed` is only reached by a
//! clean shutdown from `Streaming` or a caller-initiated drop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_stream::try_stream;
use futures::Stream;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::demux::{self, Event};
use crate::entities::{Candle, QuoteSnapshot};
use crate::errors::Error;
use crate::handshake;
use crate::interval::Interval;
use crate::session;
use crate::symbol;
use crate::transport::Transport;

/// Phases of one call's connection lifecycle, tracked for diagnostics and
/// surfaced through [`Client::state_label`] in logging.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Connecting,
    Handshaking,
    Subscribing,
    Streaming,
    Closed,
    Failed,
}

impl State {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => State::Created,
            1 => State::Connecting,
            2 => State::Handshaking,
            3 => State::Subscribing,
            4 => State::Streaming,
            5 => State::Closed,
            _ => State::Failed,
        }
    }
}

struct ConnectionState(AtomicU8);

impl ConnectionState {
    fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    fn set(&self, state: State) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> State {
        State::from_u8(self.0.load(Ordering::SeqCst))
    }
}

// State's variants are declared in the same order `from_u8` expects;
// default discriminants start at 0, so the cast below round-trips.
impl From<State> for u8 {
    fn from(state: State) -> Self {
        state as u8
    }
}

/// Entry point for every streaming and historical-fetch operation.
/// Construct once with a [`Config`] and reuse across calls; each call opens
/// its own connection.
pub struct Client {
    config: Config,
    http_client: reqwest::Client,
    validator_endpoint: String,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            validator_endpoint: symbol::DEFAULT_LOOKUP_ENDPOINT.to_string(),
        }
    }

    /// Overrides the symbol-validator endpoint, primarily for tests against
    /// a local mock.
    pub fn with_validator_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.validator_endpoint = endpoint.into();
        self
    }

    /// Validates the interval grammar and the symbol against the upstream
    /// lookup endpoint, then — only once both succeed — opens the
    /// WebSocket and drives the handshake/subscription sequence. Spec §4.H
    /// requires validation failure to prevent the WebSocket from ever
    /// being opened, so both checks run before `Transport::connect`.
    async fn connect_and_subscribe(
        &self,
        state: &Arc<ConnectionState>,
        symbol: &str,
        interval: &str,
        bar_count: u32,
    ) -> Result<(Arc<Transport>, crate::entities::Subscription), Error> {
        let interval = Interval::validate(interval).map_err(|e| {
            state.set(State::Failed);
            e
        })?;
        symbol::validate(&self.http_client, &self.validator_endpoint, &self.config, symbol)
            .await
            .map_err(|e| {
                state.set(State::Failed);
                e
            })?;

        state.set(State::Connecting);
        let transport = Transport::connect(&self.config).await.map_err(|e| {
            state.set(State::Failed);
            e
        })?;

        state.set(State::Handshaking);
        if let Err(e) = handshake::open(&transport).await {
            state.set(State::Failed);
            return Err(e);
        }

        state.set(State::Subscribing);
        let subscription = handshake::subscribe(&transport, &self.config, symbol, interval.as_str(), bar_count)
            .await
            .map_err(|e| {
                state.set(State::Failed);
                e
            })?;

        state.set(State::Streaming);
        Ok((transport, subscription))
    }

    /// Streams OHLCV candles for `symbol` at `interval`, seeded with
    /// `bar_count` bars of history before live updates begin.
    #[instrument(skip(self))]
    pub fn stream_candles(
        &self,
        symbol: String,
        interval: String,
        bar_count: u32,
    ) -> impl Stream<Item = Result<Candle, Error>> + '_ {
        let state = Arc::new(ConnectionState::new());
        try_stream! {
            let (transport, subscription) = self.connect_and_subscribe(&state, &symbol, &interval, bar_count).await?;
            info!(symbol, interval, "streaming candles");
            while let Some(frame) = transport.recv_frame().await {
                let envelope = frame?;
                match demux::classify(&envelope)? {
                    Event::Series(update) if update.session == subscription.chart_session => {
                        if let Some(candles) = update.series.get(&subscription.series_key) {
                            for candle in candles {
                                yield *candle;
                            }
                        }
                    }
                    Event::CriticalError { code, message } => {
                        state.set(State::Failed);
                        Err(Error::Protocol { code, message })?;
                    }
                    Event::SymbolError { message, .. } => {
                        state.set(State::Failed);
                        Err(Error::InvalidSymbol(message))?;
                    }
                    _ => {}
                }
            }
            state.set(State::Closed);
        }
    }

    /// Equivalent to [`Client::stream_candles`] but yields the decoded JSON
    /// envelope unclassified, for callers that need verbs this crate
    /// doesn't promote to a typed event.
    #[instrument(skip(self))]
    pub fn stream_raw(
        &self,
        symbol: String,
        interval: String,
        bar_count: u32,
    ) -> impl Stream<Item = Result<serde_json::Value, Error>> + '_ {
        let state = Arc::new(ConnectionState::new());
        try_stream! {
            let (transport, _subscription) = self.connect_and_subscribe(&state, &symbol, &interval, bar_count).await?;
            while let Some(frame) = transport.recv_frame().await {
                yield frame?;
            }
            state.set(State::Closed);
        }
    }

    /// Collects historical bars until the server signals `series_completed`
    /// for the subscribed chart session, or `config.historical_timeout`
    /// elapses, whichever comes first (spec §4.G, scenario S7). The result
    /// is de-duplicated by timestamp and sorted ascending before it's
    /// returned, so a live update arriving after `series_completed` (but
    /// before the connection is torn down) can never appear in the output.
    #[instrument(skip(self))]
    pub async fn fetch_historical_candles(
        &self,
        symbol: &str,
        interval: &str,
        bar_count: u32,
    ) -> Result<Vec<Candle>, Error> {
        let state = Arc::new(ConnectionState::new());
        let (transport, subscription) = self.connect_and_subscribe(&state, symbol, interval, bar_count).await?;
        let deadline = self.config.historical_timeout;
        let mut candles: Vec<Candle> = Vec::new();

        let result = tokio::time::timeout(deadline, async {
            loop {
                let Some(frame) = transport.recv_frame().await else { break };
                let envelope = frame?;
                match demux::classify(&envelope)? {
                    Event::Series(update) if update.session == subscription.chart_session => {
                        if let Some(batch) = update.series.get(&subscription.series_key) {
                            candles.extend(batch.iter().copied());
                        }
                    }
                    Event::SeriesCompleted { chart_session } if chart_session == subscription.chart_session => break,
                    Event::CriticalError { code, message } => return Err(Error::Protocol { code, message }),
                    Event::SymbolError { message, .. } => return Err(Error::InvalidSymbol(message)),
                    _ => {}
                }
            }
            Ok::<(), Error>(())
        })
        .await;

        transport.close().await;
        let candles = dedup_sorted_by_timestamp(candles);

        match result {
            Ok(Ok(())) if !candles.is_empty() => {
                state.set(State::Closed);
                Ok(candles)
            }
            Ok(Ok(())) => {
                state.set(State::Failed);
                Err(Error::NoData)
            }
            Ok(Err(e)) => {
                state.set(State::Failed);
                Err(e)
            }
            Err(_elapsed) if !candles.is_empty() => {
                warn!(symbol, got = candles.len(), wanted = bar_count, "historical fetch timed out with partial data");
                state.set(State::Closed);
                Err(Error::Timeout(deadline))
            }
            Err(_elapsed) => {
                state.set(State::Failed);
                Err(Error::NoData)
            }
        }
    }

    /// Streams quote-field snapshots for a set of symbols on one shared
    /// quote session (no chart series involved). Every symbol is validated
    /// up front — the overall result is OK iff all succeed (spec §4.H) —
    /// before the WebSocket is opened.
    #[instrument(skip(self, symbols))]
    pub fn stream_quotes(&self, symbols: Vec<String>) -> impl Stream<Item = Result<QuoteSnapshot, Error>> + '_ {
        let state = Arc::new(ConnectionState::new());
        try_stream! {
            if let Err(e) = symbol::validate_all(&self.http_client, &self.validator_endpoint, &self.config, &symbols).await {
                state.set(State::Failed);
                Err(e)?;
            }

            state.set(State::Connecting);
            let transport = Transport::connect(&self.config).await?;
            state.set(State::Handshaking);
            handshake::open(&transport).await?;

            state.set(State::Subscribing);
            let quote_session = session::new_session("qs_");
            transport.send_envelope(&crate::protocol::quote_create_session(&quote_session)).await?;
            transport.send_envelope(&crate::protocol::quote_set_fields(&quote_session)).await?;
            for symbol in &symbols {
                handshake::add_ticker_symbol(&transport, &quote_session, symbol).await?;
            }

            state.set(State::Streaming);
            while let Some(frame) = transport.recv_frame().await {
                let envelope = frame?;
                match demux::classify(&envelope)? {
                    Event::Quote(snapshot) => yield snapshot,
                    Event::CriticalError { code, message } => {
                        state.set(State::Failed);
                        Err(Error::Protocol { code, message })?;
                    }
                    _ => {}
                }
            }
            state.set(State::Closed);
        }
    }

    /// A thin projection of [`Client::stream_quotes`] that only yields
    /// snapshots carrying a last-trade price, for callers that just want
    /// ticking trade prices without the full field set.
    #[instrument(skip(self, symbols))]
    pub fn stream_latest_trade_info(
        &self,
        symbols: Vec<String>,
    ) -> impl Stream<Item = Result<QuoteSnapshot, Error>> + '_ {
        use futures::StreamExt;
        self.stream_quotes(symbols)
            .filter(|item| futures::future::ready(matches!(item, Ok(s) if s.current_price.is_some())))
    }
}

/// Collapses a batch of (possibly overlapping, possibly unordered) candles
/// into ascending-timestamp order with one candle per timestamp, keeping the
/// last value seen for any timestamp that recurs (scenario S7).
fn dedup_sorted_by_timestamp(candles: Vec<Candle>) -> Vec<Candle> {
    let mut by_timestamp: std::collections::BTreeMap<i64, Candle> = std::collections::BTreeMap::new();
    for candle in candles {
        by_timestamp.insert(candle.timestamp, candle);
    }
    by_timestamp.into_values().collect()
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish()
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            State::Created => "created",
            State::Connecting => "connecting",
            State::Handshaking => "handshaking",
            State::Subscribing => "subscribing",
            State::Streaming => "streaming",
            State::Closed => "closed",
            State::Failed => "failed",
        };
        f.write_str(label)
    }
}
