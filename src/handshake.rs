//! Drives the fixed opening sequence and per-symbol subscription sequence
//! over an already-connected [`crate::transport::Transport`] (spec §4.E).
//!
//! Symbol (and interval) validation happens before a transport is ever
//! connected (spec §4.H: "validation failure must prevent the WebSocket
//! from being opened"), so it is the caller's job, not this module's — by
//! the time these functions run, `symbol` and `interval` are already known
//! good.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::Subscription;
use crate::errors::Error;
use crate::protocol;
use crate::session;
use crate::transport::Transport;

/// Sends `set_auth_token` and `set_locale`, the two frames every session
/// opens with regardless of what is subscribed afterwards (S1).
pub async fn open(transport: &Arc<Transport>) -> Result<(), Error> {
    transport.send_envelope(&protocol::set_auth_token()).await?;
    transport.send_envelope(&protocol::set_locale()).await?;
    Ok(())
}

/// Drives the full chart+quote subscription sequence for an
/// already-validated symbol: session creation, field registration, symbol
/// resolution, series/study creation (S4, S5). Follows spec §4.E steps
/// 3–12 exactly:
///
/// `chart_create_session -> quote_create_session -> quote_set_fields ->
/// quote_hibernate_all -> quote_add_symbols -> resolve_symbol ->
/// create_series -> quote_fast_symbols -> create_study ->
/// quote_hibernate_all`
///
/// `quote_hibernate_all` is sent twice — once after field registration,
/// once after the series/study are created — matching the upstream's own
/// opening sequence; both are a fallible `send` with no special-cased
/// suppression of either failure.
pub async fn subscribe(
    transport: &Arc<Transport>,
    config: &Config,
    symbol: &str,
    interval: &str,
    bar_count: u32,
) -> Result<Subscription, Error> {
    let chart_session = session::new_session("cs_");
    let quote_session = session::new_session("qs_");
    let subscription = Subscription::new(
        chart_session.clone(),
        quote_session.clone(),
        symbol.to_string(),
        interval.to_string(),
        bar_count,
    );

    transport.send_envelope(&protocol::chart_create_session(&chart_session)).await?;
    transport.send_envelope(&protocol::quote_create_session(&quote_session)).await?;
    transport.send_envelope(&protocol::quote_set_fields(&quote_session)).await?;
    transport.send_envelope(&protocol::quote_hibernate_all(&quote_session)).await?;

    let sym_json = protocol::symbol_json(symbol);
    transport.send_envelope(&protocol::quote_add_symbols(&quote_session, &sym_json)).await?;
    transport
        .send_envelope(&protocol::resolve_symbol(&chart_session, &subscription.symbol_key, &sym_json))
        .await?;
    transport
        .send_envelope(&protocol::create_series(
            &chart_session,
            &subscription.series_key,
            &subscription.symbol_key,
            interval,
            bar_count,
        ))
        .await?;
    transport.send_envelope(&protocol::quote_fast_symbols(&quote_session, symbol)).await?;
    transport
        .send_envelope(&protocol::create_study(&chart_session, &subscription.series_key, &config.volume_study_id))
        .await?;
    transport.send_envelope(&protocol::quote_hibernate_all(&quote_session)).await?;

    Ok(subscription)
}

/// Adds an already-validated `symbol` to an already-open quote session for
/// ticker-only streaming (no chart series), using the extended symbol-json
/// form that carries `currency-id` and `session`.
pub async fn add_ticker_symbol(transport: &Arc<Transport>, quote_session: &str, symbol: &str) -> Result<(), Error> {
    let sym_json = protocol::symbol_json_ticker(symbol);
    transport.send_envelope(&protocol::quote_add_symbols(quote_session, &sym_json)).await?;
    transport.send_envelope(&protocol::quote_fast_symbols(quote_session, symbol)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn local_counting_server(expected_frames: usize) -> (String, tokio::task::JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            use futures::StreamExt;
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let mut count = 0;
            while count < expected_frames {
                match ws.next().await {
                    Some(Ok(_)) => count += 1,
                    _ => break,
                }
            }
            count
        });
        (format!("ws://{addr}"), handle)
    }

    #[tokio::test]
    async fn open_sends_exactly_two_frames() {
        let (url, server) = local_counting_server(2).await;
        let config = Config { endpoint: url, ..Config::default() };
        let transport = Transport::connect(&config).await.unwrap();
        open(&transport).await.unwrap();
        let count = tokio::time::timeout(std::time::Duration::from_secs(2), server).await.unwrap().unwrap();
        assert_eq!(count, 2);
        transport.close().await;
    }

    async fn local_verb_recording_server(expected_frames: usize) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            use futures::StreamExt;
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let mut verbs = Vec::new();
            while verbs.len() < expected_frames {
                match ws.next().await {
                    Some(Ok(tokio_tungstenite::tungstenite::Message::Text(text))) => {
                        for payload in crate::frame::decode_stream(&text).unwrap() {
                            let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
                            verbs.push(value["m"].as_str().unwrap().to_string());
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
            verbs
        });
        (format!("ws://{addr}"), handle)
    }

    #[tokio::test]
    async fn s5_subscribe_sends_steps_3_through_12_in_order() {
        let (url, server) = local_verb_recording_server(10).await;
        let config = Config { endpoint: url, ..Config::default() };
        let transport = Transport::connect(&config).await.unwrap();
        subscribe(&transport, &config, "BINANCE:BTCUSDT", "1", 10).await.unwrap();
        let verbs = tokio::time::timeout(std::time::Duration::from_secs(2), server).await.unwrap().unwrap();
        assert_eq!(
            verbs,
            vec![
                "chart_create_session",
                "quote_create_session",
                "quote_set_fields",
                "quote_hibernate_all",
                "quote_add_symbols",
                "resolve_symbol",
                "create_series",
                "quote_fast_symbols",
                "create_study",
                "quote_hibernate_all",
            ]
        );
        transport.close().await;
    }
}
