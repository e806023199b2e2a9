//! Symbol validator (spec §4.H): a pre-flight HTTPS GET confirming the
//! upstream accepts a given `EXCHANGE:SYMBOL` reference before a WebSocket
//! is ever opened.

use std::time::Duration;

use tracing::warn;

use crate::{config::Config, errors::Error};

/// Default symbol-lookup endpoint; the real upstream path is unspecified by
/// the protocol (spec treats it as an external collaborator, §4.H), so this
/// is overridable for testing against a local mock.
pub const DEFAULT_LOOKUP_ENDPOINT: &str = "https://symbols.example-marketfeed.com/v1/lookup";

/// Validates `symbol` against the upstream lookup endpoint. Treats 200 and
/// 301 as valid, 404 as invalid, anything else as transient and retries up
/// to `config.validator_attempts` times with exponential backoff starting at
/// `config.validator_base_delay` (factor 2).
pub async fn validate(client: &reqwest::Client, endpoint: &str, config: &Config, symbol: &str) -> Result<(), Error> {
    let mut delay = config.validator_base_delay;
    let mut last_err = None;
    for attempt in 1..=config.validator_attempts.max(1) {
        let result = client
            .get(endpoint)
            .query(&[("symbol", symbol)])
            .timeout(Duration::from_secs(10))
            .send()
            .await;
        match result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match status {
                    200 | 301 => return Ok(()),
                    404 => return Err(Error::InvalidSymbol(symbol.to_string())),
                    _ => {
                        warn!(symbol, status, attempt, "transient symbol-validator response");
                        last_err = Some(Error::InvalidSymbol(format!("transient status {status} for {symbol}")));
                    }
                }
            }
            Err(e) => {
                warn!(symbol, attempt, error = %e, "symbol-validator request failed");
                last_err = Some(Error::ValidatorTransport(e));
            }
        }
        if attempt < config.validator_attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
    Err(last_err.unwrap_or_else(|| Error::InvalidSymbol(symbol.to_string())))
}

/// Validates every symbol in `symbols`; overall result is OK iff all
/// individual validations succeed (used for the multi-symbol ticker form).
pub async fn validate_all(client: &reqwest::Client, endpoint: &str, config: &Config, symbols: &[String]) -> Result<(), Error> {
    for symbol in symbols {
        validate(client, endpoint, config, symbol).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_200_from_local_mock() {
        let server = httpmock_server(200).await;
        let client = reqwest::Client::new();
        let config = Config { validator_attempts: 1, ..Config::default() };
        let result = validate(&client, &server.url, &config, "NASDAQ:AAPL").await;
        assert!(result.is_ok());
        server.handle.abort();
    }

    #[tokio::test]
    async fn rejects_404_immediately_without_retry() {
        let server = httpmock_server(404).await;
        let client = reqwest::Client::new();
        let config = Config { validator_attempts: 3, ..Config::default() };
        let result = validate(&client, &server.url, &config, "BOGUS:NOPE").await;
        assert!(matches!(result, Err(Error::InvalidSymbol(_))));
        server.handle.abort();
    }

    struct MockServer {
        url: String,
        handle: tokio::task::JoinHandle<()>,
    }

    async fn httpmock_server(status: u16) -> MockServer {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => return,
                };
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let body = "{}";
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        MockServer { url: format!("http://{addr}/"), handle }
    }
}
