//! Streams ticking quote snapshots for a handful of symbols on one shared
//! quote session.

use futures::StreamExt;
use quotewire::{client::Client, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::new(Config::default());
    let symbols = vec!["NASDAQ:AAPL".to_string(), "NASDAQ:MSFT".to_string(), "BINANCE:BTCUSDT".to_string()];
    let mut quotes = Box::pin(client.stream_quotes(symbols));

    while let Some(quote) = quotes.next().await {
        match quote {
            Ok(snapshot) => println!("{} lp={:?}", snapshot.symbol, snapshot.current_price),
            Err(e) => {
                eprintln!("stream ended: {e}");
                break;
            }
        }
    }
    Ok(())
}
