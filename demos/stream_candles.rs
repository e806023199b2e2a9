//! Streams live 1-minute candles for a symbol and prints each as it
//! arrives.

use futures::StreamExt;
use quotewire::{client::Client, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::new(Config::default());
    let mut candles = Box::pin(client.stream_candles("BINANCE:BTCUSDT".to_string(), "1".to_string(), 300));

    while let Some(candle) = candles.next().await {
        match candle {
            Ok(candle) => println!("{candle:?}"),
            Err(e) => {
                eprintln!("stream ended: {e}");
                break;
            }
        }
    }
    Ok(())
}
