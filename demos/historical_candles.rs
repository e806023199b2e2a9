//! Fetches a fixed window of historical daily candles and prints them once
//! collected.

use quotewire::{client::Client, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::new(Config::default());
    let candles = client.fetch_historical_candles("NASDAQ:AAPL", "D", 100).await?;

    println!("fetched {} candles", candles.len());
    for candle in candles {
        println!("{candle:?}");
    }
    Ok(())
}
