use anyhow::Context;
use binance_rest::core::config::ExchangeConfig;
use binance_rest::exchanges::binance::{build_client, build_klines_fetcher, KlinesFetcherConfig};
use binance_rest::KlineInterval;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Reads BINANCE_API_KEY / BINANCE_SECRET_KEY / BINANCE_EXCHANGE when present
    #[cfg(feature = "env-file")]
    let config = ExchangeConfig::from_env_file("BINANCE").context("loading configuration")?;
    #[cfg(not(feature = "env-file"))]
    let config = ExchangeConfig::from_env("BINANCE").context("loading configuration")?;

    let client = build_client(config)?;

    let alive = client.ping().await?;
    let server_time = client.get_server_time().await?;
    info!(alive, server_time, "Connected");

    if let Some(weight) = client.req_weight_cost(false).await? {
        info!(weight = %weight.weight, status = weight.status_code, "Used request weight");
    }

    let fetcher = build_klines_fetcher(
        &client,
        KlinesFetcherConfig::new(["BTC-USDT", "ETH-USDT", "BNB-USDT"], KlineInterval::Minutes1),
    );
    let batch = fetcher.fetch_and_fill_klines().await?;

    for (pair, series) in &batch.series {
        let last_close = series.rows.last().map(|r| r.close.as_str()).unwrap_or("-");
        info!(%pair, rows = series.len(), last_close, "Klines");
    }
    for (pair, error) in &batch.failures {
        warn!(%pair, %error, "Pair failed");
    }

    client.stop();
    Ok(())
}
