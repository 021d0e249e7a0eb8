use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestTransport, Transport};
use crate::exchanges::binance::client::BinanceRestClient;
use crate::exchanges::binance::klines::{KlinesFetcher, KlinesFetcherConfig};
use tracing::info;

/// Create a Binance REST client over the default reqwest transport
pub fn build_client(config: ExchangeConfig) -> Result<BinanceRestClient, ExchangeError> {
    build_client_with_transport(config, ReqwestTransport::new()?)
}

/// Create a Binance REST client over a caller-supplied transport
pub fn build_client_with_transport<T: Transport>(
    config: ExchangeConfig,
    transport: T,
) -> Result<BinanceRestClient<T>, ExchangeError> {
    let has_credentials = config.has_credentials();
    let client = BinanceRestClient::with_transport(config, transport)?;
    info!(
        exchange = %client.exchange(),
        testnet = client.exchange().is_testnet(),
        signed = has_credentials,
        "Created Binance REST client"
    );
    Ok(client)
}

/// Create a klines fetcher sharing `client`'s transport, lifecycle and weight
pub fn build_klines_fetcher<T: Transport>(
    client: &BinanceRestClient<T>,
    config: KlinesFetcherConfig,
) -> KlinesFetcher<T> {
    KlinesFetcher::from_client(client.clone(), config)
}
