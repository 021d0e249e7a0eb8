use crate::core::errors::ExchangeError;
use crate::core::kernel::{RequestSpec, Transport};
use crate::exchanges::binance::client::BinanceRestClient;
use crate::exchanges::binance::types::{BinanceAccountInfo, BinanceBalance};
use serde_json::Value;
use tracing::instrument;

/// Signed account and wallet endpoints
impl<T: Transport> BinanceRestClient<T> {
    #[instrument(skip(self), fields(exchange = %self.exchange()))]
    pub async fn get_account(&self) -> Result<BinanceAccountInfo, ExchangeError> {
        self.request_json(RequestSpec::get("account").signed()).await
    }

    /// Balances with a non-zero free or locked amount
    pub async fn get_account_balances(&self) -> Result<Vec<BinanceBalance>, ExchangeError> {
        let account = self.get_account().await?;
        Ok(account
            .balances
            .into_iter()
            .filter(|balance| {
                let free: f64 = balance.free.parse().unwrap_or(0.0);
                let locked: f64 = balance.locked.parse().unwrap_or(0.0);
                free > 0.0 || locked > 0.0
            })
            .collect())
    }

    pub async fn get_my_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<Value, ExchangeError> {
        self.request(
            RequestSpec::get("myTrades")
                .signed()
                .param("symbol", symbol)
                .param_opt("limit", limit),
        )
        .await
    }
}
