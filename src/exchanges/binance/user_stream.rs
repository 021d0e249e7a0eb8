use crate::core::errors::ExchangeError;
use crate::core::kernel::{RequestSpec, Transport};
use crate::core::traits::UserDataStream;
use crate::core::types::ListenKey;
use crate::exchanges::binance::client::BinanceRestClient;
use crate::exchanges::binance::types::ListenKeyResponse;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

const USER_DATA_STREAM: &str = "userDataStream";

#[async_trait]
impl<T: Transport> UserDataStream for BinanceRestClient<T> {
    #[instrument(skip(self), fields(exchange = %self.exchange()))]
    async fn stream_listen_key(&self) -> Result<ListenKey, ExchangeError> {
        let response: ListenKeyResponse = self
            .request_json(RequestSpec::post(USER_DATA_STREAM))
            .await?;
        debug!("Created listen key");
        Ok(ListenKey(response.listen_key))
    }

    async fn stream_listen_key_response(&self) -> Result<Value, ExchangeError> {
        self.request(RequestSpec::post(USER_DATA_STREAM)).await
    }

    #[instrument(skip(self, listen_key), fields(exchange = %self.exchange()))]
    async fn stream_keepalive(&self, listen_key: &ListenKey) -> Result<Value, ExchangeError> {
        self.request(RequestSpec::put(USER_DATA_STREAM).param("listenKey", listen_key))
            .await
    }

    #[instrument(skip(self, listen_key), fields(exchange = %self.exchange()))]
    async fn stream_close(&self, listen_key: &ListenKey) -> Result<Value, ExchangeError> {
        self.request(RequestSpec::delete(USER_DATA_STREAM).param("listenKey", listen_key))
            .await
    }
}
