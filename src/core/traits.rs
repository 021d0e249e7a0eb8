use crate::core::{
    errors::{suppress_api_error, ExchangeError},
    types::ListenKey,
};
use async_trait::async_trait;
use serde_json::Value;

/// User-data-stream listen key lifecycle.
///
/// The exchange owns key expiry; implementations keep no local state. The
/// `try_*` variants report remote failures as `Ok(None)` instead of an error,
/// but still fail on configuration and parsing errors.
#[async_trait]
pub trait UserDataStream: Send + Sync {
    /// Open a new user data stream and return its listen key
    async fn stream_listen_key(&self) -> Result<ListenKey, ExchangeError>;

    /// Raw response of the create call
    async fn stream_listen_key_response(&self) -> Result<Value, ExchangeError>;

    /// Extend the key's validity. Safe to repeat.
    async fn stream_keepalive(&self, listen_key: &ListenKey) -> Result<Value, ExchangeError>;

    /// Close the stream. Closing an already closed key is a remote error.
    async fn stream_close(&self, listen_key: &ListenKey) -> Result<Value, ExchangeError>;

    async fn try_stream_listen_key(&self) -> Result<Option<ListenKey>, ExchangeError> {
        suppress_api_error(self.stream_listen_key().await)
    }

    async fn try_stream_keepalive(
        &self,
        listen_key: &ListenKey,
    ) -> Result<Option<Value>, ExchangeError> {
        suppress_api_error(self.stream_keepalive(listen_key).await)
    }

    async fn try_stream_close(&self, listen_key: &ListenKey) -> Result<Option<Value>, ExchangeError> {
        suppress_api_error(self.stream_close(listen_key).await)
    }
}
