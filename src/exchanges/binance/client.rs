use crate::core::config::{Credentials, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{
    ReqwestTransport, RequestExecutor, RequestSpec, RestClientConfig, Transport, TransportOptions,
};
use crate::core::types::{ClientLifecycleState, ExchangeTarget, WeightSnapshot};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument};

struct ClientInner<T: Transport> {
    executor: RequestExecutor<T>,
    config: ExchangeConfig,
    stopped: AtomicBool,
}

/// Binance REST session.
///
/// Clones share the transport, the weight snapshot and the lifecycle state.
/// [`with_credentials`](Self::with_credentials) and
/// [`with_transport_options`](Self::with_transport_options) produce such a
/// clone carrying request-scoped overrides; the original handle keeps its own
/// settings.
pub struct BinanceRestClient<T: Transport = ReqwestTransport> {
    inner: Arc<ClientInner<T>>,
    call_credentials: Option<Credentials>,
    call_options: TransportOptions,
}

impl<T: Transport> Clone for BinanceRestClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            call_credentials: self.call_credentials.clone(),
            call_options: self.call_options.clone(),
        }
    }
}

impl<T: Transport> std::fmt::Debug for BinanceRestClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("exchange", &self.inner.config.exchange)
            .field("state", &self.state())
            .field("has_call_credentials", &self.call_credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl BinanceRestClient<ReqwestTransport> {
    /// Create a client backed by a pooled reqwest transport
    pub fn new(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        Self::with_transport(config, ReqwestTransport::new()?)
    }
}

impl<T: Transport> BinanceRestClient<T> {
    /// Create a client over an injected transport
    pub fn with_transport(config: ExchangeConfig, transport: T) -> Result<Self, ExchangeError> {
        let rest_config = RestClientConfig::from_exchange_config(&config).map_err(|e| {
            error!(exchange = %config.exchange, "Exchange is not supported: {}", e);
            e
        })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                executor: RequestExecutor::new(transport, rest_config),
                config,
                stopped: AtomicBool::new(false),
            }),
            call_credentials: None,
            call_options: TransportOptions::default(),
        })
    }

    /// Handle whose calls use `credentials` layered over the instance ones
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        let merged = match &self.call_credentials {
            Some(existing) => existing.overlay(&credentials),
            None => credentials,
        };
        Self {
            call_credentials: Some(merged),
            ..self.clone()
        }
    }

    /// Handle whose calls use `options` layered over the instance defaults
    #[must_use]
    pub fn with_transport_options(&self, options: TransportOptions) -> Self {
        Self {
            call_options: self.call_options.merge(&options),
            ..self.clone()
        }
    }

    /// Credentials used for the next call: instance defaults overlaid by any
    /// request-scoped override
    pub fn credentials(&self) -> Credentials {
        match &self.call_credentials {
            Some(call) => self.inner.config.credentials.overlay(call),
            None => self.inner.config.credentials.clone(),
        }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.inner.config
    }

    pub fn exchange(&self) -> ExchangeTarget {
        self.inner.config.exchange
    }

    pub(crate) fn executor(&self) -> &RequestExecutor<T> {
        &self.inner.executor
    }

    pub fn state(&self) -> ClientLifecycleState {
        if self.inner.stopped.load(Ordering::SeqCst) {
            ClientLifecycleState::Stopped
        } else {
            ClientLifecycleState::Active
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ClientLifecycleState::Stopped
    }

    /// Permanently stop the client. Every later call fails with
    /// [`ExchangeError::AlreadyStopped`] without touching the network.
    pub fn stop(&self) -> bool {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            info!(exchange = %self.exchange(), "Stopping Binance REST client");
        }
        true
    }

    pub(crate) fn ensure_active(&self) -> Result<(), ExchangeError> {
        if self.is_stopped() {
            error!(exchange = %self.exchange(), "Client has already been stopped and cannot be used");
            return Err(ExchangeError::AlreadyStopped);
        }
        Ok(())
    }

    fn scoped(&self, spec: RequestSpec) -> RequestSpec {
        let options = self.call_options.merge(&spec.options);
        spec.options(options)
    }

    /// Run one request through the executor, honouring the lifecycle guard
    pub async fn request(&self, spec: RequestSpec) -> Result<Value, ExchangeError> {
        self.ensure_active()?;
        let spec = self.scoped(spec);
        self.inner.executor.execute(&spec, &self.credentials()).await
    }

    /// Typed variant of [`request`](Self::request)
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        spec: RequestSpec,
    ) -> Result<R, ExchangeError> {
        self.ensure_active()?;
        let spec = self.scoped(spec);
        self.inner
            .executor
            .execute_json(&spec, &self.credentials())
            .await
    }

    /// Weight reported by the last response.
    ///
    /// With `new_req` a single `ping` is issued first to obtain a fresh value;
    /// otherwise no request is made.
    #[instrument(skip(self), fields(exchange = %self.exchange()))]
    pub async fn req_weight_cost(
        &self,
        new_req: bool,
    ) -> Result<Option<WeightSnapshot>, ExchangeError> {
        self.ensure_active()?;
        if new_req {
            self.request(RequestSpec::get("ping")).await?;
        }
        Ok(self.inner.executor.weight_snapshot().await)
    }

    /// Cached weight snapshot, without lifecycle check or I/O
    pub async fn weight_snapshot(&self) -> Option<WeightSnapshot> {
        self.inner.executor.weight_snapshot().await
    }
}
