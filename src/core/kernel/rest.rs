use crate::core::config::{Credentials, ExchangeConfig, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{order_params, canonical_query, HmacSigner, Signer, API_KEY_HEADER};
use crate::core::kernel::transport::{Transport, TransportOptions, TransportRequest, TransportResponse};
use crate::core::types::WeightSnapshot;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

pub const DEFAULT_API_VERSION: &str = "v3";

/// Response headers carrying the used request weight, in lookup order
const WEIGHT_HEADERS: [&str; 2] = ["x-mbx-used-weight", "x-mbx-used-weight-1m"];

/// Description of a single REST call
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub version: &'static str,
    pub signed: bool,
    pub params: BTreeMap<String, String>,
    pub options: TransportOptions,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            version: DEFAULT_API_VERSION,
            signed: false,
            params: BTreeMap::new(),
            options: TransportOptions::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Mark the request as requiring `timestamp` + `signature`
    #[must_use]
    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    #[must_use]
    pub fn version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Add a parameter only when a value is present
    #[must_use]
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }
}

/// Configuration for the request executor
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API, without the version segment
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Timeout used when no transport option overrides it
    pub timeout: Duration,
    /// Transport options merged under every request's own options
    pub default_options: TransportOptions,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Offset added to the local clock for signed requests, in milliseconds
    pub time_offset_ms: i64,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            default_options: TransportOptions::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            time_offset_ms: 0,
        }
    }

    /// Derive the executor configuration from a client configuration
    pub fn from_exchange_config(config: &ExchangeConfig) -> Result<Self, ExchangeError> {
        let base_url = config.rest_base_uri()?.to_string();
        Ok(Self {
            base_url,
            exchange_name: config.exchange.as_str().to_string(),
            timeout: config.timeout(),
            default_options: config.transport_options.clone(),
            user_agent: config.user_agent.clone(),
            time_offset_ms: config.time_offset_ms,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_options(mut self, options: TransportOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builds, signs and sends single REST calls and keeps the last reported
/// request weight.
pub struct RequestExecutor<T: Transport> {
    transport: T,
    config: RestClientConfig,
    time_offset_ms: AtomicI64,
    weight: RwLock<Option<WeightSnapshot>>,
}

impl<T: Transport> std::fmt::Debug for RequestExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T, config: RestClientConfig) -> Self {
        let time_offset_ms = AtomicI64::new(config.time_offset_ms);
        Self {
            transport,
            config,
            time_offset_ms,
            weight: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn time_offset_ms(&self) -> i64 {
        self.time_offset_ms.load(Ordering::Relaxed)
    }

    pub fn set_time_offset_ms(&self, offset: i64) {
        self.time_offset_ms.store(offset, Ordering::Relaxed);
    }

    /// Last recorded weight snapshot. Never performs I/O.
    pub async fn weight_snapshot(&self) -> Option<WeightSnapshot> {
        self.weight.read().await.clone()
    }

    fn timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() + self.time_offset_ms()
    }

    fn build_url(&self, spec: &RequestSpec) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            spec.version,
            spec.path.trim_start_matches('/')
        )
    }

    /// Turn a `RequestSpec` into a wire request. Fails before any I/O when a signed
    /// call lacks credentials.
    pub fn prepare(
        &self,
        spec: &RequestSpec,
        credentials: &Credentials,
    ) -> Result<TransportRequest, ExchangeError> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
        ];

        let wire_params: Vec<(String, String)> = if spec.signed {
            let (Some(api_key), Some(api_secret)) =
                (credentials.api_key(), credentials.api_secret())
            else {
                return Err(ExchangeError::MissingCredentials(format!(
                    "signed endpoint {} requires both api key and api secret",
                    spec.path
                )));
            };

            let signer = HmacSigner::new(api_key.to_string(), api_secret.to_string());
            let (sign_headers, signed_params) =
                signer.sign_request(&spec.params, self.timestamp())?;
            headers.extend(sign_headers);
            signed_params
        } else {
            if let Some(api_key) = credentials.api_key() {
                headers.push((API_KEY_HEADER.to_string(), api_key.to_string()));
            }
            order_params(&spec.params)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        let options = self.config.default_options.merge(&spec.options);
        headers.extend(options.headers);

        let payload = (!wire_params.is_empty()).then(|| canonical_query(&wire_params));
        let (query, body) = if spec.method == Method::POST || spec.method == Method::PUT {
            (None, payload)
        } else {
            (payload, None)
        };

        Ok(TransportRequest {
            method: spec.method.clone(),
            url: self.build_url(spec),
            headers,
            query,
            body,
            timeout: options.timeout.unwrap_or(self.config.timeout),
        })
    }

    /// Send a request and return the raw response, recording its weight.
    /// Non-2xx statuses are not errors at this level.
    #[instrument(skip(self, spec, credentials), fields(exchange = %self.config.exchange_name, method = %spec.method, endpoint = %spec.path))]
    pub async fn dispatch(
        &self,
        spec: &RequestSpec,
        credentials: &Credentials,
    ) -> Result<TransportResponse, ExchangeError> {
        let request = self.prepare(spec, credentials)?;
        debug!(signed = spec.signed, url = %request.url, "sending request");

        let response = self.transport.send(request).await?;
        self.record_weight(&response).await;
        Ok(response)
    }

    /// Send a request and parse its JSON payload
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        credentials: &Credentials,
    ) -> Result<Value, ExchangeError> {
        let response = self.dispatch(spec, credentials).await?;
        handle_response(&response)
    }

    /// Send a request and deserialize its payload into `R`
    pub async fn execute_json<R: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        credentials: &Credentials,
    ) -> Result<R, ExchangeError> {
        let value = self.execute(spec, credentials).await?;
        serde_json::from_value(value).map_err(|e| {
            ExchangeError::DeserializationError(format!("Failed to deserialize JSON: {}", e))
        })
    }

    async fn record_weight(&self, response: &TransportResponse) {
        let weight = WEIGHT_HEADERS
            .iter()
            .find_map(|name| response.header(name))
            .unwrap_or("0")
            .to_string();
        let timestamp = response
            .header("date")
            .and_then(|date| chrono::DateTime::parse_from_rfc2822(date).ok())
            .map_or(0.0, |dt| dt.timestamp_millis() as f64 / 1000.0);

        trace!(%weight, status = response.status, "recording request weight");
        *self.weight.write().await = Some(WeightSnapshot {
            weight,
            timestamp,
            status_code: response.status,
        });
    }
}

/// Classify a completed exchange: non-2xx is an API error, an unparseable
/// success body is a deserialization error.
pub fn handle_response(response: &TransportResponse) -> Result<Value, ExchangeError> {
    if !response.is_success() {
        return Err(ExchangeError::ApiError {
            code: i32::from(response.status),
            message: response.body.clone(),
        });
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_str(&response.body).map_err(|e| {
        ExchangeError::DeserializationError(format!(
            "Invalid response: {} ({})",
            response.body, e
        ))
    })
}
