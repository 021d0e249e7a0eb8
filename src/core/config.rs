use crate::core::kernel::transport::TransportOptions;
use crate::core::types::ExchangeTarget;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

/// Default request timeout applied when neither the instance nor the call sets one
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

pub const DEFAULT_USER_AGENT: &str = concat!("binance-rest/", env!("CARGO_PKG_VERSION"));

/// API key / secret pair. Either half may be missing; signed calls need both.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: Option<Secret<String>>,
    pub api_secret: Option<Secret<String>>,
}

impl Credentials {
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: non_empty(api_key.into()),
            api_secret: non_empty(api_secret.into()),
        }
    }

    /// Credentials carrying only an API key (enough for key-header endpoints)
    #[must_use]
    pub fn api_key_only(api_key: impl Into<String>) -> Self {
        Self {
            api_key: non_empty(api_key.into()),
            api_secret: None,
        }
    }

    /// Layer `other` on top of `self`: any field present in `other` wins.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            api_secret: other.api_secret.clone().or_else(|| self.api_secret.clone()),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }

    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Both halves present, as required by signed endpoints
    pub fn can_sign(&self) -> bool {
        self.api_key().is_some() && self.api_secret().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.api_secret.is_none()
    }
}

fn non_empty(value: String) -> Option<Secret<String>> {
    if value.is_empty() {
        None
    } else {
        Some(Secret::new(value))
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub credentials: Credentials,
    pub exchange: ExchangeTarget,
    pub timeout_seconds: u64,
    pub transport_options: TransportOptions,
    /// Added to the local clock when stamping signed requests
    pub time_offset_ms: i64,
    pub user_agent: String,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let redact = |present: bool| if present { Some("[REDACTED]") } else { None };
        let mut state = serializer.serialize_struct("ExchangeConfig", 7)?;
        state.serialize_field("api_key", &redact(self.credentials.api_key.is_some()))?;
        state.serialize_field("api_secret", &redact(self.credentials.api_secret.is_some()))?;
        state.serialize_field("exchange", self.exchange.as_str())?;
        state.serialize_field("timeout_seconds", &self.timeout_seconds)?;
        state.serialize_field("transport_options", &self.transport_options)?;
        state.serialize_field("time_offset_ms", &self.time_offset_ms)?;
        state.serialize_field("user_agent", &self.user_agent)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            #[serde(default)]
            api_key: Option<String>,
            #[serde(default)]
            api_secret: Option<String>,
            #[serde(default)]
            exchange: Option<String>,
            #[serde(default)]
            timeout_seconds: Option<u64>,
            #[serde(default)]
            transport_options: TransportOptions,
            #[serde(default)]
            time_offset_ms: i64,
            #[serde(default)]
            user_agent: Option<String>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        let exchange = match helper.exchange {
            Some(id) => id.parse().map_err(serde::de::Error::custom)?,
            None => ExchangeTarget::default(),
        };

        Ok(Self {
            credentials: Credentials::new(
                helper.api_key.unwrap_or_default(),
                helper.api_secret.unwrap_or_default(),
            ),
            exchange,
            timeout_seconds: helper.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            transport_options: helper.transport_options,
            time_offset_ms: helper.time_offset_ms,
            user_agent: helper
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self::read_only()
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            credentials: Credentials::new(api_key, secret_key),
            ..Self::read_only()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Recognised environment variables (all optional):
    /// - `{EXCHANGE}_API_KEY` (e.g., `BINANCE_API_KEY`)
    /// - `{EXCHANGE}_SECRET_KEY` (e.g., `BINANCE_SECRET_KEY`)
    /// - `{EXCHANGE}_EXCHANGE` (target id such as `binance.com-testnet`)
    /// - `{EXCHANGE}_TIMEOUT_SECONDS`
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = exchange_prefix.to_uppercase();
        let var = |suffix: &str| env::var(format!("{}_{}", prefix, suffix)).ok();

        let mut config = Self::new(
            var("API_KEY").unwrap_or_default(),
            var("SECRET_KEY").unwrap_or_default(),
        );

        if let Some(exchange) = var("EXCHANGE") {
            config.exchange = exchange.parse()?;
        }

        if let Some(timeout) = var("TIMEOUT_SECONDS") {
            config.timeout_seconds = timeout.parse().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{}_TIMEOUT_SECONDS is not a number: {}",
                    prefix, timeout
                ))
            })?;
        }

        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(exchange_prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        exchange_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no .env file, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(exchange_prefix)
    }

    /// Configuration for public endpoints only (no credentials)
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            credentials: Credentials::default(),
            exchange: ExchangeTarget::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            transport_options: TransportOptions::default(),
            time_offset_ms: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Check if this configuration has valid credentials for signed operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.can_sign()
    }

    #[must_use]
    pub const fn exchange(mut self, exchange: ExchangeTarget) -> Self {
        self.exchange = exchange;
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub const fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Default transport options merged into every request of the client
    #[must_use]
    pub fn transport_options(mut self, options: TransportOptions) -> Self {
        self.transport_options = options;
        self
    }

    #[must_use]
    pub const fn time_offset_ms(mut self, offset: i64) -> Self {
        self.time_offset_ms = offset;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Base REST URI of the selected target, failing for targets without one
    pub fn rest_base_uri(&self) -> Result<&'static str, ConfigError> {
        let uri = self.exchange.settings().api_base_uri;
        if uri.is_empty() {
            return Err(ConfigError::MissingRestEndpoint(
                self.exchange.as_str().to_string(),
            ));
        }
        Ok(uri)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),

    #[error("Exchange {0} has no REST endpoint")]
    MissingRestEndpoint(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_prefers_call_credentials() {
        let instance = Credentials::new("instance_key", "instance_secret");
        let call = Credentials::new("call_key", "call_secret");
        let merged = instance.overlay(&call);
        assert_eq!(merged.api_key(), Some("call_key"));
        assert_eq!(merged.api_secret(), Some("call_secret"));
        assert_eq!(instance.api_key(), Some("instance_key"));
    }

    #[test]
    fn test_overlay_keeps_missing_fields() {
        let instance = Credentials::new("instance_key", "instance_secret");
        let merged = instance.overlay(&Credentials::api_key_only("other_key"));
        assert_eq!(merged.api_key(), Some("other_key"));
        assert_eq!(merged.api_secret(), Some("instance_secret"));
        assert!(merged.can_sign());
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let creds = Credentials::new("", "");
        assert!(creds.is_empty());
        assert!(!ExchangeConfig::new(String::new(), "secret".to_string()).has_credentials());
    }

    #[test]
    fn test_serialize_redacts_secrets() {
        let config = ExchangeConfig::new("my_key".to_string(), "my_secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("my_key"));
        assert!(!json.contains("my_secret"));
        assert!(json.contains("[REDACTED]"));
        assert!(json.contains("binance.com"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ExchangeConfig =
            serde_json::from_str(r#"{"api_key":"k","exchange":"binance.com-testnet"}"#).unwrap();
        assert_eq!(config.exchange, ExchangeTarget::BinanceTestnet);
        assert_eq!(config.credentials.api_key(), Some("k"));
        assert!(config.credentials.api_secret().is_none());
        assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_dex_targets_have_no_rest_endpoint() {
        let config = ExchangeConfig::read_only().exchange(ExchangeTarget::BinanceOrg);
        assert!(matches!(
            config.rest_base_uri(),
            Err(ConfigError::MissingRestEndpoint(_))
        ));
        let config = ExchangeConfig::read_only();
        assert_eq!(config.rest_base_uri().unwrap(), "https://api.binance.com/api");
    }
}
