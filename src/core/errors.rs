use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Client has already been stopped and cannot be used")]
    AlreadyStopped,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Failed to fetch klines for {pair}: {source}")]
    PairFetch {
        pair: String,
        #[source]
        source: Box<ExchangeError>,
    },

    #[error("Other error: {0}")]
    Other(String),
}

impl ExchangeError {
    /// Errors raised before any network I/O because the client or request is
    /// misconfigured. These are never suppressed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials(_) | Self::AlreadyStopped | Self::ConfigError(_)
        )
    }

    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::ApiError { .. })
    }

    /// HTTP status code carried by an API error.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            Self::PairFetch { source, .. } => source.status_code(),
            _ => None,
        }
    }
}

/// Turn an API error into `Ok(None)` while letting every other error through.
///
/// This is the "do not raise" mode for calls that opt into inspecting remote
/// failures as data.
pub fn suppress_api_error<T>(result: Result<T, ExchangeError>) -> Result<Option<T>, ExchangeError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ExchangeError::ApiError { code, message }) => {
            tracing::debug!(code, %message, "suppressing API error");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
