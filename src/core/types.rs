use crate::core::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-venue endpoint settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeSettings {
    pub ws_max_connections: u32,
    /// REST base, without the API version segment. Empty for DEX venues.
    pub api_base_uri: &'static str,
    pub ws_base_uri: &'static str,
    pub ws_api_base_uri: &'static str,
    pub exchange_type: ExchangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeType {
    Cex,
    Dex,
}

/// Which Binance deployment a client talks to. Fixed at client construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExchangeTarget {
    #[default]
    Binance,
    BinanceTestnet,
    BinanceWallet,
    BinanceMargin,
    BinanceMarginTestnet,
    BinanceIsolatedMargin,
    BinanceIsolatedMarginTestnet,
    BinanceFutures,
    BinanceCoinFutures,
    BinanceFuturesTestnet,
    BinanceUs,
    TrBinance,
    BinanceOrg,
    BinanceOrgTestnet,
}

impl ExchangeTarget {
    pub fn all() -> [Self; 14] {
        [
            Self::Binance,
            Self::BinanceTestnet,
            Self::BinanceWallet,
            Self::BinanceMargin,
            Self::BinanceMarginTestnet,
            Self::BinanceIsolatedMargin,
            Self::BinanceIsolatedMarginTestnet,
            Self::BinanceFutures,
            Self::BinanceCoinFutures,
            Self::BinanceFuturesTestnet,
            Self::BinanceUs,
            Self::TrBinance,
            Self::BinanceOrg,
            Self::BinanceOrgTestnet,
        ]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binance => "binance.com",
            Self::BinanceTestnet => "binance.com-testnet",
            Self::BinanceWallet => "binance.com-wallet",
            Self::BinanceMargin => "binance.com-margin",
            Self::BinanceMarginTestnet => "binance.com-margin-testnet",
            Self::BinanceIsolatedMargin => "binance.com-isolated_margin",
            Self::BinanceIsolatedMarginTestnet => "binance.com-isolated_margin-testnet",
            Self::BinanceFutures => "binance.com-futures",
            Self::BinanceCoinFutures => "binance.com-coin_futures",
            Self::BinanceFuturesTestnet => "binance.com-futures-testnet",
            Self::BinanceUs => "binance.us",
            Self::TrBinance => "trbinance.com",
            Self::BinanceOrg => "binance.org",
            Self::BinanceOrgTestnet => "binance.org-testnet",
        }
    }

    pub const fn settings(&self) -> ExchangeSettings {
        const STREAM: &str = "wss://stream.binance.com:9443/";
        const TESTNET_API: &str = "https://testnet.binance.vision/api";
        const TESTNET_STREAM: &str = "wss://testnet.binance.vision/";

        let (ws_max_connections, api_base_uri, ws_base_uri, ws_api_base_uri, exchange_type) =
            match self {
                Self::Binance => (
                    1024,
                    "https://api.binance.com/api",
                    STREAM,
                    "wss://ws-api.binance.com/ws-api/v3",
                    ExchangeType::Cex,
                ),
                Self::BinanceTestnet => (
                    1024,
                    TESTNET_API,
                    TESTNET_STREAM,
                    "wss://testnet.binance.vision/ws-api/v3",
                    ExchangeType::Cex,
                ),
                Self::BinanceWallet => (0, "https://api.binance.com/sapi", "", "", ExchangeType::Cex),
                Self::BinanceMargin | Self::BinanceIsolatedMargin => (
                    1024,
                    "https://api.binance.com/api",
                    STREAM,
                    "",
                    ExchangeType::Cex,
                ),
                Self::BinanceMarginTestnet | Self::BinanceIsolatedMarginTestnet => {
                    (1024, TESTNET_API, TESTNET_STREAM, "", ExchangeType::Cex)
                }
                Self::BinanceFutures => (
                    200,
                    "https://api.binance.com/api",
                    "wss://fstream.binance.com/",
                    "",
                    ExchangeType::Cex,
                ),
                Self::BinanceCoinFutures => (
                    200,
                    "https://api.binance.com/api",
                    "wss://dstream.binance.com/",
                    "",
                    ExchangeType::Cex,
                ),
                Self::BinanceFuturesTestnet => (
                    200,
                    "https://testnet.binancefuture.com/fapi",
                    "wss://stream.binancefuture.com/",
                    "",
                    ExchangeType::Cex,
                ),
                Self::BinanceUs => (
                    1024,
                    "https://api.binance.us/api",
                    "wss://stream.binance.us:9443/",
                    "",
                    ExchangeType::Cex,
                ),
                Self::TrBinance => (
                    1024,
                    "https://www.trbinance.com/api",
                    "wss://stream-cloud.trbinance.com/",
                    "",
                    ExchangeType::Cex,
                ),
                Self::BinanceOrg => (1024, "", "wss://dex.binance.org/api/", "", ExchangeType::Dex),
                Self::BinanceOrgTestnet => (
                    1024,
                    "",
                    "wss://testnet-dex.binance.org/api/",
                    "",
                    ExchangeType::Dex,
                ),
            };

        ExchangeSettings {
            ws_max_connections,
            api_base_uri,
            ws_base_uri,
            ws_api_base_uri,
            exchange_type,
        }
    }

    pub const fn is_testnet(&self) -> bool {
        matches!(
            self,
            Self::BinanceTestnet
                | Self::BinanceMarginTestnet
                | Self::BinanceIsolatedMarginTestnet
                | Self::BinanceFuturesTestnet
                | Self::BinanceOrgTestnet
        )
    }
}

impl FromStr for ExchangeTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedExchange(s.to_string()))
    }
}

impl fmt::Display for ExchangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate-limit weight reported by the last completed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub weight: String,
    /// Epoch seconds taken from the response `Date` header, 0.0 when absent
    pub timestamp: f64,
    pub status_code: u16,
}

/// Opaque user-data-stream token. Lifetime is owned by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenKey(pub String);

impl ListenKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientLifecycleState {
    Active,
    Stopped,
}

/// Kline interval enum in Binance's wire vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineInterval {
    Seconds1,

    Minutes1,
    Minutes3,
    Minutes5,
    Minutes15,
    Minutes30,

    Hours1,
    Hours2,
    Hours4,
    Hours6,
    Hours8,
    Hours12,

    Days1,
    Days3,

    Weeks1,

    Months1,
}

impl KlineInterval {
    /// Wire format (e.g., "1m", "1h", "1d")
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds1 => "1s",
            Self::Minutes1 => "1m",
            Self::Minutes3 => "3m",
            Self::Minutes5 => "5m",
            Self::Minutes15 => "15m",
            Self::Minutes30 => "30m",
            Self::Hours1 => "1h",
            Self::Hours2 => "2h",
            Self::Hours4 => "4h",
            Self::Hours6 => "6h",
            Self::Hours8 => "8h",
            Self::Hours12 => "12h",
            Self::Days1 => "1d",
            Self::Days3 => "3d",
            Self::Weeks1 => "1w",
            Self::Months1 => "1M",
        }
    }

    /// Fixed length in milliseconds; `None` for calendar months.
    pub const fn duration_ms(&self) -> Option<i64> {
        const SECOND: i64 = 1_000;
        const MINUTE: i64 = 60 * SECOND;
        const HOUR: i64 = 60 * MINUTE;
        const DAY: i64 = 24 * HOUR;
        match self {
            Self::Seconds1 => Some(SECOND),
            Self::Minutes1 => Some(MINUTE),
            Self::Minutes3 => Some(3 * MINUTE),
            Self::Minutes5 => Some(5 * MINUTE),
            Self::Minutes15 => Some(15 * MINUTE),
            Self::Minutes30 => Some(30 * MINUTE),
            Self::Hours1 => Some(HOUR),
            Self::Hours2 => Some(2 * HOUR),
            Self::Hours4 => Some(4 * HOUR),
            Self::Hours6 => Some(6 * HOUR),
            Self::Hours8 => Some(8 * HOUR),
            Self::Hours12 => Some(12 * HOUR),
            Self::Days1 => Some(DAY),
            Self::Days3 => Some(3 * DAY),
            Self::Weeks1 => Some(7 * DAY),
            Self::Months1 => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Seconds1,
            Self::Minutes1,
            Self::Minutes3,
            Self::Minutes5,
            Self::Minutes15,
            Self::Minutes30,
            Self::Hours1,
            Self::Hours2,
            Self::Hours4,
            Self::Hours6,
            Self::Hours8,
            Self::Hours12,
            Self::Days1,
            Self::Days3,
            Self::Weeks1,
            Self::Months1,
        ]
    }
}

impl FromStr for KlineInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| format!("Unknown kline interval: {}", s))
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
