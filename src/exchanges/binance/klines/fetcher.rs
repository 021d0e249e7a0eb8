use super::reconcile::fill_missing_pairs;
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestTransport, Transport};
use crate::core::types::KlineInterval;
use crate::exchanges::binance::client::BinanceRestClient;
use crate::exchanges::binance::types::{CandleRow, PairSeries};
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tokio_retry::RetryIf;
use tracing::{info, instrument, warn};

pub const DEFAULT_REFERENCE_PAIR: &str = "ETH-USDT";
pub const DEFAULT_LOOKBACK_MINUTES: f64 = 5.0;
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;
pub const PAIR_SEPARATOR: char = '-';

/// Time range requested for every pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KlinesRange {
    /// Explicit window in epoch milliseconds
    Window { from_ms: i64, to_ms: i64 },
    /// The last N minutes, ending half a second before now
    LastMinutes(f64),
}

impl Default for KlinesRange {
    fn default() -> Self {
        Self::LastMinutes(DEFAULT_LOOKBACK_MINUTES)
    }
}

impl KlinesRange {
    /// Resolve to a concrete `(from, to)` millisecond window
    pub fn resolve(&self) -> Result<(i64, i64), ExchangeError> {
        match *self {
            Self::Window { from_ms, to_ms } => {
                if from_ms <= 0 || to_ms <= 0 || from_ms > to_ms {
                    return Err(ExchangeError::InvalidParameters(format!(
                        "invalid klines window {}..{}",
                        from_ms, to_ms
                    )));
                }
                Ok((from_ms, to_ms))
            }
            Self::LastMinutes(minutes) => {
                if !minutes.is_finite() || minutes <= 0.0 {
                    return Err(ExchangeError::InvalidParameters(format!(
                        "lookback must be a positive number of minutes, got {}",
                        minutes
                    )));
                }
                let to_ms = chrono::Utc::now().timestamp_millis() - 500;
                let from_ms = to_ms - (minutes * 60_000.0) as i64;
                Ok((from_ms, to_ms))
            }
        }
    }
}

/// Batch download settings
#[derive(Debug, Clone)]
pub struct KlinesFetcherConfig {
    pub pairs: Vec<String>,
    pub interval: KlineInterval,
    pub range: KlinesRange,
    pub limit: Option<u32>,
    pub pair_timeout: Option<Duration>,
    pub pair_retries: usize,
    pub init_backoff: Duration,
    pub max_concurrency: usize,
    pub reference_pair: String,
}

impl KlinesFetcherConfig {
    pub fn new<I, S>(pairs: I, interval: KlineInterval) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(Into::into).collect(),
            interval,
            range: KlinesRange::default(),
            limit: None,
            pair_timeout: None,
            pair_retries: 0,
            init_backoff: Duration::from_secs(1),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            reference_pair: DEFAULT_REFERENCE_PAIR.to_string(),
        }
    }

    pub fn with_range(mut self, range: KlinesRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_pair_timeout(mut self, timeout: Duration) -> Self {
        self.pair_timeout = Some(timeout);
        self
    }

    /// Retry timed out or dropped pair requests, doubling the delay from
    /// `init_backoff` each attempt
    pub fn with_retries(mut self, retries: usize, init_backoff: Duration) -> Self {
        self.pair_retries = retries;
        self.init_backoff = init_backoff;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_reference_pair(mut self, pair: impl Into<String>) -> Self {
        self.reference_pair = pair.into();
        self
    }

    /// `init_backoff`, then doubled for each further attempt
    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        let base = self.init_backoff;
        (0..self.pair_retries)
            .map(move |attempt| base.saturating_mul(1_u32 << attempt.min(31)))
    }
}

/// Per-pair results of one batch
#[derive(Debug, Default)]
pub struct KlinesBatch {
    pub series: BTreeMap<String, PairSeries>,
    pub failures: BTreeMap<String, ExchangeError>,
    pub reconciled: bool,
}

impl KlinesBatch {
    pub fn get(&self, pair: &str) -> Option<&PairSeries> {
        self.series.get(pair)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// `BTC-USDT` becomes `BTCUSDT`
pub fn normalize_pair(pair: &str) -> String {
    pair.chars()
        .filter(|c| *c != PAIR_SEPARATOR)
        .collect::<String>()
        .to_uppercase()
}

fn is_transient(error: &ExchangeError) -> bool {
    match error {
        ExchangeError::Timeout(_) | ExchangeError::NetworkError(_) => true,
        ExchangeError::HttpError(e) => e.is_connect() || e.is_timeout() || e.is_request(),
        _ => false,
    }
}

/// Binance returns at most this many klines per call
const MAX_KLINES_PER_CALL: i64 = 1000;

/// Concurrent kline download for many pairs over one shared client.
pub struct KlinesFetcher<T: Transport = ReqwestTransport> {
    client: BinanceRestClient<T>,
    config: KlinesFetcherConfig,
}

impl KlinesFetcher<ReqwestTransport> {
    pub fn new(
        exchange_config: ExchangeConfig,
        config: KlinesFetcherConfig,
    ) -> Result<Self, ExchangeError> {
        Ok(Self::from_client(BinanceRestClient::new(exchange_config)?, config))
    }
}

impl<T: Transport> KlinesFetcher<T> {
    pub fn with_transport(
        exchange_config: ExchangeConfig,
        transport: T,
        config: KlinesFetcherConfig,
    ) -> Result<Self, ExchangeError> {
        Ok(Self::from_client(
            BinanceRestClient::with_transport(exchange_config, transport)?,
            config,
        ))
    }

    pub fn from_client(client: BinanceRestClient<T>, config: KlinesFetcherConfig) -> Self {
        info!(pairs = ?config.pairs, interval = %config.interval, "Will be getting klines");
        Self { client, config }
    }

    pub fn config(&self) -> &KlinesFetcherConfig {
        &self.config
    }

    pub fn client(&self) -> &BinanceRestClient<T> {
        &self.client
    }

    /// Download every configured pair concurrently.
    ///
    /// A failing pair lands in `failures` and does not abort the others.
    #[instrument(skip(self), fields(pairs = self.config.pairs.len()))]
    pub async fn fetch_pairs_klines(&self) -> Result<KlinesBatch, ExchangeError> {
        let (from_ms, to_ms) = self.config.range.resolve()?;
        self.client.ensure_active()?;

        if let Some(expected) = self.expected_rows(from_ms, to_ms) {
            let cap = self
                .config
                .limit
                .map_or(MAX_KLINES_PER_CALL, |limit| i64::from(limit).min(MAX_KLINES_PER_CALL));
            if expected > cap {
                warn!(
                    expected,
                    cap,
                    "Range holds more klines than one call returns, series will be truncated"
                );
            }
        }

        let mut seen = BTreeSet::new();
        let pairs: Vec<&str> = self
            .config
            .pairs
            .iter()
            .map(String::as_str)
            .filter(|p| seen.insert(*p))
            .collect();

        let started = Instant::now();
        let results: Vec<(String, Result<Vec<CandleRow>, ExchangeError>)> =
            stream::iter(pairs)
                .map(|pair| async move {
                    let result = self.fetch_pair(pair, from_ms, to_ms).await;
                    (pair.to_string(), result)
                })
                .buffer_unordered(self.config.max_concurrency.max(1))
                .collect()
                .await;

        let mut batch = KlinesBatch::default();
        for (pair, result) in results {
            match result {
                Ok(rows) => {
                    batch.series.insert(pair.clone(), PairSeries::new(pair, rows));
                }
                Err(e) => {
                    warn!(%pair, error = %e, "Failed to get klines");
                    batch.failures.insert(
                        pair.clone(),
                        ExchangeError::PairFetch {
                            pair,
                            source: Box::new(e),
                        },
                    );
                }
            }
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            fetched = batch.series.len(),
            failed = batch.failures.len(),
            "Download klines finished"
        );
        Ok(batch)
    }

    /// Download every pair, then align all series to the reference pair
    pub async fn fetch_and_fill_klines(&self) -> Result<KlinesBatch, ExchangeError> {
        let mut batch = self.fetch_pairs_klines().await?;
        batch.reconciled = fill_missing_pairs(&mut batch.series, &self.config.reference_pair);
        Ok(batch)
    }

    /// Number of candles in `[from, to]`, `None` for calendar-month intervals
    fn expected_rows(&self, from_ms: i64, to_ms: i64) -> Option<i64> {
        self.config
            .interval
            .duration_ms()
            .map(|step| (to_ms - from_ms) / step + 1)
    }

    async fn fetch_pair(
        &self,
        pair: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<CandleRow>, ExchangeError> {
        let symbol = normalize_pair(pair);
        let attempt = || self.fetch_pair_once(&symbol, from_ms, to_ms);

        RetryIf::spawn(self.config.retry_strategy(), attempt, |e: &ExchangeError| {
            let retry = is_transient(e);
            if retry {
                warn!(%pair, error = %e, "Transient failure, retrying");
            }
            retry
        })
        .await
    }

    async fn fetch_pair_once(
        &self,
        symbol: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<CandleRow>, ExchangeError> {
        let request = self.client.get_klines(
            symbol,
            self.config.interval,
            self.config.limit,
            Some(from_ms),
            Some(to_ms),
        );

        match self.config.pair_timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                ExchangeError::Timeout(format!("klines for {} exceeded {:?}", symbol, limit))
            })?,
            None => request.await,
        }
    }
}
