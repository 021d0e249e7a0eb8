mod common;

use binance_rest::core::config::ExchangeConfig;
use binance_rest::core::errors::ExchangeError;
use binance_rest::core::kernel::TransportResponse;
use binance_rest::core::types::KlineInterval;
use binance_rest::exchanges::binance::klines::normalize_pair;
use binance_rest::exchanges::binance::{
    build_client_with_transport, build_klines_fetcher, KlinesFetcher, KlinesFetcherConfig,
    KlinesRange,
};
use common::{endpoint, klines_json, query_param, MockTransport};
use std::sync::Arc;
use std::time::Duration;

const WINDOW: KlinesRange = KlinesRange::Window {
    from_ms: 1_700_000_000_000,
    to_ms: 1_700_000_300_000,
};

/// Exchange double answering klines per wire symbol
fn klines_exchange() -> Arc<MockTransport> {
    MockTransport::new(|request| {
        let body = match query_param(request, "symbol") {
            Some("BTCUSDT") => klines_json(&[
                (0, "100", "101"),
                (60_000, "101", "102"),
                (120_000, "102", "103"),
            ]),
            Some("ETHUSDT") => klines_json(&[(0, "10", "11"), (120_000, "12", "13")]),
            Some("BNBUSDT") => klines_json(&[(60_000, "5", "6"), (120_000, "6", "7")]),
            Some("DOGEUSDT") => "[]".to_string(),
            _ => {
                return Ok(TransportResponse::new(
                    400,
                    r#"{"code":-1121,"msg":"Invalid symbol."}"#,
                ))
            }
        };
        Ok(common::ok_json(&body))
    })
}

fn fetcher(
    transport: &Arc<MockTransport>,
    pairs: &[&str],
) -> KlinesFetcher<Arc<MockTransport>> {
    let config = KlinesFetcherConfig::new(pairs.iter().copied(), KlineInterval::Minutes1)
        .with_range(WINDOW)
        .with_reference_pair("BTC-USDT");
    KlinesFetcher::with_transport(ExchangeConfig::read_only(), Arc::clone(transport), config)
        .unwrap()
}

#[cfg(test)]
mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn test_results_keyed_by_original_pair() {
        let transport = klines_exchange();
        let fetcher = fetcher(&transport, &["BTC-USDT", "ETH-USDT"]);

        let batch = fetcher.fetch_pairs_klines().await.unwrap();

        assert!(batch.is_complete());
        assert!(!batch.reconciled);
        assert_eq!(
            batch.series.keys().collect::<Vec<_>>(),
            vec!["BTC-USDT", "ETH-USDT"]
        );
        assert_eq!(batch.get("BTC-USDT").unwrap().len(), 3);
        assert_eq!(batch.get("ETH-USDT").unwrap().len(), 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(endpoint(request), "klines");
            assert_eq!(query_param(request, "interval"), Some("1m"));
            assert_eq!(query_param(request, "startTime"), Some("1700000000000"));
            assert_eq!(query_param(request, "endTime"), Some("1700000300000"));
            assert_eq!(query_param(request, "limit"), None);
        }
        let mut symbols: Vec<&str> = requests
            .iter()
            .filter_map(|r| query_param(r, "symbol"))
            .collect();
        symbols.sort_unstable();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[tokio::test]
    async fn test_failed_pair_does_not_abort_siblings() {
        let transport = klines_exchange();
        let fetcher = fetcher(&transport, &["BTC-USDT", "XXX-USDT", "ETH-USDT"]);

        let batch = fetcher.fetch_pairs_klines().await.unwrap();

        assert_eq!(batch.series.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        match batch.failures.get("XXX-USDT") {
            Some(ExchangeError::PairFetch { pair, source }) => {
                assert_eq!(pair, "XXX-USDT");
                assert!(source.is_api_error());
            }
            other => panic!("expected pair failure, got {:?}", other),
        }
        assert_eq!(batch.failures["XXX-USDT"].status_code(), Some(400));
    }

    #[tokio::test]
    async fn test_reference_pair_failure_is_partial() {
        let transport = MockTransport::new(|request| match query_param(request, "symbol") {
            Some("ETHUSDT") => Ok(TransportResponse::new(503, "Service Unavailable")),
            _ => Ok(common::ok_json(&klines_json(&[(0, "1", "2")]))),
        });
        let config = KlinesFetcherConfig::new(["BTC-USDT", "ETH-USDT"], KlineInterval::Minutes1)
            .with_range(WINDOW);
        let fetcher = KlinesFetcher::with_transport(
            ExchangeConfig::read_only(),
            Arc::clone(&transport),
            config,
        )
        .unwrap();

        let batch = fetcher.fetch_and_fill_klines().await.unwrap();

        assert_eq!(batch.get("BTC-USDT").unwrap().len(), 1);
        assert!(batch.get("ETH-USDT").is_none());
        assert_eq!(batch.failures["ETH-USDT"].status_code(), Some(503));
        assert!(!batch.reconciled);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_pairs_fetched_once() {
        let transport = klines_exchange();
        let fetcher = fetcher(&transport, &["BTC-USDT", "BTC-USDT", "ETH-USDT"]);

        let batch = fetcher.fetch_pairs_klines().await.unwrap();

        assert_eq!(batch.series.len(), 2);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_pairs_run_concurrently() {
        let transport = MockTransport::delayed(Duration::from_millis(200), |_| {
            Ok(common::ok_json("[]"))
        });
        let pairs = ["A-USDT", "B-USDT", "C-USDT", "D-USDT", "E-USDT"];
        let fetcher = fetcher(&transport, &pairs);

        let started = std::time::Instant::now();
        let batch = fetcher.fetch_pairs_klines().await.unwrap();

        assert_eq!(batch.series.len(), 5);
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_pair_timeout_is_reported_per_pair() {
        let transport = MockTransport::delayed(Duration::from_millis(300), |_| {
            Ok(common::ok_json("[]"))
        });
        let config = KlinesFetcherConfig::new(["BTC-USDT"], KlineInterval::Minutes1)
            .with_range(WINDOW)
            .with_pair_timeout(Duration::from_millis(20));
        let fetcher =
            KlinesFetcher::with_transport(ExchangeConfig::read_only(), transport, config).unwrap();

        let batch = fetcher.fetch_pairs_klines().await.unwrap();

        match &batch.failures["BTC-USDT"] {
            ExchangeError::PairFetch { source, .. } => {
                assert!(matches!(**source, ExchangeError::Timeout(_)));
            }
            other => panic!("expected pair failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_when_enabled() {
        let transport = MockTransport::new(|_| {
            Err(ExchangeError::NetworkError("connection reset".to_string()))
        });
        let config = KlinesFetcherConfig::new(["BTC-USDT"], KlineInterval::Minutes1)
            .with_range(WINDOW)
            .with_retries(2, Duration::from_millis(2));
        let fetcher = KlinesFetcher::with_transport(
            ExchangeConfig::read_only(),
            Arc::clone(&transport),
            config,
        )
        .unwrap();

        let batch = fetcher.fetch_pairs_klines().await.unwrap();

        assert_eq!(batch.failures.len(), 1);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_api_errors_are_not_retried() {
        let transport = klines_exchange();
        let config = KlinesFetcherConfig::new(["XXX-USDT"], KlineInterval::Minutes1)
            .with_range(WINDOW)
            .with_retries(3, Duration::from_millis(2));
        let fetcher = KlinesFetcher::with_transport(
            ExchangeConfig::read_only(),
            Arc::clone(&transport),
            config,
        )
        .unwrap();

        fetcher.fetch_pairs_klines().await.unwrap();
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stopped_client_fetches_nothing() {
        let transport = klines_exchange();
        let client =
            build_client_with_transport(ExchangeConfig::read_only(), Arc::clone(&transport))
                .unwrap();
        let fetcher = build_klines_fetcher(
            &client,
            KlinesFetcherConfig::new(["BTC-USDT"], KlineInterval::Minutes1).with_range(WINDOW),
        );

        client.stop();

        let result = fetcher.fetch_pairs_klines().await;
        assert!(matches!(result, Err(ExchangeError::AlreadyStopped)));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_normalization() {
        for pair in ["BTC-USDT", "ETH-BTC", "BNB-USDT"] {
            let wire = normalize_pair(pair);
            assert!(!wire.contains('-'));
            assert_eq!(wire, pair.replace('-', ""));
        }
    }
}

#[cfg(test)]
mod fill_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_and_fill_aligns_to_reference() {
        let transport = klines_exchange();
        let fetcher = fetcher(&transport, &["BTC-USDT", "ETH-USDT", "BNB-USDT", "DOGE-USDT"]);

        let batch = fetcher.fetch_and_fill_klines().await.unwrap();

        assert!(batch.reconciled);
        let axis = vec![0, 60_000, 120_000];
        assert_eq!(batch.get("BTC-USDT").unwrap().open_times(), axis);

        let eth = batch.get("ETH-USDT").unwrap();
        assert_eq!(eth.open_times(), axis);
        assert_eq!(eth.rows[1].close, "11");
        assert_eq!(eth.rows[1].volume, "0");

        let bnb = batch.get("BNB-USDT").unwrap();
        assert_eq!(bnb.open_times(), axis);
        assert_eq!(bnb.rows[0].close, "5");
        assert_eq!(bnb.rows[0].number_of_trades, 0);

        assert!(batch.get("DOGE-USDT").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reference_skips_reconciliation() {
        let transport = klines_exchange();
        let config = KlinesFetcherConfig::new(["ETH-USDT", "BNB-USDT"], KlineInterval::Minutes1)
            .with_range(WINDOW);
        let fetcher =
            KlinesFetcher::with_transport(ExchangeConfig::read_only(), transport, config).unwrap();

        // default reference ETH-USDT is present here
        let batch = fetcher.fetch_and_fill_klines().await.unwrap();
        assert!(batch.reconciled);
        assert_eq!(batch.get("BNB-USDT").unwrap().open_times(), vec![0, 120_000]);

        let transport = klines_exchange();
        let fetcher = fetcher_without_reference(&transport);
        let batch = fetcher.fetch_and_fill_klines().await.unwrap();
        assert!(!batch.reconciled);
        assert_eq!(batch.get("BNB-USDT").unwrap().len(), 2);
    }

    fn fetcher_without_reference(transport: &Arc<MockTransport>) -> KlinesFetcher<Arc<MockTransport>> {
        let config = KlinesFetcherConfig::new(["BNB-USDT", "XXX-USDT"], KlineInterval::Minutes1)
            .with_range(WINDOW)
            .with_reference_pair("XXX-USDT");
        KlinesFetcher::with_transport(ExchangeConfig::read_only(), Arc::clone(transport), config)
            .unwrap()
    }
}
