pub mod account;
pub mod builder;
pub mod client;
pub mod klines;
pub mod market_data;
pub mod types;
pub mod user_stream;

// Re-export main types for easier importing
pub use builder::{build_client, build_client_with_transport, build_klines_fetcher};
pub use client::BinanceRestClient;
pub use klines::{KlinesBatch, KlinesFetcher, KlinesFetcherConfig, KlinesRange};
pub use types::{
    BinanceAccountInfo, BinanceBalance, BinanceExchangeInfo, BinanceFilter, BinanceOrderBook,
    BinanceServerTime, BinanceSymbolInfo, BinanceTickerPrice, BinanceTrade, CandleRow,
    ListenKeyResponse, PairSeries,
};
