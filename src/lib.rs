pub mod core;
pub mod exchanges;

pub use crate::core::{
    config::{Credentials, ExchangeConfig},
    errors::ExchangeError,
    traits::UserDataStream,
    types::*,
};
pub use exchanges::binance::{BinanceRestClient, KlinesBatch, KlinesFetcher, KlinesFetcherConfig};
