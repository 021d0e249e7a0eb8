pub mod fetcher;
pub mod reconcile;

pub use fetcher::{
    normalize_pair, KlinesBatch, KlinesFetcher, KlinesFetcherConfig, KlinesRange,
    DEFAULT_REFERENCE_PAIR,
};
pub use reconcile::{align_to_reference, fill_missing_pairs};
