//! Upstream market data: provider interface, MEXC client, series fetcher.

pub mod fetcher;
pub mod market_data;
pub mod mexc;

pub use fetcher::{prepare_series, FetchError, SeriesFetcher};
pub use market_data::{MarketDataError, MarketDataProvider};
pub use mexc::MexcMarketDataProvider;
