pub mod messages;
pub mod provider;

pub use provider::MexcMarketDataProvider;
