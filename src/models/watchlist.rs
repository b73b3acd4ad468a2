use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::models::indicators::IndicatorSpec;
use crate::models::signal::AlertSubscription;
use crate::models::timeframe::Timeframe;

/// Exchange symbol of a watched asset, e.g. `ADA/USDT:USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Result<Self, ConfigError> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ConfigError::EmptyAsset);
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Contract symbol as the REST API expects it: `ADA/USDT:USDT` -> `ADA_USDT`.
    pub fn exchange_symbol(&self) -> String {
        let base = self.0.split(':').next().unwrap_or(&self.0);
        base.replace('/', "_")
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const DEFAULT_COINS: [&str; 20] = [
    "ADA", "APT", "CRO", "DOGE", "DOT", "HBAR", "KAS", "NEAR", "ONDO", "PEPE", "PI", "POL",
    "SHIB", "SUI", "TONCOIN", "TRX", "VET", "WLD", "XLM", "XRP",
];

/// User-managed configuration: the asset roster, the indicator list and the
/// alert subscription of each asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    pub assets: Vec<Asset>,
    pub indicators: Vec<IndicatorSpec>,
    #[serde(default)]
    pub subscriptions: BTreeMap<Asset, AlertSubscription>,
}

impl Watchlist {
    /// Starting roster used when nothing has been saved yet: twenty USDT
    /// perpetuals, EMA21 and MACD on 15m, EMA50 and MACD on 1h.
    pub fn seeded() -> Self {
        let assets = DEFAULT_COINS
            .iter()
            .map(|coin| Asset(format!("{}/USDT:USDT", coin)))
            .collect();

        Self {
            assets,
            indicators: vec![
                IndicatorSpec::ema(21, Timeframe::M15),
                IndicatorSpec::ema(50, Timeframe::H1),
                IndicatorSpec::macd(12, 26, 9, Timeframe::M15),
                IndicatorSpec::macd(12, 26, 9, Timeframe::H1),
            ],
            subscriptions: BTreeMap::new(),
        }
    }

    pub fn subscription(&self, asset: &Asset) -> AlertSubscription {
        self.subscriptions.get(asset).copied().unwrap_or_default()
    }

    /// Distinct timeframes referenced by at least one indicator.
    pub fn active_timeframes(&self) -> Vec<Timeframe> {
        let mut timeframes: Vec<Timeframe> =
            self.indicators.iter().map(|spec| spec.timeframe).collect();
        timeframes.sort();
        timeframes.dedup();
        timeframes
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        self.assets.contains(asset)
    }

    /// Finds a rostered asset by its symbol or its exchange form
    /// (`ADA/USDT:USDT` and `ADA_USDT` both resolve).
    pub fn resolve(&self, symbol: &str) -> Option<Asset> {
        let wanted = symbol.trim().to_uppercase();
        self.assets
            .iter()
            .find(|asset| asset.as_str() == wanted || asset.exchange_symbol() == wanted)
            .cloned()
    }
}
