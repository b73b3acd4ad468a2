//! Versioned in-memory watchlist; every mutation is validated, bumps the
//! version and is written through to the backing [`ConfigStore`].

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{ConfigError, MAX_INDICATORS};
use crate::indicators::validation::{validate_indicators, validate_spec};
use crate::models::indicators::IndicatorSpec;
use crate::models::signal::AlertSubscription;
use crate::models::watchlist::{Asset, Watchlist};
use crate::store::ConfigStore;

struct Versioned {
    version: u64,
    watchlist: Watchlist,
}

pub struct WatchlistStore {
    inner: RwLock<Versioned>,
    backend: Arc<dyn ConfigStore>,
}

impl WatchlistStore {
    /// Loads from the backend. A missing, unreadable or invalid watchlist is
    /// replaced by the seeded default.
    pub async fn load(backend: Arc<dyn ConfigStore>) -> Self {
        let watchlist = match backend.load().await {
            Ok(Some(watchlist)) => match validate_indicators(&watchlist.indicators) {
                Ok(()) => {
                    info!(
                        assets = watchlist.assets.len(),
                        indicators = watchlist.indicators.len(),
                        "Loaded watchlist with {} assets and {} indicators",
                        watchlist.assets.len(),
                        watchlist.indicators.len()
                    );
                    watchlist
                }
                Err(e) => {
                    warn!(error = %e, "Saved watchlist is invalid, using defaults");
                    Watchlist::seeded()
                }
            },
            Ok(None) => {
                info!("No saved watchlist, using defaults");
                Watchlist::seeded()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load watchlist, using defaults");
                Watchlist::seeded()
            }
        };

        Self::with_watchlist(watchlist, backend)
    }

    pub fn with_watchlist(watchlist: Watchlist, backend: Arc<dyn ConfigStore>) -> Self {
        Self {
            inner: RwLock::new(Versioned {
                version: 0,
                watchlist,
            }),
            backend,
        }
    }

    pub async fn snapshot(&self) -> Watchlist {
        self.inner.read().await.watchlist.clone()
    }

    pub async fn version(&self) -> u64 {
        self.inner.read().await.version
    }

    pub async fn contains(&self, asset: &Asset) -> bool {
        self.inner.read().await.watchlist.contains(asset)
    }

    pub async fn add_asset(&self, symbol: &str) -> Result<Asset, ConfigError> {
        let asset = Asset::new(symbol)?;
        self.mutate(|watchlist| {
            let symbol = asset.exchange_symbol();
            if watchlist.assets.iter().any(|a| a.exchange_symbol() == symbol) {
                return Err(ConfigError::DuplicateAsset(asset.to_string()));
            }
            watchlist.assets.push(asset.clone());
            Ok(asset.clone())
        })
        .await
    }

    pub async fn remove_asset(&self, symbol: &str) -> Result<Asset, ConfigError> {
        self.mutate(|watchlist| {
            let asset = resolve(watchlist, symbol)?;
            watchlist.assets.retain(|a| a != &asset);
            watchlist.subscriptions.remove(&asset);
            Ok(asset)
        })
        .await
    }

    pub async fn add_indicator(&self, spec: IndicatorSpec) -> Result<usize, ConfigError> {
        validate_spec(&spec)?;
        self.mutate(|watchlist| {
            if watchlist.indicators.len() >= MAX_INDICATORS {
                return Err(ConfigError::TooManyIndicators);
            }
            watchlist.indicators.push(spec);
            Ok(watchlist.indicators.len() - 1)
        })
        .await
    }

    pub async fn update_indicator(
        &self,
        index: usize,
        spec: IndicatorSpec,
    ) -> Result<IndicatorSpec, ConfigError> {
        validate_spec(&spec)?;
        self.mutate(|watchlist| {
            let slot = watchlist
                .indicators
                .get_mut(index)
                .ok_or(ConfigError::IndicatorIndex(index))?;
            Ok(std::mem::replace(slot, spec))
        })
        .await
    }

    pub async fn remove_indicator(&self, index: usize) -> Result<IndicatorSpec, ConfigError> {
        self.mutate(|watchlist| {
            if index >= watchlist.indicators.len() {
                return Err(ConfigError::IndicatorIndex(index));
            }
            Ok(watchlist.indicators.remove(index))
        })
        .await
    }

    /// Reorders the list. Order only affects display.
    pub async fn move_indicator(&self, from: usize, to: usize) -> Result<(), ConfigError> {
        self.mutate(|watchlist| {
            let len = watchlist.indicators.len();
            if from >= len {
                return Err(ConfigError::IndicatorIndex(from));
            }
            if to >= len {
                return Err(ConfigError::IndicatorIndex(to));
            }
            let spec = watchlist.indicators.remove(from);
            watchlist.indicators.insert(to, spec);
            Ok(())
        })
        .await
    }

    pub async fn set_subscription(
        &self,
        symbol: &str,
        subscription: AlertSubscription,
    ) -> Result<AlertSubscription, ConfigError> {
        self.mutate(|watchlist| {
            let asset = resolve(watchlist, symbol)?;
            watchlist.subscriptions.insert(asset, subscription);
            Ok(subscription)
        })
        .await
    }

    /// Advances Off -> NotifyOnBullish -> NotifyOnBearish -> Off.
    pub async fn cycle_subscription(&self, symbol: &str) -> Result<AlertSubscription, ConfigError> {
        self.mutate(|watchlist| {
            let asset = resolve(watchlist, symbol)?;
            let next = watchlist.subscription(&asset).next();
            watchlist.subscriptions.insert(asset, next);
            Ok(next)
        })
        .await
    }

    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Watchlist) -> Result<T, ConfigError>,
    ) -> Result<T, ConfigError> {
        let mut inner = self.inner.write().await;
        let result = apply(&mut inner.watchlist)?;
        inner.version += 1;

        // Persistence failures are not fatal; the in-memory state stays authoritative.
        if let Err(e) = self.backend.save(&inner.watchlist).await {
            warn!(
                version = inner.version,
                error = %e,
                "Failed to persist watchlist version {}: {}",
                inner.version,
                e
            );
        }
        Ok(result)
    }
}

fn resolve(watchlist: &Watchlist, symbol: &str) -> Result<Asset, ConfigError> {
    watchlist
        .resolve(symbol)
        .ok_or_else(|| ConfigError::UnknownAsset(symbol.to_string()))
}
