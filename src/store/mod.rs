//! Persistence boundary for the user's watchlist.
//!
//! The core only needs `load` and `save`; the on-disk format is whatever the
//! backend chooses.

pub mod watchlist;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::watchlist::Watchlist;

pub use watchlist::WatchlistStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<Watchlist>, StoreError>;

    async fn save(&self, watchlist: &Watchlist) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Watchlist>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, watchlist: &Watchlist) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(watchlist)?;
        // Write-then-rename so a crash never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Keeps the last saved watchlist in memory.
#[derive(Default)]
pub struct MemoryStore {
    saved: RwLock<Option<Watchlist>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watchlist(watchlist: Watchlist) -> Self {
        Self {
            saved: RwLock::new(Some(watchlist)),
        }
    }

    pub async fn saved(&self) -> Option<Watchlist> {
        self.saved.read().await.clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<Option<Watchlist>, StoreError> {
        Ok(self.saved.read().await.clone())
    }

    async fn save(&self, watchlist: &Watchlist) -> Result<(), StoreError> {
        *self.saved.write().await = Some(watchlist.clone());
        Ok(())
    }
}
