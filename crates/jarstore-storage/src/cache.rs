//! Caller-owned adapter cache.
//!
//! Holds at most one adapter and hands the same instance back while the
//! configuration it was built with is unchanged. A different configuration
//! replaces it; [`StoreCache::teardown`] drops it.

use crate::backing::BackingCapability;
use crate::config::StorageConfig;
use crate::error::Result;
use crate::storage::SessionStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct CachedStore {
    config: StorageConfig,
    store: Arc<SessionStore>,
}

/// Single-slot adapter cache keyed by configuration
#[derive(Default)]
pub struct StoreCache {
    slot: Mutex<Option<CachedStore>>,
}

impl StoreCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached adapter for `config`, building one over `capability()` if the
    /// slot is empty or holds an adapter built from a different configuration.
    pub async fn get_or_build<F>(&self, config: StorageConfig, capability: F) -> Result<Arc<SessionStore>>
    where
        F: FnOnce() -> BackingCapability,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.config == config {
                return Ok(cached.store.clone());
            }
            debug!(mode = ?config.mode, "configuration changed; rebuilding cached adapter");
        }
        let store = Arc::new(SessionStore::build(config.clone(), capability())?);
        *slot = Some(CachedStore {
            config,
            store: store.clone(),
        });
        Ok(store)
    }

    /// The cached adapter, if any
    pub async fn current(&self) -> Option<Arc<SessionStore>> {
        self.slot.lock().await.as_ref().map(|c| c.store.clone())
    }

    /// Drop the cached adapter, returning it
    pub async fn teardown(&self) -> Option<Arc<SessionStore>> {
        self.slot.lock().await.take().map(|c| c.store)
    }
}
