//! Caller-facing session storage interface and adapter construction

use crate::backing::{BackingCapability, RecordSource};
use crate::config::{StorageConfig, StorageMode};
use crate::deferred::DeferredStorage;
use crate::error::Result;
use crate::immediate::ImmediateStorage;
use async_trait::async_trait;
use jarstore_chunk::encoding::decode;
use jarstore_chunk::join;

/// Get/set/remove of logical items
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Value of `key`, or `None` if absent
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// True if values come from request state and should not be trusted as-is
    fn is_server(&self) -> bool;
}

/// Read, join and decode `key` from the backing store
pub(crate) async fn read_item(source: &dyn RecordSource, key: &str) -> Result<Option<String>> {
    let records = source.read_records(&[key.to_string()]).await?;
    let joined = join(key, |name| {
        records
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value.as_str())
    });
    match joined {
        Some(stored) => Ok(Some(decode(stored)?)),
        None => Ok(None),
    }
}

/// Adapter of either mode
pub enum SessionStore {
    /// Flushes every mutation
    Immediate(ImmediateStorage),
    /// Flushes on external triggers
    Deferred(DeferredStorage),
}

impl SessionStore {
    /// Build the adapter selected by `config.mode` over `capability`
    pub fn build(config: StorageConfig, capability: BackingCapability) -> Result<Self> {
        match config.mode {
            StorageMode::Immediate => Ok(SessionStore::Immediate(ImmediateStorage::new(
                config, capability,
            )?)),
            StorageMode::Deferred => Ok(SessionStore::Deferred(DeferredStorage::new(
                config, capability,
            )?)),
        }
    }

    /// Mode of this adapter
    pub fn mode(&self) -> StorageMode {
        match self {
            SessionStore::Immediate(_) => StorageMode::Immediate,
            SessionStore::Deferred(_) => StorageMode::Deferred,
        }
    }

    /// The deferred adapter, if this is one
    pub fn as_deferred(&self) -> Option<&DeferredStorage> {
        match self {
            SessionStore::Deferred(storage) => Some(storage),
            SessionStore::Immediate(_) => None,
        }
    }
}

#[async_trait]
impl SessionStorage for SessionStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self {
            SessionStore::Immediate(s) => s.get_item(key).await,
            SessionStore::Deferred(s) => s.get_item(key).await,
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        match self {
            SessionStore::Immediate(s) => s.set_item(key, value).await,
            SessionStore::Deferred(s) => s.set_item(key, value).await,
        }
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        match self {
            SessionStore::Immediate(s) => s.remove_item(key).await,
            SessionStore::Deferred(s) => s.remove_item(key).await,
        }
    }

    fn is_server(&self) -> bool {
        match self {
            SessionStore::Immediate(s) => s.is_server(),
            SessionStore::Deferred(s) => s.is_server(),
        }
    }
}
