//! Immediate-write adapter: every mutation is reconciled and flushed at once.
//!
//! Each call performs exactly one bulk read and, when the backing state has
//! to change, exactly one bulk write.

use crate::backing::{BackingCapability, ResolvedBacking};
use crate::config::{StorageConfig, StorageMode};
use crate::error::Result;
use crate::storage::{read_item, SessionStorage};
use async_trait::async_trait;
use jarstore_chunk::{ReconciliationBatch, Reconciler, ValueEncoding};
use tracing::debug;

/// Adapter flushing every mutation as it happens
pub struct ImmediateStorage {
    backing: ResolvedBacking,
    reconciler: Reconciler,
    encoding: ValueEncoding,
}

impl ImmediateStorage {
    /// Build over `capability`; read-only capabilities are rejected
    pub fn new(config: StorageConfig, capability: BackingCapability) -> Result<Self> {
        config.validate()?;
        let backing = capability.resolve(StorageMode::Immediate, config.probe_count)?;
        Ok(Self {
            backing,
            reconciler: config.reconciler(),
            encoding: config.encoding,
        })
    }

    async fn flush(&self, key: &str, batch: ReconciliationBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!(
            key,
            expire = batch.expire.len(),
            write = batch.write.len(),
            "flushing immediate batch"
        );
        self.backing
            .sink
            .write_records(&batch.into_instructions())
            .await
    }
}

#[async_trait]
impl SessionStorage for ImmediateStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        read_item(self.backing.source.as_ref(), key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let existing = self.backing.source.read_records(&[key.to_string()]).await?;
        let encoded = self.encoding.encode(value);
        let batch = self
            .reconciler
            .reconcile(&existing, [(key, encoded.as_str())], [])?;
        self.flush(key, batch).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let existing = self.backing.source.read_records(&[key.to_string()]).await?;
        let batch = self.reconciler.reconcile(&existing, [], [key])?;
        self.flush(key, batch).await
    }

    fn is_server(&self) -> bool {
        false
    }
}
