//! In-process record jar implementing every backing capability.
//!
//! Records keep insertion order, an update keeps a record's position, and a
//! write with an empty value or zero max-age removes the record. Every call
//! is appended to an operation log.

use crate::backing::{RecordLookup, RecordMutation, RecordSink, RecordSource};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use indexmap::IndexMap;
use jarstore_chunk::{BackingRecord, RecordAttributes, WriteInstruction};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// One call made against a [`MemoryJar`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JarOp {
    /// Bulk read
    ReadAll {
        /// Hints passed by the caller
        hints: Vec<String>,
    },
    /// Bulk write
    WriteAll {
        /// Instructions in the order received
        batch: Vec<WriteInstruction>,
    },
    /// Single-record read
    Get {
        /// Record name
        name: String,
    },
    /// Single-record write
    Set {
        /// Record name
        name: String,
        /// Record value
        value: String,
    },
    /// Single-record removal
    Remove {
        /// Record name
        name: String,
    },
}

/// In-memory record jar
#[derive(Debug, Default)]
pub struct MemoryJar {
    records: RwLock<IndexMap<String, String>>,
    ops: Mutex<Vec<JarOp>>,
    fail_writes: AtomicBool,
}

impl MemoryJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records without logging an operation
    pub async fn seed(&self, pairs: &[(&str, &str)]) {
        let mut records = self.records.write().await;
        for (name, value) in pairs {
            records.insert(name.to_string(), value.to_string());
        }
    }

    /// Current records in jar order
    pub async fn snapshot(&self) -> Vec<BackingRecord> {
        self.records
            .read()
            .await
            .iter()
            .map(|(name, value)| BackingRecord::new(name.as_str(), value.as_str()))
            .collect()
    }

    /// Value of `name`, without logging an operation
    pub async fn value(&self, name: &str) -> Option<String> {
        self.records.read().await.get(name).cloned()
    }

    /// Operations performed so far
    pub async fn ops(&self) -> Vec<JarOp> {
        self.ops.lock().await.clone()
    }

    /// Forget logged operations
    pub async fn clear_ops(&self) {
        self.ops.lock().await.clear();
    }

    /// Number of bulk reads performed
    pub async fn read_count(&self) -> usize {
        self.count(|op| matches!(op, JarOp::ReadAll { .. })).await
    }

    /// Number of bulk writes performed
    pub async fn write_count(&self) -> usize {
        self.count(|op| matches!(op, JarOp::WriteAll { .. })).await
    }

    /// Make every subsequent write fail with a backend error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    async fn count(&self, pred: impl Fn(&JarOp) -> bool) -> usize {
        self.ops.lock().await.iter().filter(|op| pred(op)).count()
    }

    async fn log(&self, op: JarOp) {
        self.ops.lock().await.push(op);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("memory jar rejected write".to_string()));
        }
        Ok(())
    }

    async fn apply(&self, name: &str, value: &str, attributes: &RecordAttributes) {
        let mut records = self.records.write().await;
        if value.is_empty() || attributes.is_expiry() {
            records.shift_remove(name);
        } else {
            records.insert(name.to_string(), value.to_string());
        }
    }
}

#[async_trait]
impl RecordSource for MemoryJar {
    async fn read_records(&self, hints: &[String]) -> Result<Vec<BackingRecord>> {
        self.log(JarOp::ReadAll {
            hints: hints.to_vec(),
        })
        .await;
        Ok(self.snapshot().await)
    }
}

#[async_trait]
impl RecordSink for MemoryJar {
    async fn write_records(&self, batch: &[WriteInstruction]) -> Result<()> {
        self.log(JarOp::WriteAll {
            batch: batch.to_vec(),
        })
        .await;
        self.check_writable()?;
        for instruction in batch {
            self.apply(&instruction.name, &instruction.value, &instruction.attributes)
                .await;
        }
        debug!(records = batch.len(), "memory jar applied batch");
        Ok(())
    }
}

#[async_trait]
impl RecordLookup for MemoryJar {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        self.log(JarOp::Get {
            name: name.to_string(),
        })
        .await;
        Ok(self.value(name).await)
    }
}

#[async_trait]
impl RecordMutation for MemoryJar {
    async fn set(&self, name: &str, value: &str, attributes: &RecordAttributes) -> Result<()> {
        self.log(JarOp::Set {
            name: name.to_string(),
            value: value.to_string(),
        })
        .await;
        self.check_writable()?;
        self.apply(name, value, attributes).await;
        Ok(())
    }

    async fn remove(&self, name: &str, _attributes: &RecordAttributes) -> Result<()> {
        self.log(JarOp::Remove {
            name: name.to_string(),
        })
        .await;
        self.check_writable()?;
        self.records.write().await.shift_remove(name);
        Ok(())
    }
}
