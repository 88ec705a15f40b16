//! Backing-store capabilities supplied by the collaborator.
//!
//! The engine reads and writes the substrate only through these traits. A
//! collaborator states what it can do with a [`BackingCapability`], which is
//! resolved once at construction into a bulk source and sink pair.

use crate::bridge::SingleRecordBridge;
use crate::config::StorageMode;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use jarstore_chunk::{BackingRecord, RecordAttributes, WriteInstruction};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Bulk read of backing records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Return the records currently known for the given logical key hints.
    ///
    /// Sources that cannot filter may ignore `hints` and return everything.
    async fn read_records(&self, hints: &[String]) -> Result<Vec<BackingRecord>>;
}

/// Bulk write of an ordered batch.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist or expire each instruction, in order.
    async fn write_records(&self, batch: &[WriteInstruction]) -> Result<()>;
}

/// Read of a single record by name.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Current value of `name`, if present.
    async fn get(&self, name: &str) -> Result<Option<String>>;
}

/// Write and removal of a single record by name.
#[async_trait]
pub trait RecordMutation: Send + Sync {
    /// Store `value` under `name`.
    async fn set(&self, name: &str, value: &str, attributes: &RecordAttributes) -> Result<()>;

    /// Remove `name`.
    async fn remove(&self, name: &str, attributes: &RecordAttributes) -> Result<()>;
}

/// What the collaborator's backing store can do
#[derive(Clone)]
pub enum BackingCapability {
    /// Read-all and write-all
    Bulk {
        /// Bulk reads
        source: Arc<dyn RecordSource>,
        /// Bulk writes
        sink: Arc<dyn RecordSink>,
    },
    /// Read-all only
    ReadOnlyBulk {
        /// Bulk reads
        source: Arc<dyn RecordSource>,
    },
    /// Get, set and remove one record at a time
    PerRecord {
        /// Single-record reads
        lookup: Arc<dyn RecordLookup>,
        /// Single-record writes
        mutation: Arc<dyn RecordMutation>,
    },
    /// Get one record at a time, no writes
    ReadOnlyPerRecord {
        /// Single-record reads
        lookup: Arc<dyn RecordLookup>,
    },
    /// No backing store
    None,
}

impl fmt::Debug for BackingCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackingCapability::Bulk { .. } => "Bulk",
            BackingCapability::ReadOnlyBulk { .. } => "ReadOnlyBulk",
            BackingCapability::PerRecord { .. } => "PerRecord",
            BackingCapability::ReadOnlyPerRecord { .. } => "ReadOnlyPerRecord",
            BackingCapability::None => "None",
        };
        f.write_str(name)
    }
}

impl BackingCapability {
    /// Bulk capability from one store implementing both directions
    pub fn bulk<T>(store: Arc<T>) -> Self
    where
        T: RecordSource + RecordSink + 'static,
    {
        BackingCapability::Bulk {
            source: store.clone(),
            sink: store,
        }
    }

    /// Per-record capability from one store implementing both directions
    pub fn per_record<T>(store: Arc<T>) -> Self
    where
        T: RecordLookup + RecordMutation + 'static,
    {
        BackingCapability::PerRecord {
            lookup: store.clone(),
            mutation: store,
        }
    }

    /// Resolve into the bulk pair an adapter of `mode` drives.
    ///
    /// Immediate adapters must be able to write: read-only capabilities are
    /// rejected, and with no backing store at all reads are empty and writes
    /// fail. Deferred adapters must be able to read: a missing store is
    /// rejected, and read-only capabilities drop writes with a warning.
    pub fn resolve(self, mode: StorageMode, probe_count: usize) -> Result<ResolvedBacking> {
        match (self, mode) {
            (BackingCapability::Bulk { source, sink }, _) => Ok(ResolvedBacking { source, sink }),
            (BackingCapability::PerRecord { lookup, mutation }, _) => {
                let bridge = Arc::new(SingleRecordBridge::new(lookup, Some(mutation), probe_count));
                Ok(ResolvedBacking {
                    source: bridge.clone(),
                    sink: bridge,
                })
            }
            (BackingCapability::ReadOnlyBulk { source }, StorageMode::Deferred) => {
                Ok(ResolvedBacking {
                    source,
                    sink: Arc::new(WarningSink),
                })
            }
            (BackingCapability::ReadOnlyPerRecord { lookup }, StorageMode::Deferred) => {
                Ok(ResolvedBacking {
                    source: Arc::new(SingleRecordBridge::new(lookup, None, probe_count)),
                    sink: Arc::new(WarningSink),
                })
            }
            (capability @ BackingCapability::ReadOnlyBulk { .. }, StorageMode::Immediate)
            | (capability @ BackingCapability::ReadOnlyPerRecord { .. }, StorageMode::Immediate) => {
                Err(StorageError::InsufficientCapability(format!(
                    "immediate storage requires a write capability, got {capability:?}"
                )))
            }
            (BackingCapability::None, StorageMode::Immediate) => Ok(ResolvedBacking {
                source: Arc::new(EmptySource),
                sink: Arc::new(UnavailableSink),
            }),
            (BackingCapability::None, StorageMode::Deferred) => {
                Err(StorageError::InsufficientCapability(
                    "deferred storage requires at least a read capability".to_string(),
                ))
            }
        }
    }
}

/// Bulk source and sink an adapter drives
#[derive(Clone)]
pub struct ResolvedBacking {
    /// Bulk reads
    pub source: Arc<dyn RecordSource>,
    /// Bulk writes
    pub sink: Arc<dyn RecordSink>,
}

/// Source for contexts without a backing store; there is nothing to read.
struct EmptySource;

#[async_trait]
impl RecordSource for EmptySource {
    async fn read_records(&self, _hints: &[String]) -> Result<Vec<BackingRecord>> {
        Ok(Vec::new())
    }
}

/// Sink for read-only deferred contexts: writes are dropped with a warning.
struct WarningSink;

#[async_trait]
impl RecordSink for WarningSink {
    async fn write_records(&self, batch: &[WriteInstruction]) -> Result<()> {
        warn!(
            records = batch.len(),
            "storage was configured without a write capability but needs to write records; \
             this can cause random sign-outs, early session termination or repeated token refreshes"
        );
        Ok(())
    }
}

/// Sink for contexts with no backing store: writing is an error.
struct UnavailableSink;

#[async_trait]
impl RecordSink for UnavailableSink {
    async fn write_records(&self, batch: &[WriteInstruction]) -> Result<()> {
        Err(StorageError::WriteUnavailable(format!(
            "{} record(s) must be written but no backing store was configured",
            batch.len()
        )))
    }
}
