//! Reconciliation of desired logical state against existing backing records
//!
//! A batch is two phases, applied in order by the sink:
//!
//! 1. **Expire**: every record of a removed key, then every stale record of a
//!    written key whose name is not part of that key's new chunk set.
//! 2. **Write**: the new chunks of every written key, in index order.
//!
//! Records about to be rewritten are never expired first, and no record name
//! appears twice in one batch.

use crate::chunker::{split, Chunk, MAX_CHUNK_SIZE};
use crate::error::ChunkError;
use crate::matcher::is_chunk_like;
use crate::record::{BackingRecord, RecordAttributes, WriteInstruction};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Ordered expire-then-write batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationBatch {
    /// Phase 1: records to expire
    pub expire: Vec<WriteInstruction>,
    /// Phase 2: records to write
    pub write: Vec<WriteInstruction>,
}

impl ReconciliationBatch {
    /// True when there is nothing to flush
    pub fn is_empty(&self) -> bool {
        self.expire.is_empty() && self.write.is_empty()
    }

    /// Total number of instructions
    pub fn len(&self) -> usize {
        self.expire.len() + self.write.len()
    }

    /// Instructions in flush order
    pub fn iter(&self) -> impl Iterator<Item = &WriteInstruction> {
        self.expire.iter().chain(self.write.iter())
    }

    /// Consume the batch into flush order
    pub fn into_instructions(self) -> Vec<WriteInstruction> {
        let mut all = self.expire;
        all.extend(self.write);
        all
    }
}

/// Computes reconciliation batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciler {
    max_chunk_size: usize,
    write_attributes: RecordAttributes,
    expire_attributes: RecordAttributes,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(MAX_CHUNK_SIZE, RecordAttributes::default())
    }
}

impl Reconciler {
    /// Create a reconciler writing chunks of at most `max_chunk_size` with `attributes`
    pub fn new(max_chunk_size: usize, attributes: RecordAttributes) -> Self {
        Self {
            max_chunk_size,
            expire_attributes: attributes.expired(),
            write_attributes: attributes,
        }
    }

    /// Build the batch that moves `existing` to the desired state.
    ///
    /// `writes` maps logical keys to their (already encoded) new values and
    /// `removals` lists logical keys to drop; both are processed in the order
    /// given. A key present in both is written.
    pub fn reconcile<'a, W, R>(
        &self,
        existing: &[BackingRecord],
        writes: W,
        removals: R,
    ) -> Result<ReconciliationBatch, ChunkError>
    where
        W: IntoIterator<Item = (&'a str, &'a str)>,
        R: IntoIterator<Item = &'a str>,
    {
        let mut expire_names: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for key in removals {
            for record in existing.iter().filter(|r| is_chunk_like(&r.name, key)) {
                if seen.insert(record.name.as_str()) {
                    expire_names.push(record.name.as_str());
                }
            }
        }

        let mut new_chunks: Vec<Chunk> = Vec::new();
        for (key, value) in writes {
            let chunks = split(key, value, self.max_chunk_size)?;
            for record in existing.iter().filter(|r| is_chunk_like(&r.name, key)) {
                let rewritten = chunks.iter().any(|c| c.name == record.name);
                if !rewritten && seen.insert(record.name.as_str()) {
                    expire_names.push(record.name.as_str());
                }
            }
            new_chunks.extend(chunks);
        }

        // Later chunks with an already-used name replace the earlier value in place.
        let mut write: Vec<WriteInstruction> = Vec::with_capacity(new_chunks.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for chunk in new_chunks {
            match positions.get(&chunk.name) {
                Some(&pos) => {
                    debug!(name = %chunk.name, "duplicate chunk name in batch; keeping last value");
                    write[pos].value = chunk.value;
                }
                None => {
                    positions.insert(chunk.name.clone(), write.len());
                    write.push(WriteInstruction {
                        name: chunk.name,
                        value: chunk.value,
                        attributes: self.write_attributes.clone(),
                    });
                }
            }
        }

        let expire: Vec<WriteInstruction> = expire_names
            .into_iter()
            .filter(|name| !positions.contains_key(*name))
            .map(|name| WriteInstruction {
                name: name.to_string(),
                value: String::new(),
                attributes: self.expire_attributes.clone(),
            })
            .collect();

        debug!(expire = expire.len(), write = write.len(), "reconciled batch");

        Ok(ReconciliationBatch { expire, write })
    }
}
