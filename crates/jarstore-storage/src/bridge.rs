//! Bridge from single-record backing stores to the bulk source/sink pair.
//!
//! A single-record store cannot enumerate its records, so reads probe a fixed
//! set of names per key hint: the key itself and `key.0` up to
//! `key.<probe_count - 1>`. Values split into more chunks than that, and keys
//! never passed as hints, are invisible through the bridge. Stale fragments
//! beyond the probe range are therefore never expired by reconciliation.

use crate::backing::{RecordLookup, RecordMutation, RecordSink, RecordSource};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use jarstore_chunk::{chunk_name, BackingRecord, RecordAttributes, WriteInstruction};
use std::sync::Arc;
use tracing::debug;

/// Adapts get/set/remove-by-name into bulk reads and writes
pub struct SingleRecordBridge {
    lookup: Arc<dyn RecordLookup>,
    mutation: Option<Arc<dyn RecordMutation>>,
    probe_count: usize,
}

impl SingleRecordBridge {
    /// Create a bridge probing `probe_count` chunk indices per key
    pub fn new(
        lookup: Arc<dyn RecordLookup>,
        mutation: Option<Arc<dyn RecordMutation>>,
        probe_count: usize,
    ) -> Self {
        Self {
            lookup,
            mutation,
            probe_count,
        }
    }

    /// Record names probed for `key`
    pub fn probe_names(&self, key: &str) -> Vec<String> {
        std::iter::once(key.to_string())
            .chain((0..self.probe_count).map(|i| chunk_name(key, i)))
            .collect()
    }

    fn mutation(&self) -> Result<&Arc<dyn RecordMutation>> {
        self.mutation.as_ref().ok_or_else(|| {
            StorageError::WriteUnavailable("single-record store has no set/remove".to_string())
        })
    }
}

#[async_trait]
impl RecordSource for SingleRecordBridge {
    async fn read_records(&self, hints: &[String]) -> Result<Vec<BackingRecord>> {
        let mut records = Vec::new();
        for hint in hints {
            for name in self.probe_names(hint) {
                if let Some(value) = self.lookup.get(&name).await? {
                    records.push(BackingRecord { name, value });
                }
            }
        }
        debug!(hints = hints.len(), found = records.len(), "probed single-record store");
        Ok(records)
    }
}

#[async_trait]
impl RecordSink for SingleRecordBridge {
    async fn write_records(&self, batch: &[WriteInstruction]) -> Result<()> {
        let mutation = self.mutation()?;
        for instruction in batch {
            if instruction.is_expiry() {
                mutation
                    .remove(&instruction.name, &instruction.attributes)
                    .await?;
            } else {
                mutation
                    .set(&instruction.name, &instruction.value, &instruction.attributes)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Remove every record of `key` from a single-record store.
///
/// Removes `key` if present, then `key.0`, `key.1`, … up to the first missing
/// or empty index. Returns the number of records removed.
pub async fn delete_chunks(
    key: &str,
    lookup: &dyn RecordLookup,
    mutation: &dyn RecordMutation,
    attributes: &RecordAttributes,
) -> Result<usize> {
    let expired = attributes.expired();
    let mut removed = 0;

    if lookup.get(key).await?.is_some_and(|v| !v.is_empty()) {
        mutation.remove(key, &expired).await?;
        removed += 1;
    }

    for i in 0.. {
        let name = chunk_name(key, i);
        match lookup.get(&name).await? {
            Some(value) if !value.is_empty() => {
                mutation.remove(&name, &expired).await?;
                removed += 1;
            }
            _ => break,
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{JarOp, MemoryJar};

    async fn seeded(pairs: &[(&str, &str)]) -> Arc<MemoryJar> {
        let jar = Arc::new(MemoryJar::new());
        jar.seed(pairs).await;
        jar
    }

    #[tokio::test]
    async fn probes_key_and_first_indices() {
        let jar = seeded(&[("k", "whole"), ("k.0", "a"), ("k.4", "e"), ("k.5", "f"), ("other", "x")]).await;
        let bridge = SingleRecordBridge::new(jar.clone(), Some(jar.clone() as Arc<dyn RecordMutation>), 5);
        let records = bridge.read_records(&["k".to_string()]).await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["k", "k.0", "k.4"]);
        assert_eq!(jar.ops().await.len(), 6);
    }

    #[tokio::test]
    async fn probe_count_is_configurable() {
        let jar = seeded(&[("k.0", "a"), ("k.1", "b"), ("k.2", "c")]).await;
        let bridge = SingleRecordBridge::new(jar.clone(), None, 2);
        assert_eq!(bridge.probe_names("k"), vec!["k", "k.0", "k.1"]);
        let records = bridge.read_records(&["k".to_string()]).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn empty_values_routed_to_remove() {
        let jar = seeded(&[("k.1", "stale")]).await;
        let bridge = SingleRecordBridge::new(jar.clone(), Some(jar.clone() as Arc<dyn RecordMutation>), 5);
        let attrs = RecordAttributes::default();
        bridge
            .write_records(&[
                WriteInstruction::expire("k.1", &attrs),
                WriteInstruction {
                    name: "k".to_string(),
                    value: "v".to_string(),
                    attributes: attrs.clone(),
                },
            ])
            .await
            .unwrap();
        let ops = jar.ops().await;
        assert!(matches!(&ops[0], JarOp::Remove { name } if name == "k.1"));
        assert!(matches!(&ops[1], JarOp::Set { name, value } if name == "k" && value == "v"));
        assert_eq!(jar.snapshot().await, vec![BackingRecord::new("k", "v")]);
    }

    #[tokio::test]
    async fn write_without_mutation_fails() {
        let jar = Arc::new(MemoryJar::new());
        let bridge = SingleRecordBridge::new(jar, None, 5);
        let batch = [WriteInstruction::expire("k", &RecordAttributes::default())];
        assert!(matches!(
            bridge.write_records(&batch).await,
            Err(StorageError::WriteUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn delete_chunks_stops_at_gap() {
        let jar = seeded(&[("k", "w"), ("k.0", "a"), ("k.1", "b"), ("k.3", "d"), ("kk", "x")]).await;
        let removed = delete_chunks("k", &*jar, &*jar, &RecordAttributes::default())
            .await
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(
            jar.snapshot().await,
            vec![BackingRecord::new("k.3", "d"), BackingRecord::new("kk", "x")]
        );
    }
}
