//! Pending writes and removals accumulated by the deferred adapter

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// What the pending state says about a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingEntry<'a> {
    /// A write is pending with this value
    Written(&'a str),
    /// A removal is pending
    Removed,
    /// Nothing is pending; the backing store is authoritative
    Untouched,
}

/// Pending writes and removals, each in first-touched order.
///
/// A key is never in both: writing clears a pending removal and removing
/// clears a pending write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingState {
    writes: IndexMap<String, String>,
    removals: IndexSet<String>,
}

impl PendingState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// State holding a single pending write
    pub fn with_write(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.set(key, value);
        state
    }

    /// Record a write of `key`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.removals.shift_remove(&key);
        self.writes.insert(key, value.into());
    }

    /// Record a removal of `key`
    pub fn remove(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.writes.shift_remove(&key);
        self.removals.insert(key);
    }

    /// Look up `key`
    pub fn entry(&self, key: &str) -> PendingEntry<'_> {
        if let Some(value) = self.writes.get(key) {
            PendingEntry::Written(value)
        } else if self.removals.contains(key) {
            PendingEntry::Removed
        } else {
            PendingEntry::Untouched
        }
    }

    /// Pending writes in order
    pub fn writes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.writes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pending removals in order
    pub fn removals(&self) -> impl Iterator<Item = &str> {
        self.removals.iter().map(String::as_str)
    }

    /// Keys to read from the backing store before flushing: writes, then removals
    pub fn hint_keys(&self) -> Vec<String> {
        self.writes
            .keys()
            .chain(self.removals.iter())
            .cloned()
            .collect()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.removals.is_empty()
    }

    /// Drop everything pending
    pub fn clear(&mut self) {
        self.writes.clear();
        self.removals.clear();
    }
}
