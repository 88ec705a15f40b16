#![warn(missing_docs)]

//! jarstore storage adapters: immediate and deferred session storage over chunked records
//!
//! Write path: set_item → (pending state) → read records → reconcile → one batch write
//! Read path:  get_item → (pending state) → read records → join → decode

pub mod backing;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod deferred;
pub mod error;
pub mod immediate;
pub mod memory;
pub mod pending;
pub mod storage;

pub use backing::{BackingCapability, RecordLookup, RecordMutation, RecordSink, RecordSource, ResolvedBacking};
pub use bridge::{delete_chunks, SingleRecordBridge};
pub use cache::StoreCache;
pub use config::{StorageConfig, StorageMode, CODE_VERIFIER_SUFFIX, DEFAULT_PROBE_COUNT};
pub use deferred::{apply_pending, DeferredStorage, LifecycleEvent};
pub use error::{Result, StorageError};
pub use immediate::ImmediateStorage;
pub use memory::{JarOp, MemoryJar};
pub use pending::{PendingEntry, PendingState};
pub use storage::{SessionStorage, SessionStore};

pub use jarstore_chunk::{BackingRecord, RecordAttributes, SameSite, ValueEncoding, WriteInstruction};
