#![warn(missing_docs)]

//! jarstore chunk engine: chunk codec, chunk-name matching, batch reconciliation, value encoding
//!
//! Write path: Value → Encode (base64url) → Split (percent-escaped size) → Reconcile → Batch
//! Read path:  Records → Join → Decode → Value

pub mod chunker;
pub mod encoding;
pub mod error;
pub mod matcher;
pub mod reconcile;
pub mod record;

pub use chunker::{escaped_len, join, split, Chunk, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use encoding::{ValueEncoding, BASE64_PREFIX};
pub use error::ChunkError;
pub use matcher::{chunk_name, chunk_slot, is_chunk_like, ChunkSlot};
pub use reconcile::{ReconciliationBatch, Reconciler};
pub use record::{BackingRecord, RecordAttributes, SameSite, WriteInstruction, DEFAULT_MAX_AGE};
