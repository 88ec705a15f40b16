//! Error types for the jarstore-storage subsystem

use jarstore_chunk::ChunkError;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// All errors that can occur while building or driving a storage adapter
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Splitting, joining or decoding a value failed
    #[error("Chunk error: {0}")]
    Chunk(#[from] ChunkError),
    /// The backing capabilities cannot support the requested adapter mode
    #[error("Insufficient backing capability: {0}")]
    InsufficientCapability(String),
    /// A write was needed but no write capability or fallback substrate exists
    #[error("Write unavailable: {0}")]
    WriteUnavailable(String),
    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// A collaborator-provided backing store failed
    #[error("Backend error: {0}")]
    Backend(String),
    /// Configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
