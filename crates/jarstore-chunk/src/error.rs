//! Error types for the jarstore-chunk subsystem

/// All errors that can occur while splitting, joining or decoding values
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// No escape-safe split point fits within the configured chunk size
    #[error("Chunk size {max_size} too small to split value for key {key:?}")]
    ChunkSizeTooSmall {
        /// Logical key being split
        key: String,
        /// Configured maximum chunk size
        max_size: usize,
    },
    /// A tagged value could not be reversed to its original text
    #[error("Invalid encoded value: {0}")]
    InvalidEncoding(String),
}
