//! Chunk-name matching: which backing record names belong to a logical key

/// Position of a backing record within a logical key's chunk sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChunkSlot {
    /// The record is named exactly after the key (unchunked value)
    Whole,
    /// The record is `key.<index>`
    Index(usize),
}

/// Name of chunk `index` of `key`
pub fn chunk_name(key: &str, index: usize) -> String {
    format!("{key}.{index}")
}

/// Classify `name` relative to `key`.
///
/// Matches `key` itself or `key.<n>` where `<n>` is `0` or a decimal number
/// without leading zeros. Anything else, including `key.01` or `key.-1`,
/// does not belong to `key`.
pub fn chunk_slot(name: &str, key: &str) -> Option<ChunkSlot> {
    let rest = name.strip_prefix(key)?;
    if rest.is_empty() {
        return Some(ChunkSlot::Whole);
    }
    let digits = rest.strip_prefix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    // Indices past usize::MAX still name a chunk of this key.
    Some(ChunkSlot::Index(digits.parse().unwrap_or(usize::MAX)))
}

/// True if `name` is `key` or one of its chunk names
pub fn is_chunk_like(name: &str, key: &str) -> bool {
    chunk_slot(name, key).is_some()
}
