//! Size-bounded chunking of values over a flat name/value substrate
//!
//! Sizes are measured on the percent-escaped form of a value, which is how a
//! record travels through the substrate. Splits never land inside an escape
//! triplet or between the bytes of one multi-byte character, so every chunk
//! is valid text on its own.

use crate::error::ChunkError;
use crate::matcher::chunk_name;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default maximum escaped size of one chunk
pub const MAX_CHUNK_SIZE: usize = 3180;

/// Smallest chunk size that can always hold one escaped character (4 bytes × `%XY`)
pub const MIN_CHUNK_SIZE: usize = 12;

/// Characters left unescaped, matching URI component escaping
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// One backing record derived from a logical value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `key` when unchunked, `key.<i>` otherwise
    pub name: String,
    /// Unescaped chunk content
    pub value: String,
}

/// Percent-escaped form of `value`
pub fn escape(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Length of `value` once escaped
pub fn escaped_len(value: &str) -> usize {
    utf8_percent_encode(value, URI_COMPONENT)
        .map(str::len)
        .sum()
}

/// Split `value` into chunks whose escaped size is at most `max_size`.
///
/// A value that fits is returned as a single chunk named `key`, holding the
/// original unescaped text. Otherwise chunks are named `key.0`, `key.1`, …
/// and concatenate back to `value`.
pub fn split(key: &str, value: &str, max_size: usize) -> Result<Vec<Chunk>, ChunkError> {
    let escaped = escape(value);

    if escaped.len() <= max_size {
        return Ok(vec![Chunk {
            name: key.to_string(),
            value: value.to_string(),
        }]);
    }

    let mut values = Vec::new();
    let mut remaining = escaped.as_str();

    while !remaining.is_empty() {
        let mut head = &remaining[..remaining.len().min(max_size)];

        // Drop a trailing escape triplet cut short by the size limit.
        if let Some(pos) = head.rfind('%') {
            if pos + 3 > max_size {
                head = &head[..pos];
            }
        }

        let decoded = loop {
            if head.is_empty() {
                return Err(too_small(key, max_size));
            }
            match percent_decode_str(head).decode_utf8() {
                Ok(text) => break text.into_owned(),
                // The head ends inside a multi-byte character: back off one triplet.
                Err(_) if head.len() > 3 && head.as_bytes()[head.len() - 3] == b'%' => {
                    head = &head[..head.len() - 3];
                }
                Err(_) => return Err(too_small(key, max_size)),
            }
        };

        values.push(decoded);
        remaining = &remaining[head.len()..];
    }

    debug!(key, chunks = values.len(), escaped_len = escaped.len(), "value chunked");

    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, value)| Chunk {
            name: chunk_name(key, i),
            value,
        })
        .collect())
}

fn too_small(key: &str, max_size: usize) -> ChunkError {
    ChunkError::ChunkSizeTooSmall {
        key: key.to_string(),
        max_size,
    }
}

/// Reassemble the value stored under `key`.
///
/// `fetch` returns the value of a record by name. An unchunked record named
/// `key` wins outright; otherwise `key.0`, `key.1`, … are read until the first
/// missing or empty one. Returns `None` when nothing was found.
pub fn join<'a, F>(key: &str, mut fetch: F) -> Option<String>
where
    F: FnMut(&str) -> Option<&'a str>,
{
    if let Some(value) = fetch(key).filter(|v| !v.is_empty()) {
        return Some(value.to_string());
    }

    let mut values: Vec<&str> = Vec::new();
    loop {
        match fetch(&chunk_name(key, values.len())) {
            Some(chunk) if !chunk.is_empty() => values.push(chunk),
            _ => break,
        }
    }

    if values.is_empty() {
        return None;
    }

    if uneven_chunks(&values) {
        warn!(
            key,
            chunks = values.len(),
            "oddly sized chunks while reconstructing value; the stored session may be corrupted"
        );
    }

    Some(values.concat())
}

/// True if the chunks before the last were not cut at one common size.
///
/// A split lands at most `MIN_CHUNK_SIZE - 1` escaped bytes short of the
/// limit, so body chunks of one write differ by less than `MIN_CHUNK_SIZE`
/// in escaped length. A larger spread means chunks from different writes
/// were mixed.
fn uneven_chunks(values: &[&str]) -> bool {
    if values.len() <= 2 {
        return false;
    }
    let body = &values[..values.len() - 1];
    let lens = body.iter().map(|v| escaped_len(v));
    let (min, max) = lens.fold((usize::MAX, 0), |(lo, hi), len| (lo.min(len), hi.max(len)));
    max - min >= MIN_CHUNK_SIZE
}
