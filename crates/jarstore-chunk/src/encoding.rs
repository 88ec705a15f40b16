//! Whole-value encoding applied before chunking and stripped after joining

use crate::error::ChunkError;
use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Tag marking a base64url-encoded value
pub const BASE64_PREFIX: &str = "base64-";

const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How values are stored in the substrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    /// Store values as-is
    Raw,
    /// Store `base64-` followed by the unpadded base64url form of the value
    #[default]
    Base64Url,
}

impl ValueEncoding {
    /// Encode `value` for storage
    pub fn encode(self, value: &str) -> String {
        match self {
            ValueEncoding::Raw => value.to_string(),
            ValueEncoding::Base64Url => {
                format!("{BASE64_PREFIX}{}", BASE64URL.encode(value.as_bytes()))
            }
        }
    }
}

/// Reverse the encoding of a stored value.
///
/// Tagged values are decoded whatever encoding the reader is configured with;
/// untagged values are returned unchanged so values written raw stay readable.
pub fn decode(stored: String) -> Result<String, ChunkError> {
    let Some(encoded) = stored.strip_prefix(BASE64_PREFIX) else {
        return Ok(stored);
    };
    let bytes = BASE64URL
        .decode(encoded)
        .map_err(|e| ChunkError::InvalidEncoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ChunkError::InvalidEncoding(e.to_string()))
}
