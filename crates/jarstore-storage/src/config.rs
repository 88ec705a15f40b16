//! Storage adapter configuration

use crate::error::{Result, StorageError};
use jarstore_chunk::{RecordAttributes, Reconciler, ValueEncoding, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// Default number of chunk indices probed per key by the single-record bridge
pub const DEFAULT_PROBE_COUNT: usize = 5;

/// Key suffix of values that must be durable before the next external read
pub const CODE_VERIFIER_SUFFIX: &str = "-code-verifier";

/// Which adapter variant to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Every mutation is flushed as it happens
    #[default]
    Immediate,
    /// Mutations accumulate until an external trigger applies them
    Deferred,
}

/// Configuration shared by both adapter variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Adapter variant
    pub mode: StorageMode,
    /// Maximum escaped size of one backing record value
    pub max_chunk_size: usize,
    /// Whole-value encoding applied before chunking
    pub encoding: ValueEncoding,
    /// Attributes written with every record
    pub attributes: RecordAttributes,
    /// Keys ending with one of these are flushed on write even in deferred mode
    pub transient_key_suffixes: Vec<String>,
    /// Chunk indices probed per key when reading through the single-record bridge
    pub probe_count: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Immediate,
            max_chunk_size: MAX_CHUNK_SIZE,
            encoding: ValueEncoding::Base64Url,
            attributes: RecordAttributes::default(),
            transient_key_suffixes: vec![CODE_VERIFIER_SUFFIX.to_string()],
            probe_count: DEFAULT_PROBE_COUNT,
        }
    }
}

impl StorageConfig {
    /// Default configuration for the given mode
    pub fn for_mode(mode: StorageMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that cannot be recovered from at runtime
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size < MIN_CHUNK_SIZE {
            return Err(StorageError::InvalidConfig(format!(
                "max_chunk_size {} is below the minimum of {} needed for one escaped character",
                self.max_chunk_size, MIN_CHUNK_SIZE
            )));
        }
        if self.attributes.max_age == 0 {
            return Err(StorageError::InvalidConfig(
                "attributes.max_age must be positive; zero expires every written record".to_string(),
            ));
        }
        if self.probe_count == 0 {
            return Err(StorageError::InvalidConfig(
                "probe_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// True if writes to `key` must be flushed immediately
    pub fn is_transient_key(&self, key: &str) -> bool {
        self.transient_key_suffixes
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()))
    }

    /// Reconciler matching this configuration
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.max_chunk_size, self.attributes.clone())
    }
}
