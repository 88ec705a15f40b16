//! Backing records, write attributes and write instructions

use serde::{Deserialize, Serialize};

/// Default record lifetime: 400 days, the longest lifetime browsers honour.
pub const DEFAULT_MAX_AGE: u64 = 400 * 24 * 60 * 60;

/// A name/value entry as it exists in the backing substrate.
///
/// The substrate is shared: records whose names do not belong to a logical
/// key handled by this engine are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackingRecord {
    /// Record name
    pub name: String,
    /// Record value
    pub value: String,
}

impl BackingRecord {
    /// Create a record from a name and a value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Same-site policy attached to every written record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Sent on same-site requests and top-level navigations
    #[default]
    Lax,
    /// Sent on same-site requests only
    Strict,
    /// Sent on all requests (requires `secure`)
    None,
}

/// Metadata the substrate requires on every write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordAttributes {
    /// Path scope
    pub path: String,
    /// Optional domain scope
    pub domain: Option<String>,
    /// Same-site policy
    pub same_site: SameSite,
    /// Hide the record from client-side scripts
    pub http_only: bool,
    /// Only send over secure transports
    pub secure: bool,
    /// Seconds until expiry; 0 expires the record immediately
    pub max_age: u64,
}

impl Default for RecordAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            same_site: SameSite::Lax,
            http_only: false,
            secure: false,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl RecordAttributes {
    /// Same attributes with a zero lifetime, used to expire records
    pub fn expired(&self) -> Self {
        Self {
            max_age: 0,
            ..self.clone()
        }
    }

    /// True if writing with these attributes removes the record
    pub fn is_expiry(&self) -> bool {
        self.max_age == 0
    }
}

/// One write handed to the backing sink.
///
/// An empty `value` together with a zero `max_age` expires the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteInstruction {
    /// Record name
    pub name: String,
    /// New record value (empty when expiring)
    pub value: String,
    /// Attributes to write the record with
    pub attributes: RecordAttributes,
}

impl WriteInstruction {
    /// Instruction that expires `name`
    pub fn expire(name: impl Into<String>, attributes: &RecordAttributes) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            attributes: attributes.expired(),
        }
    }

    /// True if this instruction removes the record rather than storing a value
    pub fn is_expiry(&self) -> bool {
        self.value.is_empty()
    }
}
