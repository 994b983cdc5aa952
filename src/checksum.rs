//! Content hashes used as report cache keys

use sha2::{Sha256, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::SchemaNode;

/// SHA256 digest of schema content
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn from_text(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Compute checksum of a normalized schema tree.
    ///
    /// Properties, required names and enum members are all ordered
    /// collections, so the serialized form is canonical.
    pub fn from_node(node: &SchemaNode) -> serde_json::Result<Self> {
        let canonical = serde_json::to_string(node)?;
        Ok(Self::from_text(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
