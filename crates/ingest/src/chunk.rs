use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Display name of the originating document
    pub source: String,
    /// Position in extraction order, 0-based
    pub chunk_id: usize,
}

impl Chunk {
    pub fn new(content: String, source: String, chunk_id: usize) -> Self {
        Self {
            content,
            source,
            chunk_id,
        }
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Hex SHA-256 of a document's raw bytes, recorded in the index manifest
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
