//! Chunk metadata record and paginated chunk listings.
//!
//! # Invariants
//! - `file_key` references an existing `File`; the schema rejects orphans.
//! - At most one chunk per `(file_key, chunk_number)` is assumed when
//!   reading chunks back in order.

use super::file::FileId;
use super::validation::ValidationErrors;
use serde::{Deserialize, Serialize};

/// Store-assigned surrogate key of a `Chunk`.
pub type ChunkId = i64;

/// One ordered piece of a file held by the external chunk transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    /// Identifier returned by the external transport (remote blob/message id).
    pub file_id: String,
    /// Ordinal position within the owning file.
    pub chunk_number: u32,
    /// Owning `File::id`.
    pub file_key: FileId,
}

/// Creation input for a `Chunk`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChunk {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub chunk_number: Option<u32>,
    #[serde(default)]
    pub file_key: Option<FileId>,
}

impl NewChunk {
    pub fn new(file_id: impl Into<String>, chunk_number: u32, file_key: FileId) -> Self {
        Self {
            file_id: Some(file_id.into()),
            chunk_number: Some(chunk_number),
            file_key: Some(file_key),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_text("file_id", self.file_id.as_deref());
        errors.require("chunk_number", self.chunk_number.as_ref());
        errors.require("file_key", self.file_key.as_ref());
        errors.into_result()
    }
}

/// One page of a file's chunks plus the total chunk count for that file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunks {
    /// Total chunks registered for the file, independent of the page bounds.
    pub count: u64,
    /// Page rows ordered by `chunk_number` ascending.
    pub chunks: Vec<Chunk>,
}

#[cfg(test)]
mod tests {
    use super::NewChunk;

    #[test]
    fn chunk_number_zero_is_valid() {
        assert!(NewChunk::new("remote-1", 0, 1).validate().is_ok());
    }

    #[test]
    fn missing_file_key_is_reported() {
        let input = NewChunk {
            file_key: None,
            ..NewChunk::new("remote-1", 1, 1)
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.to_string(), "validation error: field file_key is required");
    }
}
