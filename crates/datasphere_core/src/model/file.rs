//! File metadata record.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `filename` and `name` are non-empty.

use super::validation::ValidationErrors;
use serde::{Deserialize, Serialize};

/// Store-assigned surrogate key of a `File`.
pub type FileId = i64;

/// One logical file whose bytes live in externally stored chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    /// Original filename as uploaded.
    pub filename: String,
    /// Total size in bytes.
    pub size: u64,
    /// Human-facing display name.
    pub name: String,
    /// Declared number of chunks, as supplied at creation.
    pub chunks_count: u32,
}

/// Creation input for a `File`.
///
/// Every field is optional so that "not provided" stays distinguishable
/// from a legitimate zero (an empty file has `size == 0`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub chunks_count: Option<u32>,
}

impl NewFile {
    /// Builds a fully populated input.
    pub fn new(
        filename: impl Into<String>,
        size: u64,
        name: impl Into<String>,
        chunks_count: u32,
    ) -> Self {
        Self {
            filename: Some(filename.into()),
            size: Some(size),
            name: Some(name.into()),
            chunks_count: Some(chunks_count),
        }
    }

    /// Checks required fields, reporting every violation at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_text("filename", self.filename.as_deref());
        errors.require("size", self.size.as_ref());
        errors.require_text("name", self.name.as_deref());
        errors.require("chunks_count", self.chunks_count.as_ref());
        errors.into_result()
    }

    /// Pairs this input with a store-assigned id.
    ///
    /// Returns `None` when a required field is absent.
    pub fn into_file(self, id: FileId) -> Option<File> {
        Some(File {
            id,
            filename: self.filename?,
            size: self.size?,
            name: self.name?,
            chunks_count: self.chunks_count?,
        })
    }
}
