//! Chunked-file metadata model.
//!
//! # Responsibility
//! - Define the persisted `File` and `Chunk` records.
//! - Define creation inputs with explicit optional fields and their
//!   validation rules.
//!
//! # Invariants
//! - A `File` is never updated after creation; only deletion mutates it.
//! - A `Chunk` belongs to exactly one `File` through `file_key`; ownership
//!   is enforced by the schema, not by an in-memory graph.
//! - `File::chunks_count` is a declared value and is not reconciled with
//!   the actual number of chunk rows.

pub mod chunk;
pub mod file;
pub mod validation;
