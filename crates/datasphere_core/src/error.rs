//! Storage error taxonomy shared by every repository operation.
//!
//! # Responsibility
//! - Carry a machine-checkable kind plus a diagnostic message.
//! - Map storage-layer failures onto exactly one kind.
//!
//! # Invariants
//! - Every repository failure is a `StorageError`; no bare driver error
//!   escapes the repository boundary.
//! - Message text is diagnostic only. Callers branch on `kind()` or
//!   `status_code()`.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome class of a failed repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller input violates a required-field or referential constraint.
    Validation,
    /// Requested entity or collection does not exist or is empty.
    NotFound,
    /// Storage failure unrelated to caller input.
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code a calling API layer should answer with.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified repository error.
#[derive(Debug)]
pub struct StorageError {
    kind: ErrorKind,
    message: String,
    source: Option<rusqlite::Error>,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Classifies a driver error raised while performing `context`.
    ///
    /// `QueryReturnedNoRows` is not handled here; each operation decides
    /// whether an empty result means `NotFound` or `Internal`.
    pub fn from_sqlite(context: &str, err: rusqlite::Error) -> Self {
        let kind = classify(&err);
        let message = if kind == ErrorKind::Internal && is_interrupted(&err) {
            format!("{context}: operation interrupted")
        } else {
            format!("{context}: {err}")
        };
        Self {
            kind,
            message,
            source: Some(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|err| err as &(dyn Error + 'static))
    }
}

fn classify(err: &rusqlite::Error) -> ErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => match inner.code {
            ErrorCode::ConstraintViolation => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        },
        rusqlite::Error::ToSqlConversionFailure(_) => ErrorKind::Validation,
        _ => ErrorKind::Internal,
    }
}

fn is_interrupted(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::OperationInterrupted
    )
}
