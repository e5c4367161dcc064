//! Error types for Inset.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the set engine and the range index.
#[derive(Error, Debug)]
pub enum Error {
    /// Contract violation by the caller (build before header, zero-column probe).
    #[error("Logical error: {0}")]
    Logical(String),

    /// Accumulated set size crossed the configured limit.
    #[error(
        "Limit for rows or bytes to read exceeded in {what}: \
         rows {rows} (max {max_rows}), bytes {bytes} (max {max_bytes})"
    )]
    SizeLimitExceeded {
        /// What was being accumulated, e.g. `IN-set`.
        what: String,
        /// Rows accumulated so far.
        rows: u64,
        /// Configured row limit (0 = unlimited).
        max_rows: u64,
        /// Bytes accumulated so far.
        bytes: u64,
        /// Configured byte limit (0 = unlimited).
        max_bytes: u64,
    },

    /// Probe block arity differs from the set arity.
    #[error("Number of columns in section IN doesn't match. {left} at left, {right} at right.")]
    NumberOfColumnsDoesntMatch {
        /// Columns passed by the caller.
        left: usize,
        /// Columns stored in the set.
        right: usize,
    },

    /// Candidate type is not structurally equal to the stored key type.
    #[error("Types of column {column} in section IN don't match: {left} on the left, {right} on the right")]
    TypeMismatch {
        /// 1-based column position.
        column: usize,
        /// Candidate type name.
        left: String,
        /// Stored type name.
        right: String,
    },

    /// A value cannot be represented exactly in the target type.
    #[error("Cannot convert value {value} to type {to}")]
    CannotConvertType {
        /// Rendered source value.
        value: String,
        /// Target type name.
        to: String,
    },

    /// Wire payload is malformed.
    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema/limits encoding error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns the stable error code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Logical(_) => "INSET-001",
            Self::SizeLimitExceeded { .. } => "INSET-002",
            Self::NumberOfColumnsDoesntMatch { .. } => "INSET-003",
            Self::TypeMismatch { .. } => "INSET-004",
            Self::CannotConvertType { .. } => "INSET-005",
            Self::CorruptedData(_) => "INSET-006",
            Self::Io(_) => "INSET-007",
            Self::Serialization(_) => "INSET-008",
            Self::Config(_) => "INSET-009",
        }
    }

    /// Returns true for input-validation errors that a caller may surface to users as-is.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NumberOfColumnsDoesntMatch { .. }
                | Self::TypeMismatch { .. }
                | Self::CannotConvertType { .. }
        )
    }
}

/// Result type alias for Inset operations.
pub type Result<T> = std::result::Result<T, Error>;
