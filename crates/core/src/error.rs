//! Error types for tempora
//!
//! Every fallible operation in the workspace returns [`TemporaResult`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - `InvalidArgument`: raised before any mutation is attempted (missing
//!   temporal bound, `Any` referential on a write, inverted range, ...)
//! - `TransactionFailure`: the store could not commit an atomic batch.
//!   Nothing from the batch is visible when this is returned.
//! - `Serialization`: canonical encoding of a payload failed
//! - `Config`: `tempora.toml` could not be read or holds invalid values
//! - `Storage`: the storage backend failed outside of a commit
//!
//! Absence is never an error: lookups return `Ok(None)` or an empty collection.

use std::fmt;
use thiserror::Error;

/// Result type alias for tempora operations
pub type TemporaResult<T> = std::result::Result<T, TemporaError>;

/// Why an atomic batch could not be committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionFailureReason {
    /// An identity timeline changed between planning and commit
    Conflict,
    /// The batch would violate `(uid, validity_start)` or
    /// `(uid, content_hash, validity_start)` uniqueness
    UniqueViolation,
    /// The batch would leave a version with `start >= end`
    InvalidInterval,
    /// The batch would leave two versions of one identity overlapping
    Overlap,
}

impl fmt::Display for TransactionFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionFailureReason::Conflict => write!(f, "conflict"),
            TransactionFailureReason::UniqueViolation => write!(f, "unique violation"),
            TransactionFailureReason::InvalidInterval => write!(f, "invalid interval"),
            TransactionFailureReason::Overlap => write!(f, "overlapping validity"),
        }
    }
}

/// Error types for tempora
#[derive(Debug, Error)]
pub enum TemporaError {
    /// A caller-supplied argument is missing or unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An atomic batch was rejected by the store
    #[error("Transaction failure ({reason}): {message}")]
    TransactionFailure {
        /// Classification of the failure
        reason: TransactionFailureReason,
        /// Human readable context
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TemporaError {
    /// Build an `InvalidArgument` error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        TemporaError::InvalidArgument(message.into())
    }

    /// Build a `TransactionFailure` error
    pub fn transaction_failure(reason: TransactionFailureReason, message: impl Into<String>) -> Self {
        TemporaError::TransactionFailure {
            reason,
            message: message.into(),
        }
    }

    /// Build a `Config` error
    pub fn config(message: impl Into<String>) -> Self {
        TemporaError::Config(message.into())
    }

    /// True for `InvalidArgument`
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, TemporaError::InvalidArgument(_))
    }

    /// True for `TransactionFailure`
    pub fn is_transaction_failure(&self) -> bool {
        matches!(self, TemporaError::TransactionFailure { .. })
    }

    /// The failure reason, if this is a `TransactionFailure`
    pub fn transaction_failure_reason(&self) -> Option<TransactionFailureReason> {
        match self {
            TemporaError::TransactionFailure { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl From<rmp_serde::encode::Error> for TemporaError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        TemporaError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for TemporaError {
    fn from(e: serde_json::Error) -> Self {
        TemporaError::Serialization(e.to_string())
    }
}
