//! Errors surfaced by the store and the boundary adapter.
//! `ErrorKind` is the flat discriminant handed across the foreign-call
//! boundary; `StoreError` carries the detail for in-process callers.

use std::fmt;

use thiserror::Error;

use crate::field::ConfigField;
use crate::secret::SecretError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    ValueTooLarge,
    PersistenceFailed,
    EncodingError,
    NotInitialized,
}

impl ErrorKind {
    /// Stable status code for hosts that can only receive integers. `0` is
    /// reserved for success.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::InvalidInput => 1,
            ErrorKind::ValueTooLarge => 2,
            ErrorKind::PersistenceFailed => 3,
            ErrorKind::EncodingError => 4,
            ErrorKind::NotInitialized => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ValueTooLarge => "value_too_large",
            ErrorKind::PersistenceFailed => "persistence_failed",
            ErrorKind::EncodingError => "encoding_error",
            ErrorKind::NotInitialized => "not_initialized",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("value is {len} bytes; the limit is {max}")]
    ValueTooLarge { len: usize, max: usize },
    /// The durable write failed. `applied` tells whether the in-memory value
    /// was updated anyway.
    #[error("{field} was not persisted (applied in memory: {applied}): {reason}")]
    PersistenceFailed {
        field: ConfigField,
        applied: bool,
        reason: String,
    },
    #[error("stored value could not be rendered as text: {0}")]
    Encoding(String),
    #[error("config store is not initialized")]
    NotInitialized,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            StoreError::ValueTooLarge { .. } => ErrorKind::ValueTooLarge,
            StoreError::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            StoreError::Encoding(_) => ErrorKind::EncodingError,
            StoreError::NotInitialized => ErrorKind::NotInitialized,
        }
    }

    /// True when the operation took effect in memory despite the error.
    pub fn is_applied(&self) -> bool {
        matches!(self, StoreError::PersistenceFailed { applied: true, .. })
    }
}

impl From<SecretError> for StoreError {
    fn from(err: SecretError) -> Self {
        StoreError::Encoding(format!("{err}"))
    }
}
