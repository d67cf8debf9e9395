//! Error types for the record storage abstraction.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record was not found.
    #[error("Record not found: {record_type}/{id}")]
    NotFound { record_type: String, id: String },

    /// Attempted to create a record that already exists.
    #[error("Record already exists: {record_type}/{id}")]
    AlreadyExists { record_type: String, id: String },

    /// The record exists but was soft-removed.
    #[error("Record removed: {record_type}/{id}")]
    Gone { record_type: String, id: String },

    /// The record data is invalid.
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            record_type: record_type.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn already_exists(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            record_type: record_type.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn gone(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Gone {
            record_type: record_type.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::Gone { .. } => ErrorCategory::Gone,
            Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Gone,
    Validation,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Gone => write!(f, "gone"),
            Self::Validation => write!(f, "validation"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
