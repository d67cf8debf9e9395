use thiserror::Error;

/// Core error types for dispensary record operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid record type: {0}")]
    InvalidRecordType(String),

    #[error("Invalid record ID: {0}")]
    InvalidId(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),

    #[error("Record not found: {record_type}/{id}")]
    RecordNotFound { record_type: String, id: String },

    #[error("Record conflict: {record_type}/{id} already exists")]
    RecordConflict { record_type: String, id: String },

    #[error("Record removed: {record_type}/{id}")]
    RecordGone { record_type: String, id: String },

    #[error("Invalid record data: {message}")]
    InvalidRecord { message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn invalid_record_type(record_type: impl Into<String>) -> Self {
        Self::InvalidRecordType(record_type.into())
    }

    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    pub fn invalid_date(date: impl Into<String>) -> Self {
        Self::InvalidDate(date.into())
    }

    pub fn record_not_found(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            record_type: record_type.into(),
            id: id.into(),
        }
    }

    pub fn record_conflict(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::RecordConflict {
            record_type: record_type.into(),
            id: id.into(),
        }
    }

    /// Record exists but was soft-removed (maps to 410 Gone at the API edge)
    pub fn record_gone(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::RecordGone {
            record_type: record_type.into(),
            id: id.into(),
        }
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRecordType(_)
                | Self::InvalidId(_)
                | Self::InvalidDate(_)
                | Self::InvalidRecord { .. }
                | Self::RecordNotFound { .. }
                | Self::RecordConflict { .. }
                | Self::RecordGone { .. }
                | Self::JsonError(_)
        )
    }

    /// Check if this error is a server error (5xx category)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::TimeError(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRecordType(_) | Self::InvalidId(_) | Self::InvalidDate(_) => {
                ErrorCategory::Validation
            }
            Self::RecordNotFound { .. } => ErrorCategory::NotFound,
            Self::RecordConflict { .. } => ErrorCategory::Conflict,
            Self::RecordGone { .. } => ErrorCategory::Gone,
            Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::TimeError(_) => ErrorCategory::System,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Gone,
    Serialization,
    System,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Gone => write!(f, "gone"),
            Self::Serialization => write!(f, "serialization"),
            Self::System => write!(f, "system"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CoreError::invalid_record_type("Warehouse");
        assert_eq!(err.to_string(), "Invalid record type: Warehouse");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_record_not_found_error() {
        let err = CoreError::record_not_found("Patient", "123");
        assert_eq!(err.to_string(), "Record not found: Patient/123");
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_record_conflict_error() {
        let err = CoreError::record_conflict("Appointment", "456");
        assert_eq!(
            err.to_string(),
            "Record conflict: Appointment/456 already exists"
        );
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_record_gone_error() {
        let err = CoreError::record_gone("Attention", "a-1");
        assert_eq!(err.to_string(), "Record removed: Attention/a-1");
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::Gone);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("{ bad json }").unwrap_err();
        let core_err: CoreError = json_err.into();

        assert!(matches!(core_err, CoreError::JsonError(_)));
        assert!(core_err.is_client_error());
        assert_eq!(core_err.category(), ErrorCategory::Serialization);
    }

    #[test]
    fn test_configuration_error() {
        let err = CoreError::configuration("missing jwt secret");
        assert_eq!(err.to_string(), "Configuration error: missing jwt secret");
        assert!(err.is_server_error());
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_client_vs_server_classification_is_exclusive() {
        let client_err = CoreError::invalid_id("bad id");
        assert!(client_err.is_client_error());
        assert!(!client_err.is_server_error());

        let server_err = CoreError::configuration("bad config");
        assert!(server_err.is_server_error());
        assert!(!server_err.is_client_error());
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
        assert_eq!(ErrorCategory::Gone.to_string(), "gone");
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
        assert_eq!(ErrorCategory::System.to_string(), "system");
        assert_eq!(ErrorCategory::Configuration.to_string(), "configuration");
    }

    #[test]
    fn test_invalid_record_message_passthrough() {
        let err = CoreError::invalid_record("missing field 'documentNumber'");
        assert!(err.to_string().contains("documentNumber"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_time_error_conversion() {
        match time::OffsetDateTime::parse(
            "2024-13-40T00:00:00Z",
            &time::format_description::well_known::Rfc3339,
        ) {
            Err(time_err) => {
                let core_err: CoreError = time_err.into();
                assert!(matches!(core_err, CoreError::TimeError(_)));
                assert!(core_err.is_server_error());
            }
            Ok(_) => panic!("expected date parsing to fail"),
        }
    }
}
