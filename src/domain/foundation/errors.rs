//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    BrandNotFound,
    UploadNotFound,

    // Conflict errors
    ObjectKeyInUse,

    // Programmer errors
    NoTransaction,

    // Infrastructure errors
    DatabaseError,
    SerializationError,
    LockError,
    MessageSinkError,
    ObjectStoreError,
    Timeout,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::BrandNotFound => "BRAND_NOT_FOUND",
            ErrorCode::UploadNotFound => "UPLOAD_NOT_FOUND",
            ErrorCode::ObjectKeyInUse => "OBJECT_KEY_IN_USE",
            ErrorCode::NoTransaction => "NO_TRANSACTION",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::LockError => "LOCK_ERROR",
            ErrorCode::MessageSinkError => "MESSAGE_SINK_ERROR",
            ErrorCode::ObjectStoreError => "OBJECT_STORE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field.into())
    }

    /// Creates a database error from any displayable cause.
    pub fn database(context: &str, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, format!("{}: {}", context, cause))
    }

    /// A store was called outside of a transaction it requires.
    ///
    /// Signals a wiring bug, never bad data.
    pub fn no_transaction(operation: &str) -> Self {
        Self::new(
            ErrorCode::NoTransaction,
            format!("{} requires a transaction in scope", operation),
        )
        .with_detail("operation", operation)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// True for the missing-transaction programmer error.
    pub fn is_no_transaction(&self) -> bool {
        self.code == ErrorCode::NoTransaction
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::BrandNotFound, "Brand not found: 7");
        assert_eq!(format!("{}", err), "[BRAND_NOT_FOUND] Brand not found: 7");
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::new(ErrorCode::ValidationFailed, "Validation failed")
            .with_detail("field", "price")
            .with_detail("reason", "must be positive");

        assert_eq!(err.details.get("field"), Some(&"price".to_string()));
        assert_eq!(err.details.get("reason"), Some(&"must be positive".to_string()));
    }

    #[test]
    fn no_transaction_is_distinct_from_database_errors() {
        let missing = DomainError::no_transaction("outbox.create_event");
        let db = DomainError::database("Failed to insert event", "connection reset");

        assert!(missing.is_no_transaction());
        assert!(!db.is_no_transaction());
        assert_eq!(missing.details.get("operation"), Some(&"outbox.create_event".to_string()));
    }

    #[test]
    fn database_error_includes_context_and_cause() {
        let err = DomainError::database("Failed to reserve events", "deadlock detected");
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Failed to reserve events: deadlock detected");
    }

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::NoTransaction), "NO_TRANSACTION");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }
}
