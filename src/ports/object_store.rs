//! Object Store Port - blob storage for uploaded images.
//!
//! Only the put/delete contract matters to the core. Keys are opaque strings
//! chosen by the upload path.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Port for blob storage.
///
/// # Contract
///
/// Implementations must:
/// - Make `put` atomic (no partial object visible on failure)
/// - Report a missing key on `delete` as [`StorageError::NotFound`], which
///   callers treat as "already deleted"
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content` under `key`, replacing any previous object.
    async fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Remove the object stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Errors that can occur during object storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Object was not found.
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// Permission denied accessing the object.
    #[error("Permission denied: {key}")]
    PermissionDenied { key: String },

    /// Key cannot be mapped onto the store.
    #[error("Invalid object key: {key}")]
    InvalidKey { key: String },

    /// IO error during the operation.
    #[error("IO error: {message}")]
    Io { message: String },
}

impl StorageError {
    /// Creates a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a permission denied error.
    pub fn permission_denied(key: impl Into<String>) -> Self {
        Self::PermissionDenied { key: key.into() }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Creates an IO error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// True when the object is already absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::permission_denied(err.to_string()),
            _ => StorageError::io(err.to_string()),
        }
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        DomainError::new(ErrorCode::ObjectStoreError, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_converts_to_object_store_domain_error() {
        let err: DomainError = StorageError::io("bucket unavailable").into();
        assert_eq!(err.code, ErrorCode::ObjectStoreError);
        assert!(err.message.contains("bucket unavailable"));
    }

    #[test]
    fn storage_error_not_found_displays_key() {
        let err = StorageError::not_found("tmp/abc.jpg");
        assert_eq!(err.to_string(), "Object not found: tmp/abc.jpg");
        assert!(err.is_not_found());
    }

    #[test]
    fn storage_error_from_io_error_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let storage_err: StorageError = io_err.into();
        assert!(storage_err.is_not_found());
    }

    #[test]
    fn storage_error_from_io_error_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::PermissionDenied { .. }));
    }

    #[test]
    fn storage_error_from_io_error_other() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io { .. }));
        assert!(!storage_err.is_not_found());
    }

    #[test]
    fn object_store_is_object_safe() {
        fn check<T: ObjectStore + ?Sized>() {}
        check::<dyn ObjectStore>();
    }
}
