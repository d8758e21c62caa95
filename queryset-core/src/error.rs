//! Error types and result types for document store operations.
//!
//! Backend failures are passed through to callers as they are reported. The
//! only normalizations happen outside of this type: a single-document lookup
//! that matches nothing is `Ok(None)`, and a failing join lookup contributes
//! no constraint instead of an error.

use bson::error::Error as BsonError;
use std::time::Duration;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between a model and BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The document has an invalid structure (e.g. an identity that is not an ObjectId).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The store rejected a filter, update, projection or pipeline.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A unique index (including the implicit `_id` index) was violated.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    /// The operation did not complete before its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns true if this error is a unique constraint violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DocumentStoreError::DuplicateKey(_))
    }

    /// Returns true if this error was produced by an elapsed deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DocumentStoreError::Timeout(_))
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
