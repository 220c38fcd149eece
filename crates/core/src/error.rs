//! Error types for ShelfDB
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Validation and namespacing errors are raised before any backing-store
//! round trip; store errors propagate unretried.

use thiserror::Error;

/// Result type alias for ShelfDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the document-storage facade
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or empty app_id/user_id
    #[error("unauthorized identity: app_id and user_id are required")]
    InvalidTenant,

    /// Document body is absent, not an object, or carries forbidden fields
    #[error("invalid document: forbidden fields {fields:?}")]
    InvalidDocument {
        /// The offending field names, in discovery order
        fields: Vec<String>,
    },

    /// One or more field names violate the active character-class policy
    #[error("invalid key format: {names:?}")]
    InvalidKeyFormat {
        /// Every offending field name found in the document
        names: Vec<String>,
    },

    /// A document key was required but not supplied
    #[error("document key is required")]
    InvalidDocumentKey,

    /// Create collided with a live (non-deleted) key
    #[error("document {key:?} already exists in bucket {bucket:?}")]
    DocumentAlreadyExists {
        /// External key of the existing document
        key: String,
        /// Bucket holding the existing document
        bucket: String,
    },

    /// The targeted document does not exist (or is soft-deleted)
    #[error("document not found")]
    DocumentNotFound,

    /// Malformed filter, out-of-range pagination, or bad tagged value
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Insert violated the backing store's unique primary-key index
    ///
    /// Surfaced by the store when two concurrent creates race past the
    /// existence check; the facade maps it to `DocumentAlreadyExists`.
    #[error("unique index violation on id {0:?}")]
    UniqueIndexViolation(String),

    /// Any other failure surfaced by the backing store
    #[error("backing store error: {0}")]
    BackingStore(String),
}
