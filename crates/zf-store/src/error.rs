//! # Store Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / serde_json::Error / policy denial                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module)                                              │
//! │       │                                                                 │
//! │       ├── awaited call ──► returned to the caller                      │
//! │       │                                                                 │
//! │       └── subscription / non-blocking write                            │
//! │                │                                                        │
//! │                ▼                                                        │
//! │           PermissionError ──► ErrorChannel ──► ErrorListener           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::policy::Operation;

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document does not exist.
    ///
    /// ## When This Occurs
    /// - `update` on a path with no document
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The access policy rejected the operation.
    #[error("Missing or insufficient permissions: {operation} on {path}")]
    PermissionDenied { operation: Operation, path: String },

    /// Malformed collection or document path.
    ///
    /// ## When This Occurs
    /// - Empty segments (`orders//abc`)
    /// - A document path with an odd number of segments, or the reverse
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Fields could not be converted to or from the typed value.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Query or transaction failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Creates an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::PoolTimedOut / PoolClosed  → StoreError::ConnectionFailed
/// Other                                   → StoreError::Database
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                StoreError::ConnectionFailed("Connection pool exhausted".to_string())
            }
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
