//! Trait seam for removing uploaded files.
//!
//! Implemented by the object storage and Drive clients in `zf-flows`; the
//! order provider only needs to know that a file can be removed by key.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Attachment, StorageBackend};

/// Removal failed. Callers treat this as best-effort and log it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to remove '{key}': {message}")]
pub struct RemoveError {
    pub key: String,
    pub message: String,
}

#[async_trait]
pub trait FileRemover: Send + Sync {
    /// Backend this remover deletes from.
    fn backend(&self) -> StorageBackend;

    /// Deletes the file stored under `key`.
    async fn remove(&self, key: &str) -> Result<(), RemoveError>;

    /// Deletes the file behind an attachment, if it lives in this backend.
    ///
    /// Returns `Ok(false)` when the attachment belongs to another backend.
    async fn remove_attachment(&self, attachment: &Attachment) -> Result<bool, RemoveError> {
        if attachment.storage != self.backend() {
            return Ok(false);
        }
        self.remove(&attachment.key).await?;
        Ok(true)
    }
}
