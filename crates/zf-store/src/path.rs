//! # Resource Paths
//!
//! Collections and documents alternate along a slash-separated path:
//!
//! ```text
//!   users                          collection   (1 segment)
//!   users/u1                       document     (2 segments)
//!   users/u1/notifications         collection   (3 segments)
//!   users/u1/notifications/n9      document     (4 segments)
//! ```
//!
//! Odd segment counts are collections, even counts are documents. Both types
//! are validated on construction so the rest of the store can trust them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

fn split_segments(path: &str) -> StoreResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::invalid_path(path, "path is empty"));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(StoreError::invalid_path(path, "empty segment"));
    }
    Ok(segments)
}

// =============================================================================
// Collection Path
// =============================================================================

/// Path of a collection (`orders`, `users/u1/notifications`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Parses a collection path.
    ///
    /// ## Example
    /// ```rust
    /// use zf_store::CollectionPath;
    ///
    /// assert!(CollectionPath::new("orders").is_ok());
    /// assert!(CollectionPath::new("users/u1/notifications").is_ok());
    /// assert!(CollectionPath::new("users/u1").is_err());
    /// ```
    pub fn new(path: impl AsRef<str>) -> StoreResult<Self> {
        let raw = path.as_ref();
        let segments = split_segments(raw)?;
        if segments.len() % 2 == 0 {
            return Err(StoreError::invalid_path(
                raw,
                "collection paths have an odd number of segments",
            ));
        }
        Ok(CollectionPath(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment (`notifications` for `users/u1/notifications`).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Document that owns this subcollection, if any.
    pub fn parent(&self) -> Option<DocPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| DocPath(parent.to_string()))
    }

    /// Document `id` inside this collection.
    pub fn doc(&self, id: impl AsRef<str>) -> StoreResult<DocPath> {
        let id = id.as_ref();
        if id.trim().is_empty() || id.contains('/') {
            return Err(StoreError::invalid_path(
                format!("{}/{}", self.0, id),
                "document id must be a single non-empty segment",
            ));
        }
        Ok(DocPath(format!("{}/{}", self.0, id)))
    }

    /// A new document path with a generated id.
    pub fn new_doc(&self) -> DocPath {
        DocPath(format!("{}/{}", self.0, Uuid::new_v4().simple()))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CollectionPath {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CollectionPath::new(value)
    }
}

impl From<CollectionPath> for String {
    fn from(path: CollectionPath) -> Self {
        path.0
    }
}

// =============================================================================
// Document Path
// =============================================================================

/// Path of a single document (`orders/abc`, `settings/colors`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocPath(String);

impl DocPath {
    /// Parses a document path.
    ///
    /// ## Example
    /// ```rust
    /// use zf_store::DocPath;
    ///
    /// let path = DocPath::new("settings/colors").unwrap();
    /// assert_eq!(path.id(), "colors");
    /// assert_eq!(path.parent().as_str(), "settings");
    /// assert!(DocPath::new("orders").is_err());
    /// ```
    pub fn new(path: impl AsRef<str>) -> StoreResult<Self> {
        let raw = path.as_ref();
        let segments = split_segments(raw)?;
        if segments.len() % 2 != 0 {
            return Err(StoreError::invalid_path(
                raw,
                "document paths have an even number of segments",
            ));
        }
        Ok(DocPath(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(self.0.clone()),
        }
    }

    /// Subcollection `name` under this document.
    pub fn collection(&self, name: impl AsRef<str>) -> StoreResult<CollectionPath> {
        CollectionPath::new(format!("{}/{}", self.0, name.as_ref()))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocPath {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DocPath::new(value)
    }
}

impl From<DocPath> for String {
    fn from(path: DocPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_parity() {
        assert!(CollectionPath::new("orders").is_ok());
        assert!(CollectionPath::new("orders/abc").is_err());
        assert!(DocPath::new("orders/abc").is_ok());
        assert!(DocPath::new("users/u1/notifications").is_err());
        assert!(DocPath::new("users/u1/notifications/n1").is_ok());
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(matches!(
            DocPath::new("orders//abc/def"),
            Err(StoreError::InvalidPath { .. })
        ));
        assert!(CollectionPath::new("").is_err());
        assert!(CollectionPath::new("  ").is_err());
    }

    #[test]
    fn test_leading_and_trailing_slashes_are_normalized() {
        let path = DocPath::new("/orders/abc/").unwrap();
        assert_eq!(path.as_str(), "orders/abc");
    }

    #[test]
    fn test_navigation() {
        let users = CollectionPath::new("users").unwrap();
        let user = users.doc("u1").unwrap();
        let inbox = user.collection("notifications").unwrap();
        let note = inbox.doc("n1").unwrap();

        assert_eq!(note.as_str(), "users/u1/notifications/n1");
        assert_eq!(note.parent(), inbox);
        assert_eq!(inbox.parent(), Some(user));
        assert_eq!(users.parent(), None);
        assert_eq!(inbox.id(), "notifications");
    }

    #[test]
    fn test_doc_rejects_nested_ids() {
        let orders = CollectionPath::new("orders").unwrap();
        assert!(orders.doc("a/b").is_err());
        assert!(orders.doc("").is_err());
    }

    #[test]
    fn test_new_doc_ids_are_unique() {
        let orders = CollectionPath::new("orders").unwrap();
        let a = orders.new_doc();
        let b = orders.new_doc();
        assert_ne!(a, b);
        assert_eq!(a.parent(), orders);
        assert_eq!(a.id().len(), 32);
    }

    #[test]
    fn test_serde_validates() {
        let path: DocPath = serde_json::from_str("\"settings/colors\"").unwrap();
        assert_eq!(path.id(), "colors");
        assert!(serde_json::from_str::<DocPath>("\"settings\"").is_err());
    }
}
