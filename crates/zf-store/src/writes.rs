//! # Non-Blocking Writes
//!
//! Fire-and-forget mutations. Each call hands the write to its own task and
//! returns immediately; a failure is published to the [`ErrorChannel`] with
//! the operation, path and payload instead of being returned.
//!
//! ```text
//! caller ── update_document(path, fields) ──► WriteTicket (returns now)
//!                     │
//!                     └─► tokio::spawn ─► store.update()
//!                                            ├── Ok  ─► ticket resolves true
//!                                            └── Err ─► ErrorChannel.publish()
//!                                                        ticket resolves false
//! ```
//!
//! Callers that need to sequence on the outcome may await the ticket; the
//! ticket can also be dropped without cancelling the write.

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::batch::{WriteBatch, WriteOp};
use crate::document::Fields;
use crate::error::StoreResult;
use crate::path::{CollectionPath, DocPath};
use crate::permission::{ErrorChannel, PermissionError};
use crate::policy::Operation;
use crate::store::DocumentStore;

/// Options for [`NonBlockingWriter::set_document`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Keep stored fields that `fields` does not mention.
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        SetOptions { merge: true }
    }
}

/// Handle to a write in flight.
#[derive(Debug)]
pub struct WriteTicket(JoinHandle<bool>);

impl WriteTicket {
    /// Waits for the write. `true` when it was committed.
    pub async fn wait(self) -> bool {
        self.0.await.unwrap_or(false)
    }
}

/// Issues writes without waiting for them.
#[derive(Debug, Clone)]
pub struct NonBlockingWriter {
    store: DocumentStore,
    errors: ErrorChannel,
}

impl NonBlockingWriter {
    pub fn new(store: DocumentStore, errors: ErrorChannel) -> Self {
        NonBlockingWriter { store, errors }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    /// Creates or overwrites `path`; merges when `options.merge`.
    pub fn set_document(&self, path: DocPath, fields: Fields, options: SetOptions) -> WriteTicket {
        let payload = Value::Object(fields.clone());
        let target = path.to_string();
        let store = self.store.clone();
        self.spawn(Operation::Write, target, Some(payload), async move {
            if options.merge {
                store.set_merge(&path, fields).await
            } else {
                store.set(&path, fields).await
            }
        })
    }

    /// Creates a document with a generated id. The id is known before the
    /// write lands.
    pub fn add_document(&self, collection: &CollectionPath, fields: Fields) -> (DocPath, WriteTicket) {
        let path = collection.new_doc();
        let payload = Value::Object(fields.clone());
        let store = self.store.clone();
        let doc = path.clone();
        let ticket = self.spawn(
            Operation::Create,
            collection.to_string(),
            Some(payload),
            async move { store.set(&doc, fields).await },
        );
        (path, ticket)
    }

    /// Writes `fields` over an existing document.
    pub fn update_document(&self, path: DocPath, fields: Fields) -> WriteTicket {
        let payload = Value::Object(fields.clone());
        let target = path.to_string();
        let store = self.store.clone();
        self.spawn(Operation::Update, target, Some(payload), async move {
            store.update(&path, fields).await
        })
    }

    pub fn delete_document(&self, path: DocPath) -> WriteTicket {
        let target = path.to_string();
        let store = self.store.clone();
        self.spawn(Operation::Delete, target, None, async move {
            store.delete(&path).await
        })
    }

    /// Commits a batch atomically. Failures are reported against the first
    /// path in the batch.
    pub fn commit_batch(&self, batch: WriteBatch) -> WriteTicket {
        let target = batch
            .ops()
            .first()
            .map(|op| op.path().to_string())
            .unwrap_or_default();
        let payload = batch_payload(&batch);
        let store = self.store.clone();
        self.spawn(Operation::Write, target, Some(payload), async move {
            store.commit(batch).await
        })
    }

    fn spawn<F>(
        &self,
        operation: Operation,
        path: String,
        payload: Option<Value>,
        write: F,
    ) -> WriteTicket
    where
        F: std::future::Future<Output = StoreResult<()>> + Send + 'static,
    {
        let errors = self.errors.clone();
        debug!(%operation, path = %path, "Queueing write");

        WriteTicket(tokio::spawn(async move {
            match write.await {
                Ok(()) => true,
                Err(err) => {
                    debug!(%operation, path = %path, error = %err, "Write failed");
                    let mut perm = PermissionError::from_store(operation, path, &err);
                    if let Some(payload) = payload {
                        perm = perm.with_payload(payload);
                    }
                    errors.publish(perm);
                    false
                }
            }
        }))
    }
}

fn batch_payload(batch: &WriteBatch) -> Value {
    Value::Array(
        batch
            .ops()
            .iter()
            .map(|op| match op {
                WriteOp::Set { path, fields, merge } => serde_json::json!({
                    "set": path.as_str(),
                    "merge": merge,
                    "fields": fields,
                }),
                WriteOp::Update { path, fields } => serde_json::json!({
                    "update": path.as_str(),
                    "fields": fields,
                }),
                WriteOp::Delete { path } => serde_json::json!({ "delete": path.as_str() }),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AccessPolicy, AccessRequest};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct ReadOnly;

    impl AccessPolicy for ReadOnly {
        fn allows(&self, request: &AccessRequest<'_>) -> bool {
            request.operation.is_read()
        }
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    async fn writer() -> NonBlockingWriter {
        NonBlockingWriter::new(DocumentStore::in_memory().await.unwrap(), ErrorChannel::new())
    }

    #[tokio::test]
    async fn test_set_and_merge() {
        let writer = writer().await;
        let path = DocPath::new("orders/o1").unwrap();

        let ticket = writer.set_document(
            path.clone(),
            fields(json!({ "status": "Pending", "notes": "rush" })),
            SetOptions::default(),
        );
        assert!(ticket.wait().await);

        let ticket = writer.set_document(
            path.clone(),
            fields(json!({ "status": "Designing" })),
            SetOptions::merge(),
        );
        assert!(ticket.wait().await);

        let doc = writer.store().get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get("status"), Some(&json!("Designing")));
        assert_eq!(doc.get("notes"), Some(&json!("rush")));
    }

    #[tokio::test]
    async fn test_add_document_returns_id_immediately() {
        let writer = writer().await;
        let orders = CollectionPath::new("orders").unwrap();

        let (path, ticket) = writer.add_document(&orders, fields(json!({ "notes": "x" })));
        assert_eq!(path.parent(), orders);
        assert!(ticket.wait().await);
        assert!(writer.store().get(&path).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_missing_document_publishes_error() {
        let writer = writer().await;
        let mut errors = writer.errors().subscribe();

        let ticket = writer.update_document(
            DocPath::new("orders/missing").unwrap(),
            fields(json!({ "status": "Shipped" })),
        );
        assert!(!ticket.wait().await);

        let err = errors.recv().await.unwrap();
        assert_eq!(err.operation, Operation::Update);
        assert_eq!(err.path, "orders/missing");
        assert_eq!(err.payload, Some(json!({ "status": "Shipped" })));
        assert!(errors.try_recv().is_err(), "one failure is reported once");
    }

    #[tokio::test]
    async fn test_denied_write_does_not_block_caller() {
        let store = DocumentStore::in_memory()
            .await
            .unwrap()
            .with_policy(Arc::new(ReadOnly));
        let writer = NonBlockingWriter::new(store, ErrorChannel::new());
        let mut errors = writer.errors().subscribe();

        let ticket = writer.delete_document(DocPath::new("orders/o1").unwrap());
        let err = errors.recv().await.unwrap();
        assert_eq!(err.operation, Operation::Delete);
        assert!(err.message.contains("Missing or insufficient permissions"));
        assert!(err.payload.is_none());
        assert!(!ticket.wait().await);
    }

    #[tokio::test]
    async fn test_batch_is_atomic() {
        let writer = writer().await;
        let mut errors = writer.errors().subscribe();
        let a = DocPath::new("products/a").unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set(a.clone(), fields(json!({ "name": "Sofa" })))
            .update(DocPath::new("products/missing").unwrap(), fields(json!({ "name": "X" })));

        assert!(!writer.commit_batch(batch).wait().await);
        assert!(writer.store().get(&a).await.unwrap().is_none());

        let err = errors.recv().await.unwrap();
        assert_eq!(err.operation, Operation::Write);
        assert_eq!(err.path, "products/a");
        assert_eq!(err.payload.unwrap().as_array().map(Vec::len), Some(2));
    }
}
