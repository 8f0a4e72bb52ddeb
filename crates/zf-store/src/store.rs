//! # Document Store
//!
//! The single shared mutable resource of the data layer. Every mutation is
//! committed in a SQLite transaction and then announced on the change feed,
//! which is what keeps live subscriptions current.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  set / update / delete / commit(WriteBatch)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │  for each op:                                                          │
//! │     load stored fields ─► resolve sentinels ─► policy check            │
//! │     upsert / delete row                                                │
//! │  COMMIT                                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  broadcast ChangeEvent { path, kind } per op (commit order)            │
//! │       │                                                                 │
//! │       ├──► Subscription A (orders)        re-runs its query            │
//! │       └──► Subscription B (settings/x)    ignores unrelated paths      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Handles
//! `DocumentStore` is cheap to clone. [`DocumentStore::with_auth`] returns a
//! handle acting as another user over the same pool, change feed and
//! counters.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::batch::{WriteBatch, WriteOp};
use crate::document::{apply_fields, Document, Fields};
use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::path::{CollectionPath, DocPath};
use crate::policy::{AccessPolicy, AccessRequest, AllowAll, AuthContext, Operation};
use crate::pool::{connect_pool, StoreConfig};
use crate::query::Query;

// =============================================================================
// Change Feed
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Announces one committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: DocPath,
    pub kind: ChangeKind,
}

// =============================================================================
// Stats
// =============================================================================

#[derive(Debug, Default)]
struct StoreStats {
    reads: AtomicU64,
    writes: AtomicU64,
}

/// Operation counters since the store was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// `get` and `run_query` calls that reached the database.
    pub reads: u64,
    /// Committed document writes (each batch op counts once).
    pub writes: u64,
}

// =============================================================================
// Document Store
// =============================================================================

/// Handle to the document store.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    policy: Arc<dyn AccessPolicy>,
    auth: AuthContext,
    changes: broadcast::Sender<ChangeEvent>,
    stats: Arc<StoreStats>,
}

impl DocumentStore {
    /// Opens the store: pool, migrations and change feed.
    ///
    /// The returned handle is anonymous and uses [`AllowAll`].
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let pool = connect_pool(&config).await?;
        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }
        let (changes, _) = broadcast::channel(config.change_buffer);

        info!("Document store ready");
        Ok(DocumentStore {
            pool,
            policy: Arc::new(AllowAll),
            auth: AuthContext::anonymous(),
            changes,
            stats: Arc::new(StoreStats::default()),
        })
    }

    /// Opens an isolated in-memory store.
    pub async fn in_memory() -> StoreResult<Self> {
        DocumentStore::open(StoreConfig::in_memory()).await
    }

    /// Replaces the access policy on this handle.
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// A handle acting as `auth` over the same database and change feed.
    pub fn with_auth(&self, auth: AuthContext) -> Self {
        DocumentStore {
            auth,
            ..self.clone()
        }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscribes to committed writes.
    pub fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.stats.reads.load(Ordering::SeqCst),
            writes: self.stats.writes.load(Ordering::SeqCst),
        }
    }

    fn authorize(&self, operation: Operation, path: &str, data: Option<&Fields>) -> StoreResult<()> {
        let request = AccessRequest {
            auth: &self.auth,
            operation,
            path,
            data,
        };
        if self.policy.allows(&request) {
            Ok(())
        } else {
            debug!(%operation, path, uid = ?self.auth.uid, "Access denied");
            Err(StoreError::PermissionDenied {
                operation,
                path: path.to_string(),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Reads one document, `None` if absent.
    pub async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        self.authorize(Operation::Get, path.as_str(), None)?;
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        debug!(path = %path, "Getting document");

        let row: Option<(String, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT path, data, created_at, updated_at FROM documents WHERE path = ?",
        )
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_row).transpose()
    }

    /// Runs a query over one collection.
    pub async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.authorize(Operation::List, query.collection.as_str(), None)?;
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        debug!(query = %query.key(), "Running query");

        let rows: Vec<(String, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT path, data, created_at, updated_at
            FROM documents
            WHERE collection = ?
            ORDER BY doc_id
            "#,
        )
        .bind(query.collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        let docs = rows
            .into_iter()
            .map(decode_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(query.apply(docs))
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Creates or overwrites a document.
    pub async fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        self.commit(WriteOp::Set {
            path: path.clone(),
            fields,
            merge: false,
        })
        .await
    }

    /// Creates a document or writes `fields` over the stored ones.
    pub async fn set_merge(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        self.commit(WriteOp::Set {
            path: path.clone(),
            fields,
            merge: true,
        })
        .await
    }

    /// Writes `fields` over an existing document.
    ///
    /// ## Errors
    /// `NotFound` when the document does not exist.
    pub async fn update(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        self.commit(WriteOp::Update {
            path: path.clone(),
            fields,
        })
        .await
    }

    /// Deletes a document. Deleting an absent document succeeds.
    pub async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.commit(WriteOp::Delete { path: path.clone() }).await
    }

    /// Creates a document with a generated id.
    pub async fn add(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<DocPath> {
        let path = collection.new_doc();
        self.set(&path, fields).await?;
        Ok(path)
    }

    /// Applies every write in one transaction.
    pub async fn commit(&self, batch: impl Into<WriteBatch>) -> StoreResult<()> {
        let batch = batch.into();
        if batch.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut events = Vec::with_capacity(batch.len());

        for op in batch.into_ops() {
            let event = self.apply_op(&mut *tx, op, now).await?;
            events.push(event);
        }

        tx.commit().await?;
        self.stats
            .writes
            .fetch_add(events.len() as u64, Ordering::SeqCst);

        for event in events {
            debug!(path = %event.path, kind = ?event.kind, "Committed");
            // No receivers is fine: nobody is listening yet
            let _ = self.changes.send(event);
        }
        Ok(())
    }

    async fn apply_op(
        &self,
        conn: &mut SqliteConnection,
        op: WriteOp,
        now: DateTime<Utc>,
    ) -> StoreResult<ChangeEvent> {
        let path = op.path().clone();
        let existing = load_fields(conn, &path).await?;
        let existed = existing.is_some();

        let next = match op {
            WriteOp::Set { fields, merge, .. } => {
                let base = if merge {
                    existing.unwrap_or_default()
                } else {
                    Fields::new()
                };
                Some(apply_fields(base, fields, now))
            }
            WriteOp::Update { fields, .. } => {
                let Some(current) = existing else {
                    return Err(StoreError::NotFound(path.to_string()));
                };
                Some(apply_fields(current, fields, now))
            }
            WriteOp::Delete { .. } => None,
        };

        let (operation, kind) = match (&next, existed) {
            (Some(_), false) => (Operation::Create, ChangeKind::Created),
            (Some(_), true) => (Operation::Update, ChangeKind::Updated),
            (None, _) => (Operation::Delete, ChangeKind::Deleted),
        };
        self.authorize(operation, path.as_str(), next.as_ref())?;

        match next {
            Some(fields) => {
                let data = serde_json::to_string(&fields)?;
                sqlx::query(
                    r#"
                    INSERT INTO documents (path, collection, doc_id, data, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ON CONFLICT(path) DO UPDATE SET
                        data = excluded.data,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(path.as_str())
                .bind(path.parent().as_str())
                .bind(path.id())
                .bind(data)
                .bind(now)
                .bind(now)
                .execute(&mut *conn)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM documents WHERE path = ?")
                    .bind(path.as_str())
                    .execute(&mut *conn)
                    .await?;
            }
        }

        Ok(ChangeEvent { path, kind })
    }

    /// Checks that the database answers.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("Closing document store");
        self.pool.close().await;
    }
}

async fn load_fields(conn: &mut SqliteConnection, path: &DocPath) -> StoreResult<Option<Fields>> {
    let data: Option<String> = sqlx::query_scalar("SELECT data FROM documents WHERE path = ?")
        .bind(path.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    data.map(|raw| serde_json::from_str::<Fields>(&raw).map_err(StoreError::from))
        .transpose()
}

fn decode_row(row: (String, String, DateTime<Utc>, DateTime<Utc>)) -> StoreResult<Document> {
    let (path, data, create_time, update_time) = row;
    Ok(Document {
        path: DocPath::new(path)?,
        fields: serde_json::from_str(&data)?,
        create_time,
        update_time,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
