//! # zf-store: Document Store for ZF Ops
//!
//! Schemaless JSON documents addressed by slash paths (`orders/{id}`,
//! `settings/productCategories`), kept in SQLite and pushed to readers
//! through live subscriptions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ZF Ops Data Flow                                 │
//! │                                                                         │
//! │  Provider call (useOrders, updateOrder)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     zf-store (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │ Subscription  │   │ NonBlocking    │   │ ErrorChannel  │   │   │
//! │  │   │ (live reads)  │   │ Writer         │──►│ (permission   │   │   │
//! │  │   │               │──►│ (spawned)      │   │  errors)      │   │   │
//! │  │   └───────┬───────┘   └───────┬────────┘   └───────────────┘   │   │
//! │  │           │ change feed       │                                 │   │
//! │  │   ┌───────┴───────────────────▼─────────┐   ┌───────────────┐   │   │
//! │  │   │ DocumentStore                       │──►│ AccessPolicy  │   │   │
//! │  │   │ get · run_query · set · commit      │   └───────────────┘   │   │
//! │  │   └───────────────────┬─────────────────┘                       │   │
//! │  └───────────────────────┼─────────────────────────────────────────┘   │
//! │                          ▼                                              │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite: documents(path, collection, doc_id, data, timestamps)  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Store configuration and SQLite pool
//! - [`migrations`] - Embedded migrations
//! - [`store`] - The document store and its change feed
//! - [`path`] - Collection and document paths
//! - [`document`] - Field maps, typed decoding, server-side field values
//! - [`query`] - Equality filters, ordering, limits
//! - [`batch`] - Atomic write batches
//! - [`policy`] - Access checks
//! - [`subscription`] - Live collection and document views
//! - [`writes`] - Fire-and-forget writes
//! - [`permission`] - Permission error channel and listener
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zf_store::{watch_collection, DocumentStore, ErrorChannel, Query, CollectionPath};
//!
//! let store = DocumentStore::in_memory().await?;
//! let errors = ErrorChannel::new();
//!
//! let orders = Query::new(CollectionPath::new("orders")?);
//! let sub = watch_collection::<serde_json::Value>(&store, &errors, Some(orders));
//! let state = sub.ready().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod document;
pub mod error;
pub mod migrations;
pub mod path;
pub mod permission;
pub mod policy;
pub mod pool;
pub mod query;
pub mod store;
pub mod subscription;
pub mod writes;

// =============================================================================
// Re-exports
// =============================================================================

pub use batch::{WriteBatch, WriteOp};
pub use document::{to_fields, Document, FieldValue, Fields};
pub use error::{StoreError, StoreResult};
pub use path::{CollectionPath, DocPath};
pub use permission::{ErrorChannel, ErrorListener, ErrorReporting, PermissionError};
pub use policy::{AccessPolicy, AccessRequest, AllowAll, AuthContext, Operation, OwnerOrAdmin, SignedIn};
pub use pool::StoreConfig;
pub use query::{Direction, Query};
pub use store::{ChangeEvent, ChangeKind, DocumentStore, StatsSnapshot};
pub use subscription::{
    watch_collection, watch_doc, CollectionSubscription, DocSubscription, QueryState,
    Subscription, TypedDoc, TypedQuery, Watchable,
};
pub use writes::{NonBlockingWriter, SetOptions, WriteTicket};
