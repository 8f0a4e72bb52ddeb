//! # Application Context
//!
//! One `AppContext` is built at start-up and handed to every provider. It
//! replaces module-level cached handles: the store, the error channel, the
//! non-blocking writer and the signed-in session all travel together.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AppContext                                     │
//! │                                                                         │
//! │   DocumentStore ──(with_auth(session))──► scoped store handle          │
//! │        │                                        │                       │
//! │        │                                        ├──► subscriptions      │
//! │        │                                        └──► NonBlockingWriter  │
//! │        │                                                  │             │
//! │   ErrorChannel ◄───────── failed writes / snapshots ──────┘             │
//! │        │                                                                │
//! │        └──► ErrorListener (dev: panic in its own task, prod: log)       │
//! │                                                                         │
//! │   Session { uid, role }  (None until someone signs in)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Signing in or out does not mutate the context; it produces a new one via
//! [`AppContext::with_session`] sharing the same database and change feed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;
use zf_core::UserRole;
use zf_store::{
    AuthContext, CollectionPath, DocPath, DocumentStore, ErrorChannel, ErrorReporting,
    NonBlockingWriter, OwnerOrAdmin, PermissionError, StoreConfig,
};

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Collection Names
// =============================================================================

pub const ORDERS: &str = "orders";
pub const CUSTOMERS: &str = "customers";
pub const PRODUCTS: &str = "products";
pub const USERS: &str = "users";
pub const NOTIFICATIONS: &str = "notifications";

// =============================================================================
// Session
// =============================================================================

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub role: UserRole,
}

impl Session {
    pub fn new(uid: impl Into<String>, role: UserRole) -> Self {
        Session {
            uid: uid.into(),
            role,
        }
    }

    /// What the store's access policy sees.
    pub fn auth(&self) -> AuthContext {
        if self.role.is_admin() {
            AuthContext::admin(&self.uid)
        } else {
            AuthContext::user(&self.uid)
        }
    }
}

// =============================================================================
// Context
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppContext {
    store: DocumentStore,
    errors: ErrorChannel,
    writer: NonBlockingWriter,
    session: Option<Session>,
}

impl AppContext {
    /// Wraps an open store. The store handle is re-scoped to `session`.
    pub fn new(store: DocumentStore, errors: ErrorChannel, session: Option<Session>) -> Self {
        let auth = session.as_ref().map(Session::auth).unwrap_or_default();
        let store = store.with_auth(auth);
        let writer = NonBlockingWriter::new(store.clone(), errors.clone());
        AppContext {
            store,
            errors,
            writer,
            session,
        }
    }

    /// Opens the database with the production access rules and no session.
    ///
    /// ## Errors
    /// `Store` if the database cannot be opened or migrated.
    pub async fn open(config: StoreConfig) -> ServiceResult<Self> {
        let store = DocumentStore::open(config)
            .await?
            .with_policy(Arc::new(OwnerOrAdmin));
        info!("Application context ready");
        Ok(AppContext::new(store, ErrorChannel::new(), None))
    }

    /// The same database and error channel acting as another session.
    pub fn with_session(&self, session: Option<Session>) -> Self {
        AppContext::new(self.store.clone(), self.errors.clone(), session)
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    pub fn writer(&self) -> &NonBlockingWriter {
        &self.writer
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// ## Errors
    /// `Unauthenticated` when nobody is signed in.
    pub fn require_session(&self) -> ServiceResult<&Session> {
        self.session.as_ref().ok_or(ServiceError::Unauthenticated)
    }

    /// Starts the listener that surfaces routed permission errors.
    pub fn spawn_error_listener(
        &self,
        reporting: ErrorReporting,
    ) -> JoinHandle<Result<(), PermissionError>> {
        self.errors.listener(reporting).spawn()
    }
}

pub(crate) fn collection(name: &str) -> ServiceResult<CollectionPath> {
    Ok(CollectionPath::new(name)?)
}

pub(crate) fn doc(collection_name: &str, id: &str) -> ServiceResult<DocPath> {
    Ok(CollectionPath::new(collection_name)?.doc(id)?)
}

/// `users/{uid}/notifications`.
pub(crate) fn notifications_of(uid: &str) -> ServiceResult<CollectionPath> {
    Ok(doc(USERS, uid)?.collection(NOTIFICATIONS)?)
}
