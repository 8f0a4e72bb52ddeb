//! # Live Subscriptions
//!
//! A subscription turns a query or document reference into a value that
//! always holds the last snapshot the store delivered.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Subscription::new(store, errors, Some(target))                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  state = { data: empty, loading: true, error: None }                   │
//! │  spawn listener ─────────────────────────────────────────┐             │
//! │                                                          ▼             │
//! │                          ┌──► fetch snapshot ──ok──► state = { data,   │
//! │                          │         │                  loading: false } │
//! │                          │        err                        │         │
//! │                          │         ▼                         ▼         │
//! │                          │   PermissionError ──► ErrorChannel          │
//! │                          │   state.error = Some, listener stops        │
//! │                          │   (a document that fails to decode does     │
//! │                          │    not stop it; see below)                  │
//! │                          │                                             │
//! │                          └── relevant ChangeEvent (or lag) ◄───────────┤
//! │                                                                         │
//! │  set_reference(other) ──► abort listener, reset, spawn a new one       │
//! │  drop(subscription)   ──► abort listener                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `None` reference is a valid state: nothing is fetched, nothing is
//! spawned, and the state is immediately `{ empty, loading: false }`.
//!
//! Each snapshot replaces `data` wholesale. Listeners subscribe to the change
//! feed before their first fetch, so no commit between the two is missed.
//!
//! ## Undecodable Documents
//! Documents are schemaless, so a stored document may not fit `T`. A
//! collection snapshot skips such documents with a warning. A document
//! subscription reports the decode error in its state and keeps listening,
//! so the next write to the document is picked up.
//!
//! ## Generations
//! Every attach bumps a generation counter and the listener it spawns only
//! writes while its generation is current. An aborted listener that was
//! already past its fetch can therefore never overwrite the new target's
//! state.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::path::DocPath;
use crate::permission::{ErrorChannel, PermissionError};
use crate::policy::Operation;
use crate::query::Query;
use crate::store::{ChangeEvent, DocumentStore};

// =============================================================================
// State
// =============================================================================

/// What a consumer sees.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: T,
    /// True until the first snapshot (or error) arrives.
    pub loading: bool,
    pub error: Option<PermissionError>,
}

impl<T> QueryState<T> {
    fn idle(data: T) -> Self {
        QueryState {
            data,
            loading: false,
            error: None,
        }
    }

    fn loading(data: T) -> Self {
        QueryState {
            data,
            loading: true,
            error: None,
        }
    }

    fn failed(data: T, error: PermissionError) -> Self {
        QueryState {
            data,
            loading: false,
            error: Some(error),
        }
    }
}

// =============================================================================
// Watchable Targets
// =============================================================================

/// Something a subscription can follow.
#[async_trait]
pub trait Watchable: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Identity: a subscription only re-subscribes when this changes.
    fn key(&self) -> String;

    /// Path reported in permission errors.
    fn path(&self) -> String;

    fn operation(&self) -> Operation;

    /// Value while loading or without a reference.
    fn empty() -> Self::Output;

    /// Whether a committed write may change the snapshot.
    fn affected_by(&self, event: &ChangeEvent) -> bool;

    async fn fetch(&self, store: &DocumentStore) -> StoreResult<Self::Output>;
}

/// A query decoded into `Vec<T>`.
pub struct TypedQuery<T> {
    query: Query,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedQuery<T> {
    pub fn new(query: Query) -> Self {
        TypedQuery {
            query,
            _marker: PhantomData,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

impl<T> Clone for TypedQuery<T> {
    fn clone(&self) -> Self {
        TypedQuery::new(self.query.clone())
    }
}

impl<T> fmt::Debug for TypedQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedQuery").field(&self.query.key()).finish()
    }
}

#[async_trait]
impl<T> Watchable for TypedQuery<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Output = Vec<T>;

    fn key(&self) -> String {
        self.query.key()
    }

    fn path(&self) -> String {
        self.query.collection.to_string()
    }

    fn operation(&self) -> Operation {
        Operation::List
    }

    fn empty() -> Vec<T> {
        Vec::new()
    }

    fn affected_by(&self, event: &ChangeEvent) -> bool {
        event.path.parent() == self.query.collection
    }

    async fn fetch(&self, store: &DocumentStore) -> StoreResult<Vec<T>> {
        let docs = store.run_query(&self.query).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode() {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(path = %doc.path, error = %err, "Skipping undecodable document");
                    None
                }
            })
            .collect())
    }
}

/// A single document decoded into `Option<T>`.
pub struct TypedDoc<T> {
    path: DocPath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedDoc<T> {
    pub fn new(path: DocPath) -> Self {
        TypedDoc {
            path,
            _marker: PhantomData,
        }
    }

    pub fn doc_path(&self) -> &DocPath {
        &self.path
    }
}

impl<T> Clone for TypedDoc<T> {
    fn clone(&self) -> Self {
        TypedDoc::new(self.path.clone())
    }
}

impl<T> fmt::Debug for TypedDoc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedDoc").field(&self.path.as_str()).finish()
    }
}

#[async_trait]
impl<T> Watchable for TypedDoc<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Output = Option<T>;

    fn key(&self) -> String {
        self.path.to_string()
    }

    fn path(&self) -> String {
        self.path.to_string()
    }

    fn operation(&self) -> Operation {
        Operation::Get
    }

    fn empty() -> Option<T> {
        None
    }

    fn affected_by(&self, event: &ChangeEvent) -> bool {
        event.path == self.path
    }

    async fn fetch(&self, store: &DocumentStore) -> StoreResult<Option<T>> {
        store.get(&self.path).await?.map(|doc| doc.decode()).transpose()
    }
}

// =============================================================================
// State Slot
// =============================================================================

/// The state channel plus the generation of the listener allowed to write it.
struct StateSlot<T> {
    tx: watch::Sender<QueryState<T>>,
    generation: AtomicU64,
}

impl<T> StateSlot<T> {
    fn new(initial: QueryState<T>) -> (Self, watch::Receiver<QueryState<T>>) {
        let (tx, rx) = watch::channel(initial);
        let slot = StateSlot {
            tx,
            generation: AtomicU64::new(0),
        };
        (slot, rx)
    }

    /// Retires every earlier listener and returns the new generation.
    fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Replaces the state unless a newer listener took over.
    fn publish(&self, generation: u64, next: QueryState<T>) -> bool {
        self.tx.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            *state = next;
            true
        })
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Live view of one [`Watchable`] target.
pub struct Subscription<W: Watchable> {
    store: DocumentStore,
    errors: ErrorChannel,
    key: Option<String>,
    state: Arc<StateSlot<W::Output>>,
    rx: watch::Receiver<QueryState<W::Output>>,
    task: Option<JoinHandle<()>>,
}

/// Live collection query.
pub type CollectionSubscription<T> = Subscription<TypedQuery<T>>;

/// Live single document.
pub type DocSubscription<T> = Subscription<TypedDoc<T>>;

impl<W: Watchable> Subscription<W> {
    /// Starts following `target`. Must be called inside a Tokio runtime when
    /// `target` is `Some`.
    pub fn new(store: DocumentStore, errors: ErrorChannel, target: Option<W>) -> Self {
        let (slot, rx) = StateSlot::new(QueryState::idle(W::empty()));
        let mut subscription = Subscription {
            store,
            errors,
            key: None,
            state: Arc::new(slot),
            rx,
            task: None,
        };
        subscription.attach(target);
        subscription
    }

    /// Follows another target. Does nothing when the identity is unchanged.
    pub fn set_reference(&mut self, target: Option<W>) {
        let next_key = target.as_ref().map(Watchable::key);
        if next_key == self.key {
            return;
        }
        self.detach();
        self.attach(target);
    }

    fn attach(&mut self, target: Option<W>) {
        self.key = target.as_ref().map(Watchable::key);
        let generation = self.state.advance();
        match target {
            None => {
                self.state.tx.send_replace(QueryState::idle(W::empty()));
            }
            Some(target) => {
                debug!(key = %target.key(), generation, "Subscribing");
                self.state.tx.send_replace(QueryState::loading(W::empty()));
                self.task = Some(tokio::spawn(listen(
                    target,
                    self.store.clone(),
                    self.errors.clone(),
                    Arc::clone(&self.state),
                    generation,
                )));
            }
        }
    }

    fn detach(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Identity of the current target.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Latest state.
    pub fn current(&self) -> QueryState<W::Output> {
        self.rx.borrow().clone()
    }

    pub fn data(&self) -> W::Output {
        self.rx.borrow().data.clone()
    }

    pub fn loading(&self) -> bool {
        self.rx.borrow().loading
    }

    /// Waits for the next state change. `None` once the subscription can no
    /// longer change.
    pub async fn changed(&mut self) -> Option<QueryState<W::Output>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the state is no longer loading.
    pub async fn ready(&self) -> QueryState<W::Output> {
        let mut rx = self.state.tx.subscribe();
        let settled = rx.wait_for(|state| !state.loading).await.map(|state| state.clone());
        match settled {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }

    /// A fresh receiver for consumers that hold their own handle.
    pub fn watch(&self) -> watch::Receiver<QueryState<W::Output>> {
        self.state.tx.subscribe()
    }

    /// The states as a stream, starting with the current one.
    pub fn stream(&self) -> WatchStream<QueryState<W::Output>> {
        WatchStream::new(self.watch())
    }

    /// Whether a listener task is attached and still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }
}

impl<W: Watchable> Drop for Subscription<W> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<W: Watchable> fmt::Debug for Subscription<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("loading", &self.rx.borrow().loading)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Subscribes to a collection query; `None` yields an idle, empty state.
pub fn watch_collection<T>(
    store: &DocumentStore,
    errors: &ErrorChannel,
    query: Option<Query>,
) -> CollectionSubscription<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    Subscription::new(store.clone(), errors.clone(), query.map(TypedQuery::new))
}

/// Subscribes to one document; `None` yields an idle, `None` state.
pub fn watch_doc<T>(
    store: &DocumentStore,
    errors: &ErrorChannel,
    path: Option<DocPath>,
) -> DocSubscription<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    Subscription::new(store.clone(), errors.clone(), path.map(TypedDoc::new))
}

// =============================================================================
// Listener Task
// =============================================================================

async fn listen<W: Watchable>(
    target: W,
    store: DocumentStore,
    errors: ErrorChannel,
    state: Arc<StateSlot<W::Output>>,
    generation: u64,
) {
    let mut changes = store.changes();

    loop {
        let fetched = target.fetch(&store).await;
        if !state.is_current(generation) {
            return;
        }
        match fetched {
            Ok(data) => {
                state.publish(generation, QueryState::idle(data));
            }
            Err(err) => {
                let perm = PermissionError::from_store(target.operation(), target.path(), &err);
                errors.publish(perm.clone());
                state.publish(generation, QueryState::failed(W::empty(), perm));
                // A bad document heals on its next write; anything else is final
                if !matches!(err, StoreError::Serialization(_)) {
                    return;
                }
            }
        }

        loop {
            match changes.recv().await {
                Ok(event) if target.affected_by(&event) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(key = %target.key(), skipped, "Subscription lagged, refetching");
                    break;
                }
                Err(RecvError::Closed) => return,
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
