//! Shared fixtures for provider tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use zf_core::{FileRemover, RemoveError, StorageBackend, UserRole};
use zf_flows::{FlowResult, Prompt, TextModel};
use zf_store::{AccessPolicy, DocumentStore, ErrorChannel, QueryState};

use crate::context::{AppContext, Session};

pub async fn context(uid: &str, role: UserRole) -> AppContext {
    let store = DocumentStore::in_memory().await.unwrap();
    AppContext::new(store, ErrorChannel::new(), Some(Session::new(uid, role)))
}

pub async fn context_with_policy(
    uid: &str,
    role: UserRole,
    policy: Arc<dyn AccessPolicy>,
) -> AppContext {
    let store = DocumentStore::in_memory().await.unwrap().with_policy(policy);
    AppContext::new(store, ErrorChannel::new(), Some(Session::new(uid, role)))
}

/// Waits (bounded) for a state matching `pred`.
pub async fn until<T, F>(mut rx: watch::Receiver<QueryState<T>>, pred: F) -> QueryState<T>
where
    T: Clone,
    F: FnMut(&QueryState<T>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async move {
        rx.wait_for(pred).await.map(|state| state.clone())
    })
    .await
    .expect("timed out waiting for snapshot")
    .expect("subscription closed")
}

/// Model that always answers with the same text.
pub struct CannedModel(pub String);

#[async_trait]
impl TextModel for CannedModel {
    async fn generate(&self, _prompt: &Prompt) -> FlowResult<String> {
        Ok(self.0.clone())
    }
}

/// Remover that records keys, or fails every call.
pub struct RecordingRemover {
    pub removed: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingRemover {
    pub fn new(fail: bool) -> Self {
        RecordingRemover {
            removed: Mutex::new(Vec::new()),
            fail,
        }
    }
}

#[async_trait]
impl FileRemover for RecordingRemover {
    fn backend(&self) -> StorageBackend {
        StorageBackend::ObjectStorage
    }

    async fn remove(&self, key: &str) -> Result<(), RemoveError> {
        if self.fail {
            return Err(RemoveError {
                key: key.to_string(),
                message: "bucket unreachable".to_string(),
            });
        }
        self.removed.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
