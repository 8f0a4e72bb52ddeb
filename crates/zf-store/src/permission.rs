//! # Permission Error Channel
//!
//! Subscriptions and non-blocking writes never hand store failures back to
//! their caller. They describe the failure as a [`PermissionError`] and
//! publish it on an [`ErrorChannel`] that was injected when the data layer
//! was built. One [`ErrorListener`] per process decides what to do with it.
//!
//! ```text
//!   Subscription ──┐
//!                  ├──► ErrorChannel (broadcast) ──► ErrorListener::run()
//!   NonBlocking  ──┘                                   │
//!   writer                                 ┌───────────┴───────────┐
//!                                      Production             Development
//!                                    log, keep going     return Err(first error)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::policy::Operation;

/// Environment variable selecting the reporting mode.
pub const ENV_VAR: &str = "ZF_ENV";

const CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Permission Error
// =============================================================================

/// A structured description of a failed read or write.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{message} ({operation} on {path})")]
pub struct PermissionError {
    pub operation: Operation,
    /// Document or collection path.
    pub path: String,
    pub timestamp: DateTime<Utc>,
    /// Fields the failed write tried to store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// The underlying store error.
    pub message: String,
}

impl PermissionError {
    pub fn new(operation: Operation, path: impl Into<String>, message: impl Into<String>) -> Self {
        PermissionError {
            operation,
            path: path.into(),
            timestamp: Utc::now(),
            payload: None,
            message: message.into(),
        }
    }

    /// Describes a store failure.
    pub fn from_store(operation: Operation, path: impl Into<String>, err: &StoreError) -> Self {
        PermissionError::new(operation, path, err.to_string())
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

// =============================================================================
// Error Channel
// =============================================================================

/// Cloneable sink for [`PermissionError`]s.
#[derive(Debug, Clone)]
pub struct ErrorChannel {
    tx: broadcast::Sender<PermissionError>,
}

impl ErrorChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        ErrorChannel { tx }
    }

    /// Publishes an error. Never fails: without listeners it is only logged.
    pub fn publish(&self, err: PermissionError) {
        warn!(
            operation = %err.operation,
            path = %err.path,
            message = %err.message,
            "Store request failed"
        );
        let _ = self.tx.send(err);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PermissionError> {
        self.tx.subscribe()
    }

    /// A listener attached to this channel.
    pub fn listener(&self, reporting: ErrorReporting) -> ErrorListener {
        ErrorListener {
            rx: self.subscribe(),
            reporting,
        }
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        ErrorChannel::new()
    }
}

// =============================================================================
// Error Listener
// =============================================================================

/// How the listener surfaces errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReporting {
    /// Stop at the first error and hand it to whoever awaits the listener.
    Development,
    /// Log every error and keep listening.
    Production,
}

impl ErrorReporting {
    /// Reads `ZF_ENV`; `production` selects Production, anything else
    /// Development.
    pub fn from_env() -> Self {
        ErrorReporting::from_env_value(std::env::var(ENV_VAR).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => ErrorReporting::Production,
            _ => ErrorReporting::Development,
        }
    }
}

/// Consumes the error channel.
#[derive(Debug)]
pub struct ErrorListener {
    rx: broadcast::Receiver<PermissionError>,
    reporting: ErrorReporting,
}

impl ErrorListener {
    /// Runs until the channel closes (`Ok`) or, in development, until the
    /// first error arrives (`Err`).
    pub async fn run(mut self) -> Result<(), PermissionError> {
        info!(reporting = ?self.reporting, "Error listener started");
        loop {
            match self.rx.recv().await {
                Ok(err) => match self.reporting {
                    ErrorReporting::Production => {
                        error!(
                            operation = %err.operation,
                            path = %err.path,
                            timestamp = %err.timestamp,
                            message = %err.message,
                            "Permission error"
                        );
                    }
                    ErrorReporting::Development => return Err(err),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Error listener lagged, errors dropped");
                }
                Err(RecvError::Closed) => {
                    info!("Error channel closed");
                    return Ok(());
                }
            }
        }
    }

    /// Runs the listener on its own task.
    pub fn spawn(self) -> JoinHandle<Result<(), PermissionError>> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn denied(path: &str) -> PermissionError {
        PermissionError::new(Operation::Update, path, "Missing or insufficient permissions")
    }

    #[test]
    fn test_from_store_keeps_message() {
        let err = StoreError::PermissionDenied {
            operation: Operation::List,
            path: "orders".to_string(),
        };
        let perm = PermissionError::from_store(Operation::List, "orders", &err);
        assert_eq!(perm.message, err.to_string());
        assert!(perm.to_string().contains("list on orders"));
    }

    #[test]
    fn test_serializes_payload() {
        let perm = denied("orders/o1").with_payload(json!({ "status": "Shipped" }));
        let value = serde_json::to_value(&perm).unwrap();
        assert_eq!(value["operation"], "update");
        assert_eq!(value["path"], "orders/o1");
        assert_eq!(value["payload"]["status"], "Shipped");
    }

    #[test]
    fn test_reporting_from_env_value() {
        assert_eq!(
            ErrorReporting::from_env_value(Some("production")),
            ErrorReporting::Production
        );
        assert_eq!(
            ErrorReporting::from_env_value(Some(" PRODUCTION ")),
            ErrorReporting::Production
        );
        assert_eq!(
            ErrorReporting::from_env_value(Some("staging")),
            ErrorReporting::Development
        );
        assert_eq!(ErrorReporting::from_env_value(None), ErrorReporting::Development);
    }

    #[test]
    fn test_publish_without_listeners_is_fine() {
        ErrorChannel::new().publish(denied("orders/o1"));
    }

    #[tokio::test]
    async fn test_development_listener_returns_first_error() {
        let channel = ErrorChannel::new();
        let handle = channel.listener(ErrorReporting::Development).spawn();

        channel.publish(denied("orders/o1"));
        channel.publish(denied("orders/o2"));

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.path, "orders/o1");
    }

    #[tokio::test]
    async fn test_production_listener_keeps_going_until_closed() {
        let channel = ErrorChannel::new();
        let listener = channel.listener(ErrorReporting::Production);

        channel.publish(denied("orders/o1"));
        channel.publish(denied("orders/o2"));
        drop(channel);

        assert_eq!(listener.run().await, Ok(()));
    }
}
