//! # Service Errors
//!
//! What a provider call can return to its caller.
//!
//! ```text
//! provider call
//!     │
//!     ├── bad input ────────────────► ServiceError::Validation   (inline, per field)
//!     ├── nobody signed in ─────────► ServiceError::Unauthenticated
//!     ├── role not allowed ─────────► ServiceError::Forbidden
//!     ├── id not in snapshot ───────► ServiceError::NotFound
//!     ├── workflow says no ─────────► ServiceError::InvalidTransition
//!     ├── awaited store call ───────► ServiceError::Store
//!     ├── model flow ───────────────► ServiceError::Flow
//!     │
//!     └── non-blocking write fails ─► never here: PermissionError on the ErrorChannel
//! ```

use thiserror::Error;
use zf_core::{CoreError, OrderStatus, ValidationError};
use zf_flows::FlowError;
use zf_store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The id is not in the last received snapshot (or it is still loading).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot move order {order_id} from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Errors the user can fix by editing the form.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_) | ServiceError::InvalidTransition { .. }
        )
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OrderNotFound(id) => ServiceError::not_found("Order", id),
            CoreError::CustomerNotFound(id) => ServiceError::not_found("Customer", id),
            CoreError::InvalidStatusTransition { order_id, from, to } => {
                ServiceError::InvalidTransition { order_id, from, to }
            }
            CoreError::Validation(err) => ServiceError::Validation(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
