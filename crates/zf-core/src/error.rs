//! # Error Types
//!
//! Domain-specific error types for zf-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  zf-core (this file)                                                   │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Form input failures (shown inline on fields)   │
//! │                                                                         │
//! │  zf-store                                                              │
//! │  ├── StoreError       - Document store failures                        │
//! │  └── PermissionError  - Routed to the error channel, never thrown      │
//! │                                                                         │
//! │  zf-flows                                                              │
//! │  └── FlowError        - Model / storage / configuration failures       │
//! │                                                                         │
//! │  zf-services                                                           │
//! │  └── ServiceError     - What provider callers see                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Order is not in the last received snapshot.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Customer is not in the last received snapshot.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Status change that the order workflow does not allow.
    ///
    /// ## When This Occurs
    /// - Moving a cancelled order anywhere
    /// - Moving a shipped order anywhere
    /// - Moving a completed order to anything except Shipped
    #[error("Cannot move order {order_id} from {from} to {to}")]
    InvalidStatusTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Each variant names the offending field so the form can attach the
/// message to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (phone, email, colour code...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g. duplicate category name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Two fields disagree (e.g. prepaid above total).
    #[error("{field} {reason}")]
    Inconsistent { field: String, reason: String },
}

impl ValidationError {
    /// Returns the name of the field this error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Duplicate { field, .. }
            | ValidationError::Inconsistent { field, .. } => field,
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message() {
        let err = CoreError::InvalidStatusTransition {
            order_id: "abc".to_string(),
            from: OrderStatus::Cancelled,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "Cannot move order abc from Cancelled to Pending");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customerName".to_string(),
        };
        assert_eq!(err.to_string(), "customerName is required");
        assert_eq!(err.field(), "customerName");

        let err = ValidationError::Inconsistent {
            field: "prepaidAmount".to_string(),
            reason: "cannot exceed incomeAmount".to_string(),
        };
        assert_eq!(err.to_string(), "prepaidAmount cannot exceed incomeAmount");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
