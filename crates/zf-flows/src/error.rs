//! # Flow Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Flow Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Output              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  MissingConfig  │  │  Http           │  │  EmptyResponse          │ │
//! │  │  Config         │  │  Api            │  │  InvalidOutput          │ │
//! │  │                 │  │  Auth           │  │  Validation (input)     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Storage: object storage / Drive failures with the offending key       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate retries. [`FlowError::is_retryable`] only tells the
//! caller whether trying again could help.

use thiserror::Error;

pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Debug, Error)]
pub enum FlowError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// A required setting is absent (named by its environment variable).
    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),

    /// A setting is present but unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Token exchange or request signing failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    // =========================================================================
    // Output Errors
    // =========================================================================
    /// The model returned no text.
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// The model text did not match the expected shape.
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),

    /// The flow input was rejected before calling the model.
    #[error("Invalid input for {field}: {message}")]
    Validation { field: &'static str, message: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Storage operation on '{key}' failed: {message}")]
    Storage { key: String, message: String },
}

impl FlowError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        FlowError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        FlowError::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// True when the operation could succeed if tried again unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Http(_) => true,
            FlowError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// True when fixing configuration is the only remedy.
    pub fn is_config_error(&self) -> bool {
        matches!(self, FlowError::MissingConfig(_) | FlowError::Config(_))
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for FlowError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FlowError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => FlowError::Http(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::InvalidOutput(err.to_string())
    }
}

impl From<url::ParseError> for FlowError {
    fn from(err: url::ParseError) -> Self {
        FlowError::Config(format!("invalid URL: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for FlowError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        FlowError::Auth(err.to_string())
    }
}

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(err: toml::de::Error) -> Self {
        FlowError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(FlowError::Http("reset".into()).is_retryable());
        assert!(FlowError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(FlowError::Api {
            status: 429,
            message: "quota".into()
        }
        .is_retryable());

        assert!(!FlowError::Api {
            status: 400,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!FlowError::EmptyResponse.is_retryable());
        assert!(!FlowError::MissingConfig("GEMINI_API_KEY").is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(FlowError::MissingConfig("S3_BUCKET").is_config_error());
        assert!(FlowError::Config("bad url".into()).is_config_error());
        assert!(!FlowError::EmptyResponse.is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = FlowError::MissingConfig("GEMINI_API_KEY");
        assert_eq!(err.to_string(), "Missing configuration: GEMINI_API_KEY is not set");

        let err = FlowError::storage("a.png", "403 Forbidden");
        assert!(err.to_string().contains("'a.png'"));
    }
}
