//! Error types for the Shopdesk client layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback text shown when the server did not provide a usable message.
pub const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong";

/// A shared error type for the entire Shopdesk client.
///
/// The type is `Clone` because a single in-flight query result is broadcast
/// to every caller that awaited it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShopdeskError {
    /// The remote API answered 401. Fatal to the session, never retried.
    #[error("Unauthorized: the session is no longer valid")]
    Unauthorized,

    /// Any other non-success HTTP status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// Client-side input failed validation and never reached the network.
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    /// The in-memory transition happened but the durable write failed.
    #[error("Persistence degraded: {0}")]
    PersistenceDegraded(String),

    /// Durable storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopdeskError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Api error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Validation error for a single form field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// True for failures that terminate the authenticated session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// True for failures scoped to a single query or mutation.
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Network(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Text suitable for a toast: the server message when there is one,
    /// the generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Validation { message, .. } => message.clone(),
            _ => FALLBACK_ERROR_MESSAGE.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ShopdeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for ShopdeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ShopdeskError>`.
pub type Result<T> = std::result::Result<T, ShopdeskError>;
