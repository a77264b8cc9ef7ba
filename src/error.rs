//! Error types for the LearnLog client

use std::time::Duration;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error types
///
/// Every failure the HTTP adapter can produce is lifted into one of these
/// variants. Non-2xx responses keep the server's `detail` field as text so
/// the submission pipeline can classify it later.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Transport failure (connection refused, DNS, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    ///
    /// `detail` holds the body's `detail` field: verbatim when it was a
    /// string, JSON-encoded when it was an object or array, `None` when the
    /// body carried no usable detail.
    #[error("Server error {status}: {}", detail.as_deref().unwrap_or("<no detail>"))]
    Api { status: u16, detail: Option<String> },

    /// 2xx response whose body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The server accepted a write (2xx) but its response could not be decoded
    #[error("Write accepted but response unreadable: {0}")]
    SavedUnreadable(String),

    /// The provider identity lacks what the backend needs to sync it
    #[error("Provider identity is incomplete: {0}")]
    IncompleteIdentity(String),

    /// No backend user id is available for this session
    #[error("Backend user identity is not available")]
    IdentityUnavailable,

    /// Operation did not finish within the configured window
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local preference store error
    #[error("Preference store error: {0}")]
    Preferences(String),
}

impl ClientError {
    /// The raw message the server attached to this error, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a server rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Preferences(err.to_string())
    }
}
