//! Error types for kusina-core

use thiserror::Error;

/// Main error type for the kusina-core library
#[derive(Error, Debug)]
pub enum Error {
    /// No active session
    #[error("not authenticated: sign in with `kusina login`")]
    NotAuthenticated,

    /// Signed in, but the account may not use the dashboard
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Document store request failed (network, HTTP status, malformed response)
    #[error("store error: {0}")]
    Store(String),

    /// Document store rejected the credentials or rules denied access
    #[error("permission denied: {0}")]
    Permission(String),

    /// A record is missing a field that downstream computation needs
    #[error("{collection}/{id} is missing required field `{field}`")]
    MissingField {
        collection: String,
        id: String,
        field: String,
    },

    /// A record field is present but has the wrong shape
    #[error("{collection}/{id} has invalid field `{field}`: {message}")]
    InvalidField {
        collection: String,
        id: String,
        field: String,
        message: String,
    },

    /// Document not found
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// Object storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Auth API error
    #[error("auth error: {0}")]
    Auth(String),

    /// Rejected input (form fields, uploads, periods)
    #[error("invalid input: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn missing(collection: &str, id: &str, field: &str) -> Self {
        Error::MissingField {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(collection: &str, id: &str, field: &str, message: impl Into<String>) -> Self {
        Error::InvalidField {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for kusina-core
pub type Result<T> = std::result::Result<T, Error>;
