//! Query errors and the provider error classifier
//!
//! Every adapter operation reports failures as a [`QueryError`] carrying
//! one of four kinds. Provider failures are mapped through
//! [`QueryError::from_provider`]; no retries happen here.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Scope unparseable or outside the adapter's configured set
    NoScope,
    /// The provider reported the resource as missing
    NotFound,
    /// The provider rejected the credentials or the caller lacks IAM rights
    PermissionDenied,
    /// Projection failure, malformed identity, transport or any other fault
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NoScope => "NOSCOPE",
            ErrorKind::NotFound => "NOTFOUND",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// Error returned or streamed by adapter operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct QueryError {
    pub kind: ErrorKind,
    pub message: String,
}

impl QueryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoScope, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    pub fn cancelled() -> Self {
        Self::other("query cancelled")
    }

    /// Classify a provider failure
    pub fn from_provider(error: &ProviderError) -> Self {
        match error {
            ProviderError::Status { code: 404, message } => Self::not_found(message.clone()),
            ProviderError::Status {
                code: 401 | 403,
                message,
            } => Self::permission_denied(message.clone()),
            ProviderError::Status { code, message } => {
                Self::other(format!("{} ({}): {}", describe_status(*code), code, message))
            }
            ProviderError::Transport(msg) => Self::other(format!("transport error: {}", msg)),
            ProviderError::Decode(msg) => Self::other(format!("invalid response: {}", msg)),
            ProviderError::Unsupported(msg) => Self::other(msg.clone()),
        }
    }
}

impl From<ProviderError> for QueryError {
    fn from(error: ProviderError) -> Self {
        Self::from_provider(&error)
    }
}

/// Failure reported by a provider client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The API answered with a non-success status
    #[error("API request failed with status {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never got a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The client does not implement the requested operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl ProviderError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }
}

/// Short user-facing description of an HTTP status returned by a GCP API
/// Security: generic messages avoid leaking API structure details
pub fn describe_status(code: u16) -> &'static str {
    match code {
        400 => "Invalid request. Check your parameters.",
        401 => "Authentication failed. Run 'gcloud auth application-default login'.",
        403 => "Permission denied. Check your GCP IAM permissions.",
        404 => "Resource not found.",
        409 => "Resource conflict.",
        429 => "Rate limit exceeded. Please try again later.",
        500 | 502 | 503 => "GCP service temporarily unavailable. Please try again.",
        _ => "Request failed.",
    }
}

/// Invalid resource definition or adapter configuration, caught at build time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("{item_type}: attribute schema is empty")]
    EmptySchema { item_type: String },

    #[error("{item_type}: attribute '{name}' declared more than once")]
    DuplicateAttribute { item_type: String, name: String },

    #[error("{item_type}: unique attribute '{name}' is not a projected attribute")]
    UniqueAttributeNotProjected { item_type: String, name: String },

    #[error("{item_type}: reference '{path}' is malformed: {reason}")]
    InvalidReference {
        item_type: String,
        path: String,
        reason: String,
    },

    #[error("{item_type}: endpoint '{template}' is malformed: {reason}")]
    InvalidEndpoint {
        item_type: String,
        template: String,
        reason: String,
    },

    #[error("{item_type}: no endpoint serves scope '{scope}'")]
    UnservedScope { item_type: String, scope: String },

    #[error("{item_type}: no scopes configured")]
    NoScopes { item_type: String },
}
