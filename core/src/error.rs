//! Error types for the scenario console client.
//!
//! # Design
//! `ApiError` covers everything a caller of the API layer can observe:
//! business failures carried by the envelope, payload (de)serialization,
//! and transport failures that outlived the retry policy. Transport and
//! router failures have their own enums so each layer stays narrow.

use thiserror::Error;

/// Errors surfaced by request building, envelope parsing and dispatch.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The envelope was present but `code` was not zero, or no envelope
    /// could be found. `message` is the extracted `msg` or a fallback.
    #[error("{message}")]
    Business { message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Every attempt failed before a response was received.
    #[error("no response after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: TransportError,
    },

    /// A transport failure that re-sending cannot fix. Sent once, never
    /// retried.
    #[error("request not sent: {0}")]
    NotRetried(TransportError),

    /// The completion callback was dropped without being invoked.
    #[error("request abandoned before completion")]
    Abandoned,
}

/// A failure to obtain a complete HTTP response.
///
/// A 4xx/5xx status is a response and never maps here. Only failures
/// before the server could have acted on the request are retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("i/o error: {0}")]
    Io(String),

    /// The request could not be constructed, e.g. a malformed URL.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A status line arrived but the body could not be read.
    #[error("incomplete response body: {0}")]
    IncompleteBody(String),
}

impl TransportError {
    /// Whether sending the same request again is safe and could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_) | Self::IncompleteBody(_))
    }
}

/// Navigation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// No route pattern matches the path.
    #[error("no route matches {0}")]
    NotFound(String),

    /// A named location refers to a route that is not in the table.
    #[error("unknown route name {0}")]
    UnknownRouteName(String),
}

/// Configuration loading failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Persistent token storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}
