//! Error types for the feed client and store.
//!
//! # Design
//! `NotFound` keeps its own variant because the store treats "the post is
//! gone" differently from other server failures. Every other non-2xx response
//! becomes `Server` carrying the server's message when the body has one.
//! `Invalid` is raised locally, before any request is built.

use thiserror::Error;

/// Message recorded when neither the server nor the transport said anything useful.
pub const GENERIC_FAILURE: &str = "something went wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    /// A local precondition failed; no request was sent.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// No response was received.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// The text stored in a snapshot's `error` field.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Invalid(msg) => msg.clone(),
            ApiError::NotFound => "not found".to_string(),
            ApiError::Transport(_) => "network request failed".to_string(),
            ApiError::Deserialization(_) | ApiError::Serialization(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

/// The request never produced a response.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    BadValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_shows_server_message() {
        let err = ApiError::Server {
            status: 400,
            message: "content too long".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 400: content too long");
        assert_eq!(err.user_message(), "content too long");
    }

    #[test]
    fn transport_error_hides_details_from_users() {
        let err = ApiError::from(TransportError("connection refused".to_string()));
        assert_eq!(err.to_string(), "transport failed: connection refused");
        assert_eq!(err.user_message(), "network request failed");
    }
}
