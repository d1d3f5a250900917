//! Error types for the HTTP client layer.
//!
//! # Design
//! Every failure the client can produce is a distinct `Error` variant so
//! callers can match on "retryable vs. permanent" without looking at
//! messages. Any status >= 400 becomes `Error::Http` carrying the raw status
//! and body. Network-level failures have no status and land in
//! `Error::Transport`. The retry orchestrator wraps its last transient
//! failure in `RetriesExhausted`.

use thiserror::Error;

use crate::context::ContextError;

pub type Result<T> = std::result::Result<T, Error>;

/// A response whose status code was >= 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {status} {status_text}: {body}")]
pub struct HttpError {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpError {
    /// 4xx: the request itself was rejected.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Errors returned by `HttpClient` and the retry orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be built or the network call failed.
    #[error("transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The response body could not be decoded into the requested type.
    #[error("failed to decode response body: {0}")]
    Decoding(#[source] serde_json::Error),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Cancelled(#[from] ContextError),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        Error::Transport {
            message: message.into(),
            source,
        }
    }

    /// The structured HTTP error, looking through `RetriesExhausted`.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            Error::Http(e) => Some(e),
            Error::RetriesExhausted { last, .. } => last.http_error(),
            _ => None,
        }
    }

    pub fn is_http_error(&self) -> bool {
        self.http_error().is_some()
    }

    /// A 4xx response. Retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_client_error())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Whether `err` is, or wraps, a structured HTTP error.
pub fn is_http_error(err: &Error) -> bool {
    err.is_http_error()
}

/// Extract the structured HTTP error from `err`, if it carries one.
pub fn extract_http_error(err: &Error) -> Option<&HttpError> {
    err.http_error()
}
