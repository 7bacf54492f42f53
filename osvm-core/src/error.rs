//! Error types shared across the osvm workspace.

use thiserror::Error;

/// Errors that can occur while talking to the control plane.
///
/// Lower-level components return these typed outcomes rather than panicking;
/// the orchestrator decides which of them are fatal to a whole run.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input or missing prerequisite, detected before any network call.
    #[error("{0}")]
    Precondition(String),

    /// The backend answered with a non-success status code.
    #[error("request failed [{status}]: {message}")]
    Api { status: u16, message: String },

    /// A polled resource reported an explicit error status. Never retried.
    #[error("{resource} entered error state: {detail}")]
    ResourceError { resource: String, detail: String },

    /// A bounded wait ran out of attempts.
    #[error("timeout waiting for {what} (last status: {last_status})")]
    Timeout { what: String, last_status: String },

    /// A locally retried operation failed again after its single fallback.
    #[error("{operation} failed after retry: {detail}")]
    RetryExhausted { operation: String, detail: String },

    /// Refused to upload a zero-byte source.
    #[error("refusing to upload empty source (size=0)")]
    EmptyUpload,

    /// The upload transport returned a non-success status.
    #[error("upload failed [{status}]: {body}")]
    UploadFailed { status: u16, body: String },

    /// No cached token for the host, or the cached token is expired.
    #[error("no valid auth token for host '{host}'; authenticate first")]
    TokenInvalid { host: String },

    /// A compensating cleanup step failed after the main operation finished.
    #[error("{context}: {detail}")]
    Cleanup { context: String, detail: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_yaml_ng::Error> for Error {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
