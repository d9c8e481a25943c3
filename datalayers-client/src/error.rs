//! Error types for the Datalayers client.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tonic::{Code, Status};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client.
///
/// Every variant carries the underlying cause. Nothing is retried
/// internally; callers decide what to do with each category.
#[derive(Debug, Error)]
pub enum Error {
    /// Channel or credential setup failed. The client must be recreated.
    #[error("failed to connect: {0}")]
    Connection(String),

    /// The server rejected the credentials. The client must be recreated.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The statement failed server-side or the round trip failed.
    #[error("failed to execute: {0}")]
    Exec(String),

    /// The per-call deadline expired before the server answered.
    #[error("deadline exceeded after {timeout:?}: {cause}")]
    DeadlineExceeded { timeout: Duration, cause: String },

    /// Streaming the result set failed after execution succeeded.
    #[error("failed to fetch results: {0}")]
    Fetch(String),

    /// The prepared statement handle was already closed.
    #[error("prepared statement {0} is closed")]
    UseAfterClose(String),

    /// A result column has no local decoding rule.
    #[error("unsupported column type: {0}")]
    UnsupportedType(arrow_schema::DataType),

    /// The server reply violates the Flight SQL protocol.
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    /// Local Arrow error while building or decoding a batch.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

impl Error {
    /// Returns true for the errors that leave the session unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Auth(_))
    }

    /// The local timer fired before the call completed.
    pub(crate) fn elapsed(timeout: Duration) -> Self {
        Error::DeadlineExceeded {
            timeout,
            cause: LOCAL_DEADLINE.to_string(),
        }
    }

    /// The server gave up on the call under its `grpc-timeout`.
    pub(crate) fn deadline(timeout: Duration, status: Status) -> Self {
        Error::DeadlineExceeded {
            timeout,
            cause: filter_message(status.message()),
        }
    }

    /// Maps a failed handshake.
    pub(crate) fn auth(status: Status) -> Self {
        match status.code() {
            Code::Unavailable => Error::Connection(filter_message(status.message())),
            _ => Error::Auth(filter_message(status.message())),
        }
    }

    /// Maps a failed execution round trip.
    pub(crate) fn exec(status: Status) -> Self {
        Error::Exec(filter_message(status.message()))
    }

    /// Maps a failed `DoGet` stream.
    pub(crate) fn fetch(status: Status) -> Self {
        Error::Fetch(filter_message(status.message()))
    }
}

const LOCAL_DEADLINE: &str = "client deadline elapsed";

/// Strips the debug envelope Datalayers wraps around server-side errors,
/// keeping only the `message` field.
///
/// Messages without an envelope are returned with line breaks flattened.
pub fn filter_message(err: &str) -> String {
    static ENVELOPE: OnceLock<Option<Regex>> = OnceLock::new();
    let envelope = ENVELOPE
        .get_or_init(|| Regex::new(r#"message: "(.*?)(?: at src/dbserver/src.*?)?""#).ok());

    let flattened = err
        .replace(['\n', '\r'], " ")
        .replace("\\\"", "[ESCAPED_QUOTE]");
    let Some(regex) = envelope else {
        return flattened.replace("[ESCAPED_QUOTE]", "\\\"");
    };
    match regex.captures(&flattened) {
        Some(capture) => capture[1]
            .replace("[ESCAPED_QUOTE]", "\\\"")
            .replace('\\', ""),
        None => flattened.replace("[ESCAPED_QUOTE]", "\\\""),
    }
}
