//! Error types for authwave.
//!
//! Renewal failures, rejected requests, transport failures, storage failures
//! and input validation failures each get their own variant so callers can
//! branch exhaustively.

use std::fmt;
use thiserror::Error;

/// The unified error type for authwave operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Renewal was needed but no refresh token is stored.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The credential renewal failed; the stored session has been cleared.
    #[error("token refresh failed: {0}")]
    RefreshFailed(RefreshFailedError),

    /// The backend answered with a non-success status.
    #[error("request failed: {0}")]
    RequestFailed(#[from] RequestFailedError),

    /// No usable response was received.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The credential store could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (bad URL, bad header).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestFailed(e) => Some(e.status),
            Error::RefreshFailed(e) => e.status,
            _ => None,
        }
    }

    /// True when the error ended the session (renewal impossible or rejected).
    pub fn is_session_terminated(&self) -> bool {
        matches!(self, Error::NoRefreshToken | Error::RefreshFailed(_))
    }
}

/// The outcome of a failed renewal wave.
///
/// Cloned to every request that waited on the same renewal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewalError {
    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("token refresh failed: {0}")]
    RefreshFailed(RefreshFailedError),
}

impl From<RenewalError> for Error {
    fn from(err: RenewalError) -> Self {
        match err {
            RenewalError::NoRefreshToken => Error::NoRefreshToken,
            RenewalError::RefreshFailed(e) => Error::RefreshFailed(e),
        }
    }
}

/// Details of a rejected renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailedError {
    /// HTTP status of the refresh response, `None` when no response arrived.
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshFailedError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for RefreshFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RefreshFailedError {}

/// A non-success response surfaced to the caller.
#[derive(Debug, Clone)]
pub struct RequestFailedError {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status, if known.
    pub reason: Option<String>,
    /// Response body, when it parsed as JSON.
    pub data: Option<serde_json::Value>,
}

impl RequestFailedError {
    pub fn new(status: u16, reason: Option<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            status,
            reason,
            data,
        }
    }

    /// True for a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl fmt::Display for RequestFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref reason) = self.reason {
            write!(f, " {}", reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestFailedError {}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("could not decode response body: {message}")]
    Decode { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Credential store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt credential file {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid base URL.
    #[error("invalid base URL '{value}': {reason}")]
    BaseUrl { value: String, reason: String },

    /// Header name or value that cannot be sent.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Unknown HTTP method.
    #[error("invalid HTTP method '{value}'")]
    Method { value: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
