//! Error types for the fieldkey crates.
//!
//! The session layer distinguishes transient transport failures from
//! authorization rejections, malformed responses and storage failures. The
//! public session operations collapse these to booleans, but the variants are
//! kept explicit so internal code and logs can tell them apart.

use std::fmt;
use thiserror::Error;

/// The unified error type for fieldkey operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (blank credentials, dead refresh token).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (non-success status, unexpected body).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Session store failures.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Error {
    /// True if the backend answered 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Protocol(e) if e.is_unauthorized())
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The request or response body could not be read.
    #[error("body error: {message}")]
    Body { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            TransportError::Body {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password was empty.
    #[error("username and password are required")]
    BlankCredentials,

    /// No refresh token is available in memory or in the store.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The backend rejected the refresh token.
    #[error("refresh token invalid")]
    RefreshTokenInvalid,
}

/// Protocol-level errors from identity backend responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error message from the server, if one could be read.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// Check if the server answered 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API origin URL.
    #[error("invalid API origin '{value}': {reason}")]
    ApiOrigin { value: String, reason: String },

    /// A token could not be encoded as a header value.
    #[error("invalid header value: {reason}")]
    HeaderValue { reason: String },
}

/// Session store failures.
///
/// These never leave the session manager; they are logged and the in-memory
/// session stays authoritative.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The platform secret store refused the operation.
    #[error("backend error: {message}")]
    Backend { message: String },
}
