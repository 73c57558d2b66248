//! Error types for datagram sessions.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by a [`DatagramSession`](crate::DatagramSession).
///
/// Each variant implies a different corrective action for the caller:
/// retry with a new timeout, stop calling, rebuild the session, or fix the
/// input.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A caller-supplied argument was rejected before any I/O took place.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The session was disposed before or during the call.
    #[error("Session has been disposed")]
    Disposed,

    /// The session holds no socket because a previous rebind failed.
    #[error("Session socket is not bound")]
    NotBound,

    /// The operation's timer elapsed first. The socket has already been
    /// replaced, so the session is usable again.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired. Carries the token that
    /// triggered it.
    #[error("Operation was cancelled")]
    Cancelled(CancellationToken),

    /// Loading a configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other failure from the underlying socket, passed through as is.
    #[error("UDP socket error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Check if the error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Check if the error reports use after disposal.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// Check if the error is an argument error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// The token that cancelled the operation, if this is a cancellation.
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        match self {
            Self::Cancelled(token) => Some(token),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A specialized Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
