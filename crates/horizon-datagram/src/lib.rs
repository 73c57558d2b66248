//! String-oriented UDP sessions for Horizon applications.
//!
//! A [`DatagramSession`] owns one UDP socket bound to a local port and
//! exchanges text messages with a fixed remote endpoint, one datagram per
//! message. Operations can be bounded by a [`Timeout`] and a
//! `tokio_util::sync::CancellationToken`; when either fires, the socket is
//! replaced so the session stays usable for the next call.
//!
//! ```ignore
//! use horizon_datagram::{DatagramSession, SessionConfig, Timeout};
//! use tokio_util::sync::CancellationToken;
//!
//! let a = DatagramSession::bind(SessionConfig::new(5000).remote_port(5001)).await?;
//! let b = DatagramSession::bind(SessionConfig::new(5001).remote_port(5000)).await?;
//!
//! a.send("ping").await?;
//! assert_eq!(b.receive().await?, "ping");
//!
//! let token = CancellationToken::new();
//! let err = b.receive_with(&token, Timeout::from_millis(50)).await.unwrap_err();
//! assert!(err.is_timeout());
//! ```
//!
//! # Errors
//!
//! Every operation returns [`SessionError`]; use
//! [`is_timeout`](SessionError::is_timeout),
//! [`is_cancelled`](SessionError::is_cancelled) and
//! [`is_disposed`](SessionError::is_disposed) to pick a corrective action.
//!
//! # Logging
//!
//! The crate logs through `tracing` under the targets in
//! [`logging::targets`].

mod error;
pub mod logging;
pub mod session;

pub use error::{Result, SessionError};

// Re-export commonly used types at the crate root
pub use session::{
    Datagram, DatagramSession, MAX_DATAGRAM_PAYLOAD, SessionConfig, SessionState, TextEncoding,
    Timeout,
};
