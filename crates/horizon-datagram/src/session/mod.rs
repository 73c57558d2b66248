//! String-oriented UDP sessions.
//!
//! This module provides:
//! - **DatagramSession**: send / receive / send-and-receive of strings over UDP
//! - **SessionConfig**: bind, remote endpoint and encoding settings
//! - **Timeout** and cancellation through `tokio_util`'s `CancellationToken`
//!
//! # Example
//!
//! ```ignore
//! use horizon_datagram::session::{DatagramSession, SessionConfig};
//!
//! let config = SessionConfig::new(5000).remote("127.0.0.1:5001".parse()?);
//! let session = DatagramSession::bind(config).await?;
//!
//! let sent = session.send("ping").await?;
//! println!("Sent {} bytes to {}", sent, session.remote_addr());
//! ```
//!
//! # Timeouts and Cancellation
//!
//! ```ignore
//! use horizon_datagram::session::Timeout;
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let reply = session
//!     .send_and_receive("status?", &token, Timeout::from_millis(250))
//!     .await;
//!
//! match reply {
//!     Ok(text) => println!("Peer says {}", text),
//!     Err(e) if e.is_timeout() => println!("Peer did not answer"),
//!     Err(e) if e.is_cancelled() => println!("Stopped by caller"),
//!     Err(e) => return Err(e),
//! }
//!
//! // The socket was replaced after the timeout; the session is still usable.
//! assert!(session.is_active());
//! ```
//!
//! # Loading a Configuration
//!
//! ```ignore
//! let config = SessionConfig::from_toml_str(r#"
//!     local_port = 5000
//!     remote_port = 5001
//!     encoding = "utf-16le"
//! "#)?;
//! ```

mod config;
mod encoding;
mod interrupt;
mod socket;
mod state;
mod timeout;

pub use config::{Datagram, MAX_DATAGRAM_PAYLOAD, SessionConfig};
pub use encoding::TextEncoding;
pub use socket::DatagramSession;
pub use state::SessionState;
pub use timeout::Timeout;
