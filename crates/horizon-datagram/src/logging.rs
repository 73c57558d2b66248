//! Target names for log filtering.
//!
//! The crate logs through `tracing`; install a subscriber in the application
//! to see the output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_datagram=debug")
//!     .init();
//! ```

/// Target names for use with `tracing` directives.
pub mod targets {
    /// Session lifecycle: bind, reconnect, dispose.
    pub const SESSION: &str = "horizon_datagram::session";
    /// Datagram traffic.
    pub const IO: &str = "horizon_datagram::io";
}
