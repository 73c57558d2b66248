//! State enumeration for datagram sessions.

/// State of a datagram session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The session holds a bound socket and is ready for I/O.
    #[default]
    Bound,
    /// The socket is being replaced.
    Reconnecting,
    /// The last rebind failed; the session holds no socket.
    Unbound,
    /// The session has been disposed.
    Disposed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Bound => write!(f, "Bound"),
            SessionState::Reconnecting => write!(f, "Reconnecting"),
            SessionState::Unbound => write!(f, "Unbound"),
            SessionState::Disposed => write!(f, "Disposed"),
        }
    }
}
