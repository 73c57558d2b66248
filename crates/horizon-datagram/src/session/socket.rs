//! Datagram session with cancellation, timeouts and socket replacement.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::config::{Datagram, MAX_DATAGRAM_PAYLOAD, SessionConfig};
use super::encoding::TextEncoding;
use super::interrupt::Interruption;
use super::state::SessionState;
use super::timeout::{PhaseTimer, Timeout};
use crate::Result;
use crate::error::SessionError;
use crate::logging::targets;

/// Internal state for the session.
struct SessionInner {
    state: SessionState,
    socket: Option<Arc<UdpSocket>>,
    local_port: u16,
    encoding: TextEncoding,
}

/// How one bounded transport call ended.
enum Outcome<T> {
    Completed(io::Result<T>),
    Interrupted(Interruption),
    Disposed,
}

/// A string-oriented UDP session bound to a local port.
///
/// Every message is one datagram holding exactly the encoded bytes of the
/// string. The `*_with` operations accept a [`CancellationToken`] and a
/// [`Timeout`]; when either fires first, the pending transport call is
/// abandoned and the socket is replaced by a fresh one on the same local
/// port before the error is returned, so the session stays usable.
///
/// One operation at a time: the session may be shared through an `Arc`
/// (for example to dispose it from another task), but overlapping I/O calls
/// on the same session are not supported.
///
/// # Example
///
/// ```ignore
/// use horizon_datagram::{DatagramSession, SessionConfig, Timeout};
/// use tokio_util::sync::CancellationToken;
///
/// let config = SessionConfig::with_remote_str(5000, "127.0.0.1", Some(5001))?;
/// let session = DatagramSession::bind(config).await?;
///
/// session.send("ping").await?;
///
/// let token = CancellationToken::new();
/// match session.receive_with(&token, Timeout::from_millis(500)).await {
///     Ok(reply) => println!("Received {}", reply),
///     Err(e) if e.is_timeout() => println!("No reply"),
///     Err(e) => return Err(e),
/// }
///
/// session.dispose();
/// ```
pub struct DatagramSession {
    config: SessionConfig,
    remote: SocketAddr,
    inner: Mutex<SessionInner>,
    disposed: AtomicBool,
    closed: CancellationToken,
}

impl DatagramSession {
    /// Bind a new session with the given configuration.
    ///
    /// The socket is bound immediately. A bind failure, such as the port
    /// being in use, is returned as [`SessionError::Io`].
    pub async fn bind(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let (socket, local_port) = open(&config, config.local_port).await?;
        let remote = config.resolve_remote(local_port)?;

        tracing::debug!(
            target: targets::SESSION,
            "Session bound to port {} with remote {}",
            local_port,
            remote
        );

        Ok(Self {
            remote,
            inner: Mutex::new(SessionInner {
                state: SessionState::Bound,
                socket: Some(socket),
                local_port,
                encoding: config.encoding,
            }),
            config,
            disposed: AtomicBool::new(false),
            closed: CancellationToken::new(),
        })
    }

    /// Bind a session on `local_port` that talks to loopback on the same port.
    pub async fn new(local_port: u16) -> Result<Self> {
        Self::bind(SessionConfig::new(local_port)).await
    }

    /// Bind a session on `local_port` that talks to the given remote endpoint.
    ///
    /// `remote_port` defaults to the bound local port.
    pub async fn with_remote(
        local_port: u16,
        remote_address: IpAddr,
        remote_port: Option<u16>,
    ) -> Result<Self> {
        let config = SessionConfig::new(local_port).remote_address(remote_address);
        let config = match remote_port {
            Some(port) => config.remote_port(port),
            None => config,
        };
        Self::bind(config).await
    }

    /// Get the configuration the session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Check if the session has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Check if the session is usable: not disposed and holding a bound socket.
    pub fn is_active(&self) -> bool {
        if self.is_disposed() {
            return false;
        }
        let inner = self.inner.lock();
        inner.state == SessionState::Bound && inner.socket.is_some()
    }

    /// Get the local port the socket is bound to.
    pub fn local_port(&self) -> u16 {
        self.inner.lock().local_port
    }

    /// Get the local socket address, or `None` if no socket is held.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .lock()
            .socket
            .as_ref()
            .and_then(|socket| socket.local_addr().ok())
    }

    /// Get the remote endpoint datagrams are sent to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Get the text encoding.
    pub fn encoding(&self) -> TextEncoding {
        self.inner.lock().encoding
    }

    /// Set the text encoding used by subsequent operations.
    pub fn set_encoding(&self, encoding: TextEncoding) {
        self.inner.lock().encoding = encoding;
    }

    /// Size in bytes of the datagram queued for receipt, or 0 if none is.
    pub fn available(&self) -> Result<usize> {
        let socket = self.socket()?;
        let mut buffer = vec![0u8; self.config.recv_buffer_size];
        match socket.try_peek_from(&mut buffer) {
            Ok((n, _)) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Send a message to the remote endpoint.
    ///
    /// Returns the number of bytes sent.
    pub async fn send(&self, message: &str) -> Result<usize> {
        self.ensure_open()?;
        let payload = self.encode(message)?;
        let mut timer = PhaseTimer::start(Timeout::INFINITE);
        self.send_payload(payload, None, &mut timer).await
    }

    /// Send a message, bounded by a cancellation token and a timeout.
    pub async fn send_with(
        &self,
        message: &str,
        cancel: &CancellationToken,
        timeout: impl Into<Timeout>,
    ) -> Result<usize> {
        self.ensure_open()?;
        let payload = self.encode(message)?;
        ensure_not_cancelled(cancel)?;
        let mut timer = PhaseTimer::start(timeout.into());
        self.send_payload(payload, Some(cancel), &mut timer).await
    }

    /// Send raw bytes to the remote endpoint.
    pub async fn send_bytes(&self, data: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        check_payload_len(data.len())?;
        let mut timer = PhaseTimer::start(Timeout::INFINITE);
        self.send_payload(data.to_vec(), None, &mut timer).await
    }

    /// Send raw bytes, bounded by a cancellation token and a timeout.
    pub async fn send_bytes_with(
        &self,
        data: &[u8],
        cancel: &CancellationToken,
        timeout: impl Into<Timeout>,
    ) -> Result<usize> {
        self.ensure_open()?;
        check_payload_len(data.len())?;
        ensure_not_cancelled(cancel)?;
        let mut timer = PhaseTimer::start(timeout.into());
        self.send_payload(data.to_vec(), Some(cancel), &mut timer)
            .await
    }

    /// Wait for one datagram and decode it.
    pub async fn receive(&self) -> Result<String> {
        let datagram = self.receive_datagram().await?;
        Ok(self.encoding().decode(&datagram.data))
    }

    /// Wait for one datagram, bounded by a cancellation token and a timeout.
    pub async fn receive_with(
        &self,
        cancel: &CancellationToken,
        timeout: impl Into<Timeout>,
    ) -> Result<String> {
        let datagram = self.receive_datagram_with(cancel, timeout).await?;
        Ok(self.encoding().decode(&datagram.data))
    }

    /// Wait for one datagram and return it undecoded with its source.
    pub async fn receive_datagram(&self) -> Result<Datagram> {
        self.ensure_open()?;
        let mut timer = PhaseTimer::start(Timeout::INFINITE);
        self.receive_payload(None, &mut timer).await
    }

    /// Like [`receive_datagram`](Self::receive_datagram), bounded by a
    /// cancellation token and a timeout.
    pub async fn receive_datagram_with(
        &self,
        cancel: &CancellationToken,
        timeout: impl Into<Timeout>,
    ) -> Result<Datagram> {
        self.ensure_open()?;
        ensure_not_cancelled(cancel)?;
        let mut timer = PhaseTimer::start(timeout.into());
        self.receive_payload(Some(cancel), &mut timer).await
    }

    /// Send a message and wait for one reply.
    ///
    /// The timeout applies to each phase: the timer is restarted once the
    /// send has completed. Cancellation is checked before each phase.
    pub async fn send_and_receive(
        &self,
        message: &str,
        cancel: &CancellationToken,
        timeout: impl Into<Timeout>,
    ) -> Result<String> {
        self.ensure_open()?;
        let payload = self.encode(message)?;
        ensure_not_cancelled(cancel)?;

        let mut timer = PhaseTimer::start(timeout.into());
        self.send_payload(payload, Some(cancel), &mut timer).await?;

        ensure_not_cancelled(cancel)?;
        timer.restart();
        let reply = self.receive_payload(Some(cancel), &mut timer).await?;
        Ok(self.encoding().decode(&reply.data))
    }

    /// Replace the socket with a new one bound to the current local port.
    pub async fn reconnect(&self) -> Result<()> {
        let port = self.local_port();
        self.reconnect_on(port).await
    }

    /// Replace the socket with a new one bound to `port`.
    ///
    /// The remote endpoint is unchanged. If binding fails the session is
    /// left [`Unbound`](SessionState::Unbound) until a later reconnect
    /// succeeds.
    pub async fn reconnect_on(&self, port: u16) -> Result<()> {
        let previous = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Disposed {
                return Err(SessionError::Disposed);
            }
            inner.state = SessionState::Reconnecting;
            inner.socket.take()
        };
        // The old handle must be closed before its port can be bound again.
        drop(previous);

        let opened = open(&self.config, port).await;

        let mut inner = self.inner.lock();
        if inner.state == SessionState::Disposed {
            return Err(SessionError::Disposed);
        }
        match opened {
            Ok((socket, local_port)) => {
                inner.socket = Some(socket);
                inner.local_port = local_port;
                inner.state = SessionState::Bound;
                tracing::debug!(target: targets::SESSION, "Socket rebound to port {}", local_port);
                Ok(())
            }
            Err(e) => {
                inner.state = SessionState::Unbound;
                tracing::warn!(target: targets::SESSION, "Failed to rebind port {}: {}", port, e);
                Err(e)
            }
        }
    }

    /// Dispose the session, releasing its socket.
    ///
    /// A pending operation fails with [`SessionError::Disposed`]. Calling
    /// this more than once has no further effect.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let socket = {
            let mut inner = self.inner.lock();
            inner.state = SessionState::Disposed;
            inner.socket.take()
        };
        self.closed.cancel();
        drop(socket);

        tracing::debug!(target: targets::SESSION, "Session on port {} disposed", self.local_port());
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_disposed() {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    fn socket(&self) -> Result<Arc<UdpSocket>> {
        let inner = self.inner.lock();
        if inner.state == SessionState::Disposed {
            return Err(SessionError::Disposed);
        }
        inner.socket.clone().ok_or(SessionError::NotBound)
    }

    fn encode(&self, message: &str) -> Result<Vec<u8>> {
        let payload = self.encoding().encode(message);
        check_payload_len(payload.len())?;
        Ok(payload)
    }

    async fn send_payload(
        &self,
        payload: Vec<u8>,
        cancel: Option<&CancellationToken>,
        timer: &mut PhaseTimer,
    ) -> Result<usize> {
        let remote = self.remote;
        let sent = self
            .run_bounded(cancel, timer, move |socket| async move {
                socket.send_to(&payload, remote).await
            })
            .await?;

        tracing::trace!(target: targets::IO, "Sent {} bytes to {}", sent, remote);
        Ok(sent)
    }

    async fn receive_payload(
        &self,
        cancel: Option<&CancellationToken>,
        timer: &mut PhaseTimer,
    ) -> Result<Datagram> {
        let capacity = self.config.recv_buffer_size;
        let datagram = self
            .run_bounded(cancel, timer, move |socket| async move {
                let mut buffer = vec![0u8; capacity];
                let (n, source) = socket.recv_from(&mut buffer).await?;
                buffer.truncate(n);
                Ok(Datagram::new(buffer, source))
            })
            .await?;

        tracing::trace!(
            target: targets::IO,
            "Received {} bytes from {}",
            datagram.data.len(),
            datagram.source
        );
        Ok(datagram)
    }

    /// Race one transport call against disposal, cancellation and the timer.
    ///
    /// On timeout or cancellation the transport future is dropped and the
    /// socket replaced before the error is returned.
    async fn run_bounded<T, F, Fut>(
        &self,
        cancel: Option<&CancellationToken>,
        timer: &mut PhaseTimer,
        op: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<UdpSocket>) -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        let outcome = {
            let transfer = op(self.socket()?);
            let cancelled = async {
                match cancel {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending().await,
                }
            };

            // Order matters: disposal, then cancellation, then the timer.
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => Outcome::Disposed,
                _ = cancelled => Outcome::Interrupted(Interruption::Cancelled),
                _ = timer.elapsed() => Outcome::Interrupted(Interruption::on_timer(
                    cancel.is_some_and(CancellationToken::is_cancelled),
                )),
                result = transfer => Outcome::Completed(result),
            }
        };

        match outcome {
            Outcome::Completed(result) => result.map_err(SessionError::from),
            Outcome::Disposed => Err(SessionError::Disposed),
            Outcome::Interrupted(interruption) => {
                tracing::debug!(
                    target: targets::SESSION,
                    "Operation on port {} {}, replacing socket",
                    self.local_port(),
                    interruption
                );
                self.reconnect().await?;
                Err(match interruption {
                    Interruption::TimedOut => SessionError::Timeout(timer.duration()),
                    Interruption::Cancelled => SessionError::Cancelled(
                        cancel.cloned().unwrap_or_else(CancellationToken::new),
                    ),
                })
            }
        }
    }
}

impl Drop for DatagramSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for DatagramSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramSession")
            .field("bind_addr", &self.config.bind_addr())
            .field("state", &self.state())
            .field("local_port", &self.local_port())
            .field("remote", &self.remote)
            .field("encoding", &self.encoding())
            .finish()
    }
}

/// Bind a socket for `config` on `port`, returning it with its actual port.
async fn open(config: &SessionConfig, port: u16) -> Result<(Arc<UdpSocket>, u16)> {
    let socket = UdpSocket::bind((config.resolved_bind_address(), port)).await?;
    if config.broadcast {
        socket.set_broadcast(true)?;
    }
    let local_port = socket.local_addr()?.port();
    Ok((Arc::new(socket), local_port))
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(SessionError::Cancelled(cancel.clone()))
    } else {
        Ok(())
    }
}

fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_DATAGRAM_PAYLOAD {
        return Err(SessionError::InvalidArgument(format!(
            "payload of {len} bytes exceeds the {MAX_DATAGRAM_PAYLOAD} byte datagram limit"
        )));
    }
    Ok(())
}
