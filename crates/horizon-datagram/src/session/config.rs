//! Configuration types for datagram sessions.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

use super::encoding::TextEncoding;
use crate::Result;
use crate::error::SessionError;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// Configuration for a datagram session.
///
/// `local_port` is required when loading from TOML; every other field takes
/// its default when unset:
///
/// ```toml
/// local_port = 5000
/// remote_address = "127.0.0.1"
/// remote_port = 5001
/// encoding = "utf-8"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The address to bind to.
    ///
    /// The IPv4 wildcard `0.0.0.0` is bound as `::` when the remote address
    /// is IPv6.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// The local port to bind to. Use 0 for an OS-assigned port.
    pub local_port: u16,
    /// Address of the remote endpoint.
    #[serde(default = "default_remote_address")]
    pub remote_address: IpAddr,
    /// Port of the remote endpoint. `None` means the bound local port.
    #[serde(default)]
    pub remote_port: Option<u16>,
    /// Encoding for string payloads.
    #[serde(default)]
    pub encoding: TextEncoding,
    /// Receive buffer size in bytes.
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
    /// Enable broadcast mode.
    #[serde(default)]
    pub broadcast: bool,
}

const IPV4_WILDCARD: &str = "0.0.0.0";
const IPV6_WILDCARD: &str = "::";

fn default_bind_address() -> String {
    IPV4_WILDCARD.into()
}

fn default_remote_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_recv_buffer_size() -> usize {
    65535
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            local_port: 0,
            remote_address: default_remote_address(),
            remote_port: None,
            encoding: TextEncoding::default(),
            recv_buffer_size: default_recv_buffer_size(),
            broadcast: false,
        }
    }
}

impl SessionConfig {
    /// Create a configuration bound to any address on the given local port.
    pub fn new(local_port: u16) -> Self {
        Self {
            local_port,
            ..Default::default()
        }
    }

    /// Create a configuration from an IP literal for the remote endpoint.
    ///
    /// IPv6 literals are accepted; the default bind address then resolves
    /// to the IPv6 wildcard. Fails with an argument error if `remote_ip` is
    /// not a valid address.
    pub fn with_remote_str(
        local_port: u16,
        remote_ip: &str,
        remote_port: Option<u16>,
    ) -> Result<Self> {
        let address: IpAddr = remote_ip.trim().parse().map_err(|_| {
            SessionError::InvalidArgument(format!("'{remote_ip}' is not an IP address"))
        })?;
        let config = Self::new(local_port).remote_address(address);
        Ok(match remote_port {
            Some(port) => config.remote_port(port),
            None => config,
        })
    }

    /// Load a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the address to bind to.
    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Set the remote address.
    ///
    /// An IPv6 address moves the default `0.0.0.0` bind to `::`.
    pub fn remote_address(mut self, address: IpAddr) -> Self {
        self.remote_address = address;
        self
    }

    /// Set the remote port.
    pub fn remote_port(mut self, port: u16) -> Self {
        self.remote_port = Some(port);
        self
    }

    /// Set the remote address and port together.
    pub fn remote(self, remote: SocketAddr) -> Self {
        self.remote_address(remote.ip()).remote_port(remote.port())
    }

    /// Set the text encoding.
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Enable broadcast mode.
    pub fn broadcast(mut self, enabled: bool) -> Self {
        self.broadcast = enabled;
        self
    }

    /// Get the bind address string (address:port).
    pub fn bind_addr(&self) -> String {
        let address = self.resolved_bind_address();
        if address.contains(':') {
            format!("[{}]:{}", address, self.local_port)
        } else {
            format!("{}:{}", address, self.local_port)
        }
    }

    /// The address actually bound: the IPv4 wildcard follows an IPv6 remote.
    pub(crate) fn resolved_bind_address(&self) -> &str {
        if self.bind_address == IPV4_WILDCARD && self.remote_address.is_ipv6() {
            IPV6_WILDCARD
        } else {
            &self.bind_address
        }
    }

    /// Resolve the remote endpoint once the local port is known.
    pub(crate) fn resolve_remote(&self, bound_port: u16) -> Result<SocketAddr> {
        match self.remote_port.unwrap_or(bound_port) {
            0 => Err(SessionError::InvalidArgument(
                "remote port must not be 0".into(),
            )),
            port => Ok(SocketAddr::new(self.remote_address, port)),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.remote_port == Some(0) {
            return Err(SessionError::InvalidArgument(
                "remote port must not be 0".into(),
            ));
        }
        if self.recv_buffer_size == 0 {
            return Err(SessionError::InvalidArgument(
                "receive buffer size must not be 0".into(),
            ));
        }
        Ok(())
    }
}

/// A received datagram with its source address.
#[derive(Clone, Debug)]
pub struct Datagram {
    /// The datagram payload.
    pub data: Vec<u8>,
    /// The source address of the datagram.
    pub source: SocketAddr,
}

impl Datagram {
    /// Create a new datagram.
    pub fn new(data: Vec<u8>, source: SocketAddr) -> Self {
        Self { data, source }
    }
}
