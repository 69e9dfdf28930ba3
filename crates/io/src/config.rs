//! Configuration for a [`crate::udp::UdpInterface`].

use std::net::{Ipv6Addr, SocketAddr};

use crate::error::SocketConfigError;

/// Configuration for a UDP-backed [`crate::interface::NetworkInterface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Local address to bind to. Defaults to `[::]:0` (any interface,
    /// OS-assigned port, IPv6 - which also accepts IPv4 on most platforms
    /// via dual-stack sockets).
    pub bind_addr: SocketAddr,
    /// Prefixed onto every outgoing packet and checked (and discarded on
    /// mismatch) on every incoming one, so unrelated UDP traffic landing on
    /// the same port never reaches the protocol layer above.
    pub protocol_id: u64,
    /// Largest payload (after the protocol id prefix) this interface will
    /// send or accept. Default `10 * 1024`.
    pub max_packet_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
            protocol_id: 0x0001_2345,
            max_packet_size: 10 * 1024,
        }
    }
}

impl SocketConfig {
    /// Validates size fields.
    pub fn validate(&self) -> Result<(), SocketConfigError> {
        if self.max_packet_size == 0 {
            return Err(SocketConfigError::MustBePositive {
                field: "max_packet_size",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SocketConfig::default().validate().is_ok());
    }
}
