//! [`UdpInterface`]: a [`crate::interface::NetworkInterface`] over
//! `std::net::UdpSocket`.

use std::{
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{config::SocketConfig, error::SocketError, interface::NetworkInterface};

/// Counters kept for diagnostics; not used for any protocol decision.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SocketCounters {
    /// Datagrams accepted and handed to the caller.
    pub packets_received: u64,
    /// Datagrams sent successfully.
    pub packets_sent: u64,
    /// Datagrams discarded because their protocol id prefix did not match.
    pub packets_wrong_protocol: u64,
    /// Datagrams discarded because they were too short to contain a
    /// protocol id prefix.
    pub packets_too_short: u64,
    /// Outgoing packets rejected for exceeding `max_packet_size`.
    pub packet_too_large_to_send: u64,
    /// `send_to`/`recv_from` calls that failed for a reason other than
    /// "nothing to do yet".
    pub send_failures: u64,
}

/// A non-blocking UDP socket that prefixes every datagram with a protocol
/// id, silently discarding anything on the wire that doesn't carry a
/// matching prefix.
///
/// The prefix guards against unrelated traffic landing on the same port (a
/// port scanner, a stale peer from a previous protocol version) being
/// mistaken for a connection packet. Supports both IPv4 and IPv6 - which
/// socket family is used follows directly from `config.bind_addr`.
#[derive(Debug)]
pub struct UdpInterface {
    socket: UdpSocket,
    config: SocketConfig,
    counters: SocketCounters,
}

impl UdpInterface {
    /// Binds a non-blocking UDP socket per `config`.
    pub fn bind(config: SocketConfig) -> Result<Self, SocketError> {
        config.validate().map_err(|_| {
            SocketError::Bind(std::io::Error::new(
                ErrorKind::InvalidInput,
                "invalid socket configuration",
            ))
        })?;

        let socket = UdpSocket::bind(config.bind_addr).map_err(SocketError::Bind)?;
        socket.set_nonblocking(true).map_err(SocketError::Bind)?;

        debug!(addr = %config.bind_addr, protocol_id = config.protocol_id, "udp interface bound");

        Ok(Self {
            socket,
            config,
            counters: SocketCounters::default(),
        })
    }

    /// The address this socket actually bound to (useful when `bind_addr`
    /// requested an OS-assigned port).
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.socket.local_addr().map_err(SocketError::Receive)
    }

    /// Traffic counters accumulated so far.
    #[must_use]
    pub fn counters(&self) -> SocketCounters {
        self.counters
    }
}

impl NetworkInterface for UdpInterface {
    fn send_packet(&mut self, address: SocketAddr, packet: Bytes) -> Result<(), SocketError> {
        if packet.len() > self.config.max_packet_size {
            self.counters.packet_too_large_to_send += 1;
            return Err(SocketError::PacketTooLarge {
                len: packet.len(),
                max: self.config.max_packet_size,
            });
        }

        let mut framed = Vec::with_capacity(8 + packet.len());
        framed.extend_from_slice(&self.config.protocol_id.to_be_bytes());
        framed.extend_from_slice(&packet);

        match self.socket.send_to(&framed, address) {
            Ok(_) => {
                self.counters.packets_sent += 1;
                trace!(%address, bytes = packet.len(), "sent packet");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => {
                self.counters.send_failures += 1;
                Err(SocketError::Send(e))
            }
        }
    }

    fn receive_packet(&mut self) -> Option<(SocketAddr, Bytes)> {
        let mut framed = vec![0u8; 8 + self.config.max_packet_size];
        loop {
            let (len, addr) = match self.socket.recv_from(&mut framed) {
                Ok(result) => result,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return None,
                Err(e) => {
                    warn!(error = %e, "udp receive failed");
                    return None;
                }
            };

            if len < 8 {
                self.counters.packets_too_short += 1;
                continue;
            }

            let protocol_id = u64::from_be_bytes(framed[0..8].try_into().unwrap());
            if protocol_id != self.config.protocol_id {
                self.counters.packets_wrong_protocol += 1;
                continue;
            }

            self.counters.packets_received += 1;
            let payload = Bytes::copy_from_slice(&framed[8..len]);
            trace!(%addr, bytes = payload.len(), "received packet");
            return Some((addr, payload));
        }
    }

    fn update(&mut self, _time: f64) {}

    fn max_packet_size(&self) -> usize {
        self.config.max_packet_size
    }
}
