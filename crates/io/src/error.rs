//! Error taxonomy for the UDP network interface.

use std::io;

use derive_more::{Display, Error};

/// Failure modes a [`crate::udp::UdpInterface`] can report.
#[derive(Debug, Display, Error)]
pub enum SocketError {
    /// Binding the underlying UDP socket failed.
    #[display("failed to bind udp socket: {_0}")]
    Bind(io::Error),
    /// `send_to` failed for a reason other than the peer simply not being
    /// ready (that case is handled internally, not surfaced as an error).
    #[display("failed to send packet: {_0}")]
    Send(io::Error),
    /// `recv_from` failed for a reason other than "nothing to read yet".
    #[display("failed to receive packet: {_0}")]
    Receive(io::Error),
    /// The caller tried to send a payload bigger than this interface's
    /// configured `max_packet_size`.
    #[display("packet of {len} bytes exceeds max_packet_size of {max}")]
    PacketTooLarge {
        /// Size of the rejected payload.
        len: usize,
        /// This interface's configured ceiling.
        max: usize,
    },
}

/// Construction-time configuration mistakes for a socket interface.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum SocketConfigError {
    /// A size field that must be positive was zero.
    #[display("{field} must be greater than zero")]
    MustBePositive {
        /// Name of the offending field.
        field: &'static str,
    },
}
