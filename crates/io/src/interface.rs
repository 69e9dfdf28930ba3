//! [`NetworkInterface`]: the seam between `netcode_protocol` and a real
//! transport.

use std::net::SocketAddr;

use bytes::Bytes;

use crate::error::SocketError;

/// What a connection's transport must provide: best-effort, unordered
/// datagram send/receive with a fixed size ceiling.
///
/// `netcode_protocol` never depends on this trait directly - it only
/// produces and consumes byte buffers. This is the facade crate's seam for
/// plugging a real transport (UDP today; nothing stops an in-memory or
/// lossy-test implementation from existing alongside it).
pub trait NetworkInterface {
    /// Sends `packet` to `address`. A transient failure to enqueue is not
    /// necessarily an error worth tearing down the connection over, so
    /// implementations are free to log and drop rather than propagate.
    fn send_packet(&mut self, address: SocketAddr, packet: Bytes) -> Result<(), SocketError>;

    /// Pulls the next available datagram, or `None` if nothing has arrived.
    /// Must never block.
    fn receive_packet(&mut self) -> Option<(SocketAddr, Bytes)>;

    /// Advances this interface's notion of time, for any internal rate
    /// tracking (e.g. send/receive counters sampled per tick).
    fn update(&mut self, time: f64);

    /// Largest payload this interface will send or accept.
    fn max_packet_size(&self) -> usize;
}
