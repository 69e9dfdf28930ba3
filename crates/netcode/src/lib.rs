#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! Reliable-ordered messaging over UDP, with large block transfer.
//!
//! This crate is a thin facade over two lower-level crates:
//!
//! - [`netcode_protocol`] — the transport-agnostic core: bit-level
//!   serialization, sequence buffers, reliable message channels, and the
//!   [`Connection`](netcode_protocol::connection::Connection) that
//!   multiplexes them over a single acked packet stream.
//! - [`netcode_io`] (behind the `udp` feature, enabled by default) — a
//!   [`NetworkInterface`](netcode_io::NetworkInterface) implementation over
//!   `std::net::UdpSocket`.
//!
//! A typical application loop looks like:
//!
//! ```no_run
//! # use netcode_protocol::{config::ConnectionConfig, connection::Connection, message::MessageFactory};
//! # use netcode_io::{config::SocketConfig, udp::UdpInterface, interface::NetworkInterface};
//! # fn now() -> f64 { 0.0 }
//! # fn run() -> anyhow::Result<()> {
//! let config = ConnectionConfig::default();
//! let factories = config.channels.iter().map(|c| MessageFactory::new(c.max_message_kind)).collect();
//! let mut connection = Connection::new(config, factories)?;
//! let mut socket = UdpInterface::bind(SocketConfig::default())?;
//! let peer = "127.0.0.1:4000".parse().unwrap();
//!
//! loop {
//!     let time = now();
//!     socket.update(time);
//!
//!     let packet = connection.write_packet(time);
//!     let mut buffer = vec![0u8; socket.max_packet_size()];
//!     let len = connection.serialize_packet(&packet, &mut buffer);
//!     buffer.truncate(len);
//!     socket.send_packet(peer, buffer.into())?;
//!
//!     while let Some((_from, payload)) = socket.receive_packet() {
//!         if let Some(packet) = connection.deserialize_packet(&payload) {
//!             connection.read_packet(packet);
//!         }
//!     }
//!
//!     while let Some(_message) = connection.receive_message(0) {
//!         // handle delivered message
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Nothing in this crate drives that loop for you - see [`5. CONCURRENCY &
//! RESOURCE MODEL`] of the design notes for why: the core is single-threaded
//! cooperative, with every tick driven explicitly by the caller's own
//! timebase, so it behaves identically whether that timebase is a real clock
//! or a test's synthetic one.

pub use netcode_protocol as protocol;

#[cfg(feature = "udp")]
#[cfg_attr(docsrs, doc(cfg(feature = "udp")))]
pub use netcode_io as io;

pub use bytes;

/// Builds a [`Connection`](protocol::connection::Connection) and a bound
/// [`UdpInterface`](netcode_io::udp::UdpInterface) from the given configs,
/// one [`MessageFactory`](protocol::message::MessageFactory) per channel.
///
/// This is construction-time convenience only - once built, drive the
/// connection and socket yourself as shown in the module documentation.
/// Folding a typed [`ConfigError`](protocol::error::ConfigError) and a typed
/// [`SocketError`](netcode_io::error::SocketError) into one `anyhow::Result`
/// is fine here because nothing downstream needs to match on which one
/// failed; that's not true on the hot path, where each stays its own enum.
#[cfg(feature = "udp")]
#[cfg_attr(docsrs, doc(cfg(feature = "udp")))]
pub fn connect(
    config: protocol::config::ConnectionConfig,
    socket_config: netcode_io::config::SocketConfig,
) -> anyhow::Result<(protocol::connection::Connection, netcode_io::udp::UdpInterface)> {
    let factories = config
        .channels
        .iter()
        .map(|c| protocol::message::MessageFactory::new(c.max_message_kind))
        .collect();
    let connection = protocol::connection::Connection::new(config, factories)?;
    let socket = netcode_io::udp::UdpInterface::bind(socket_config)?;
    Ok((connection, socket))
}
