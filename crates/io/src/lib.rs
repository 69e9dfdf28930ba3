//! UDP transport binding for `netcode`.
//!
//! This crate has no knowledge of the reliable-ordered protocol itself - it
//! only gets framed, protocol-id-tagged datagrams on and off the wire. See
//! [`interface::NetworkInterface`] for the seam, and [`udp::UdpInterface`]
//! for the concrete `std::net::UdpSocket` implementation.

pub mod config;
pub mod error;
pub mod interface;
pub mod udp;

pub use interface::NetworkInterface;
pub use udp::UdpInterface;
