//! Reliable-ordered messaging and large block transfer over an unreliable,
//! out-of-order packet transport.
//!
//! This crate is transport-agnostic: it turns a caller-supplied timebase and
//! raw byte buffers into [`connection::Connection`] state transitions. See
//! `netcode_io` for a UDP socket binding, and `netcode` for the facade that
//! wires the two together.
//!
//! # Layout
//!
//! - [`seq`] / [`seq_buf`] - wraparound-aware sequence comparison and the
//!   sliding-window [`seq_buf::SequenceBuffer`] built on it.
//! - [`bits`] - the bit-level codec ([`bits::BitWriter`],
//!   [`bits::BitReader`], [`bits::MeasureStream`]) every wire type is built
//!   from.
//! - [`block`] / [`message`] - the application-facing payload types.
//! - [`data_block`] - fragmentation and reassembly for blocks too large to
//!   send inline.
//! - [`channel`] - the reliable-ordered message channel, and its wire
//!   payload.
//! - [`packet`] - the outer packet envelope multiplexing channels.
//! - [`connection`] - the top-level driver tying all of the above together.
//! - [`config`] / [`error`] - configuration and the error taxonomy.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bits;
pub mod block;
pub mod channel;
pub mod config;
pub mod connection;
pub mod data_block;
pub mod error;
pub mod message;
pub mod packet;
pub mod seq;
pub mod seq_buf;
