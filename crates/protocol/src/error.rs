//! Error taxonomy for the protocol core.
//!
//! Per-packet and per-message outcomes stay as `bool`/`Option` returns along
//! the hot path (see the module docs on [`crate::channel`] and
//! [`crate::connection`]) - these types exist for the handful of outcomes
//! that need a caller-visible *reason*, not just a discard.

use derive_more::{Display, Error};

/// Fatal error conditions a [`crate::channel::ReliableMessageChannel`] can
/// raise. Any of these puts the owning [`crate::connection::Connection`]
/// into its error state.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// [`crate::channel::ReliableMessageChannel::send_message`] was called
    /// while the send queue had no free slot for the next message id.
    #[display("send queue is full")]
    SendQueueFull,
    /// An incoming large block advertised a size past this channel's
    /// configured `max_large_block_size`. Non-fatal to the channel: the
    /// packet is discarded rather than the connection latched into error.
    #[display("block size {size} exceeds configured max {max}")]
    BlockTooLarge {
        /// Size the sender advertised.
        size: usize,
        /// This channel's configured ceiling.
        max: usize,
    },
    /// An incoming large-block fragment didn't match the block currently
    /// being assembled (block id/size, fragment count, or fragment id),
    /// or arrived out of range. Non-fatal: the packet is discarded.
    #[display("fragment for block {block_id} did not match the block in progress")]
    FragmentMismatch {
        /// Id of the block the mismatched fragment claimed to belong to.
        block_id: u16,
    },
}

/// Construction-time configuration mistakes, checked once via `validate`
/// rather than discovered mid-connection.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_small_block_size` must be strictly less than `max_large_block_size`.
    #[display(
        "max_small_block_size ({small}) must be less than max_large_block_size ({large})"
    )]
    SmallBlockNotSmallerThanLarge {
        /// Configured small-block threshold.
        small: usize,
        /// Configured large-block ceiling.
        large: usize,
    },
    /// A size/count field that must be positive was zero.
    #[display("{field} must be greater than zero")]
    MustBePositive {
        /// Name of the offending field.
        field: &'static str,
    },
}
