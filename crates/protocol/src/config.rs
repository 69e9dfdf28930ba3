//! Layered configuration: plain data with documented defaults, validated
//! once at construction time rather than checked ad-hoc on every call.

use crate::error::ConfigError;

/// Configuration for a single [`crate::channel::ReliableMessageChannel`].
///
/// All fields default to the values given in the component design; override
/// only what your application needs, then call [`ChannelConfig::validate`]
/// (done automatically by
/// [`crate::channel::ReliableMessageChannel::new`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Minimum spacing, in seconds, before re-sending an unacked message or
    /// fragment. Default `0.1`.
    pub resend_rate_millis: u32,
    /// Capacity of the message send queue. Default `1024`.
    pub send_queue_size: usize,
    /// Capacity of the message receive queue. Default `256`.
    pub receive_queue_size: usize,
    /// Capacity of the sent-packet sequence buffer. Default `256`.
    pub sent_packets_size: usize,
    /// Upper cap on messages packed into a single outgoing packet. Default
    /// `32`.
    pub max_messages_per_packet: usize,
    /// Measured serialized size limit for a single non-block message, in
    /// bytes. Default `64`.
    pub max_message_size: usize,
    /// Blocks up to this size, in bytes, are carried inline as a small-block
    /// message. Default `64`.
    pub max_small_block_size: usize,
    /// Blocks larger than `max_small_block_size`, in bytes, are fragmented.
    /// Default `256 * 1024`.
    pub max_large_block_size: usize,
    /// Fragment payload size, in bytes, for large blocks. Default `64`.
    pub block_fragment_size: usize,
    /// Max bytes this channel may contribute to a single packet. Default
    /// `128`.
    pub packet_budget: usize,
    /// Stop trying to pack more messages once the remaining bit budget falls
    /// below this. Default `64`.
    pub give_up_bits: usize,
    /// If `true`, byte-align between messages to aid compressibility, at the
    /// cost of up to ~14 bits of overhead per message. Default `false`.
    pub align: bool,
    /// Highest application-defined message kind this channel will carry.
    /// Default `31`.
    pub max_message_kind: u16,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            resend_rate_millis: 100,
            send_queue_size: 1024,
            receive_queue_size: 256,
            sent_packets_size: 256,
            max_messages_per_packet: 32,
            max_message_size: 64,
            max_small_block_size: 64,
            max_large_block_size: 256 * 1024,
            block_fragment_size: 64,
            packet_budget: 128,
            give_up_bits: 64,
            align: false,
            max_message_kind: 31,
        }
    }
}

impl ChannelConfig {
    /// Minimum resend spacing as seconds.
    #[must_use]
    pub fn resend_rate(&self) -> f64 {
        f64::from(self.resend_rate_millis) / 1000.0
    }

    /// Number of fragments a block of `max_large_block_size` splits into.
    #[must_use]
    pub fn max_fragments_per_block(&self) -> usize {
        self.max_large_block_size.div_ceil(self.block_fragment_size)
    }

    /// Validates field relationships that the scheduler and wire layout
    /// assume hold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_small_block_size >= self.max_large_block_size {
            return Err(ConfigError::SmallBlockNotSmallerThanLarge {
                small: self.max_small_block_size,
                large: self.max_large_block_size,
            });
        }
        for (field, value) in [
            ("send_queue_size", self.send_queue_size),
            ("receive_queue_size", self.receive_queue_size),
            ("sent_packets_size", self.sent_packets_size),
            ("max_messages_per_packet", self.max_messages_per_packet),
            ("block_fragment_size", self.block_fragment_size),
            ("packet_budget", self.packet_budget),
        ] {
            if value == 0 {
                return Err(ConfigError::MustBePositive { field });
            }
        }
        Ok(())
    }
}

/// Configuration for a [`crate::connection::Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Capacity of the sent/received packet sequence buffers. Default
    /// `256`.
    pub sliding_window_size: usize,
    /// Upper bound, in bytes, on a single outgoing packet - the shared
    /// budget [`crate::connection::Connection::write_packet`] apportions
    /// across channels. Default `1200` (safely under common path MTUs).
    pub max_packet_size: usize,
    /// Per-channel configuration, one entry per logical channel
    /// multiplexed over this connection.
    pub channels: Vec<ChannelConfig>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            sliding_window_size: 256,
            max_packet_size: 1200,
            channels: vec![ChannelConfig::default()],
        }
    }
}

impl ConnectionConfig {
    /// Validates the sliding window size and every channel's configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sliding_window_size == 0 {
            return Err(ConfigError::MustBePositive {
                field: "sliding_window_size",
            });
        }
        if self.max_packet_size == 0 {
            return Err(ConfigError::MustBePositive {
                field: "max_packet_size",
            });
        }
        for channel in &self.channels {
            channel.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ChannelConfig::default().validate().is_ok());
        assert!(ConnectionConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_block_thresholds() {
        let cfg = ChannelConfig {
            max_small_block_size: 1000,
            max_large_block_size: 500,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
