//! The outer packet envelope: [`ConnectionPacket`].
//!
//! One packet carries the ack/sequence header plus, for each configured
//! channel, an optional [`ChannelData`] payload. Infrequently-changing
//! fields (the ack bitfield) are placed first and a perfect-ack fast path is
//! used whenever possible, both to help an LZ-style compressor sitting
//! underneath this layer.

use crate::{
    bits::{BitReader, BitWriter, MeasureStream},
    channel::ChannelData,
    config::ConnectionConfig,
    message::MessageFactory,
};

/// 32-bit sentinel written at the end of every packet to detect truncation
/// or gross corruption before any other field is trusted.
pub const PACKET_CHECK_VALUE: u32 = 0x5124_6234;

/// Largest ack delta (`sequence - ack`) the short form can express; beyond
/// this the full 16-bit `ack` is written instead.
const MAX_ACK_DELTA: i32 = 128;

/// One connection-level packet: sequence/ack header plus per-channel data.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPacket {
    /// This packet's own sequence number.
    pub sequence: u16,
    /// Newest packet from the peer that this packet acknowledges.
    pub ack: u16,
    /// Bit `i` set means `ack - i` was also received, for `i` in `1..32`.
    pub ack_bits: u32,
    /// Per-channel payload, indexed the same as the connection's channel
    /// list; `None` means that channel had nothing to send this packet.
    pub channel_data: Vec<Option<ChannelData>>,
}

impl ConnectionPacket {
    /// Writes this packet's wire representation, ending with the check
    /// sentinel.
    pub fn serialize_write(&self, writer: &mut BitWriter<'_>, config: &ConnectionConfig) {
        let perfect = self.ack_bits == 0xFFFF_FFFF;
        writer.serialize_bool(perfect);
        if !perfect {
            writer.serialize_bits(self.ack_bits, 32);
        }
        writer.align();

        for data in &self.channel_data {
            writer.serialize_bool(data.is_some());
        }

        writer.serialize_u16(self.sequence);

        let ack_delta = if self.ack <= self.sequence {
            i32::from(self.sequence) - i32::from(self.ack)
        } else {
            i32::from(self.sequence) + 65536 - i32::from(self.ack)
        };
        let ack_in_range = ack_delta > 0 && ack_delta <= MAX_ACK_DELTA;
        writer.serialize_bool(ack_in_range);
        if ack_in_range {
            writer.serialize_integer(ack_delta, 1, MAX_ACK_DELTA);
        } else {
            writer.serialize_bits(u32::from(self.ack), 16);
        }

        for (data, channel_config) in self.channel_data.iter().zip(&config.channels) {
            if let Some(data) = data {
                writer.align();
                data.serialize_write(writer, channel_config);
            }
        }

        writer.check(PACKET_CHECK_VALUE);
    }

    /// Reads a packet previously written by
    /// [`ConnectionPacket::serialize_write`], given the peer's channel
    /// configuration and a factory per channel for reconstructing messages.
    ///
    /// Returns `None` if the trailing check sentinel does not match, or if
    /// any channel payload is malformed - the whole packet is discarded
    /// rather than partially trusted.
    pub fn serialize_read(
        reader: &mut BitReader<'_>,
        config: &ConnectionConfig,
        factories: &[MessageFactory],
    ) -> Option<Self> {
        let perfect = reader.serialize_bool();
        let ack_bits = if perfect {
            0xFFFF_FFFF
        } else {
            reader.serialize_bits(32)
        };
        reader.align();

        let num_channels = config.channels.len();
        let mut has_data = vec![false; num_channels];
        for slot in &mut has_data {
            *slot = reader.serialize_bool();
        }

        let sequence = reader.serialize_u16();

        let ack_in_range = reader.serialize_bool();
        let ack = if ack_in_range {
            let ack_delta = reader.serialize_integer(1, MAX_ACK_DELTA)?;
            sequence.wrapping_sub(ack_delta as u16)
        } else {
            reader.serialize_bits(16) as u16
        };

        let mut channel_data = Vec::with_capacity(num_channels);
        for (i, &present) in has_data.iter().enumerate() {
            if present {
                reader.align();
                let data = ChannelData::serialize_read(reader, &config.channels[i], &factories[i])?;
                channel_data.push(Some(data));
            } else {
                channel_data.push(None);
            }
        }

        if !reader.check(PACKET_CHECK_VALUE) {
            return None;
        }

        Some(Self {
            sequence,
            ack,
            ack_bits,
            channel_data,
        })
    }

    /// Accounts for the bits [`ConnectionPacket::serialize_write`] would
    /// produce for this packet's current contents.
    pub fn measure(&self, measure: &mut MeasureStream, config: &ConnectionConfig) {
        measure.serialize_bool();
        measure.serialize_bits(32);
        measure.align();

        for _ in &self.channel_data {
            measure.serialize_bool();
        }

        measure.serialize_bits(16);
        measure.serialize_bool();
        measure.serialize_bits(16);

        for (data, channel_config) in self.channel_data.iter().zip(&config.channels) {
            if let Some(data) = data {
                measure.align();
                data.measure(measure, channel_config);
            }
        }

        measure.check();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessagePayload;
    use bytes::Bytes;
    use std::sync::Arc;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            sliding_window_size: 256,
            max_packet_size: 1200,
            channels: vec![Default::default()],
        }
    }

    #[test]
    fn perfect_ack_fast_path_round_trips() {
        let cfg = config();
        let packet = ConnectionPacket {
            sequence: 42,
            ack: 41,
            ack_bits: 0xFFFF_FFFF,
            channel_data: vec![None],
        };

        let mut buffer = [0u8; 32];
        {
            let mut w = BitWriter::new(&mut buffer);
            packet.serialize_write(&mut w, &cfg);
            w.flush();
        }

        let factories = vec![MessageFactory::new(31)];
        let mut r = BitReader::new(&buffer);
        let decoded = ConnectionPacket::serialize_read(&mut r, &cfg, &factories).unwrap();
        assert_eq!(decoded.sequence, 42);
        assert_eq!(decoded.ack, 41);
        assert_eq!(decoded.ack_bits, 0xFFFF_FFFF);
        assert!(decoded.channel_data[0].is_none());
    }

    #[test]
    fn ack_far_outside_short_range_uses_full_form() {
        let cfg = config();
        let packet = ConnectionPacket {
            sequence: 1000,
            ack: 100,
            ack_bits: 0x0F0F_0F0F,
            channel_data: vec![None],
        };

        let mut buffer = [0u8; 32];
        {
            let mut w = BitWriter::new(&mut buffer);
            packet.serialize_write(&mut w, &cfg);
            w.flush();
        }

        let factories = vec![MessageFactory::new(31)];
        let mut r = BitReader::new(&buffer);
        let decoded = ConnectionPacket::serialize_read(&mut r, &cfg, &factories).unwrap();
        assert_eq!(decoded.ack, 100);
        assert_eq!(decoded.ack_bits, 0x0F0F_0F0F);
    }

    #[test]
    fn corrupted_check_value_is_rejected() {
        let cfg = config();
        let packet = ConnectionPacket {
            sequence: 1,
            ack: 0,
            ack_bits: 0,
            channel_data: vec![None],
        };
        let mut buffer = [0u8; 32];
        {
            let mut w = BitWriter::new(&mut buffer);
            packet.serialize_write(&mut w, &cfg);
            w.flush();
        }
        buffer[buffer.len() - 1] ^= 0xFF;

        let factories = vec![MessageFactory::new(31)];
        let mut r = BitReader::new(&buffer);
        assert!(ConnectionPacket::serialize_read(&mut r, &cfg, &factories).is_none());
    }

    #[test]
    fn channel_payload_present_flag_round_trips() {
        let cfg = config();
        let factory = MessageFactory::new(31);
        let message = factory.create_app(1, Bytes::from_static(b"x"));
        let mut message = message;
        Arc::get_mut(&mut message).unwrap().set_id(7);

        let packet = ConnectionPacket {
            sequence: 5,
            ack: 4,
            ack_bits: 0b11,
            channel_data: vec![Some(ChannelData::Messages(vec![message]))],
        };

        let mut buffer = [0u8; 64];
        {
            let mut w = BitWriter::new(&mut buffer);
            packet.serialize_write(&mut w, &cfg);
            w.flush();
        }

        let factories = vec![MessageFactory::new(31)];
        let mut r = BitReader::new(&buffer);
        let decoded = ConnectionPacket::serialize_read(&mut r, &cfg, &factories).unwrap();
        match decoded.channel_data[0].as_ref().unwrap() {
            ChannelData::Messages(messages) => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].id(), 7);
                match messages[0].payload() {
                    MessagePayload::App { payload, .. } => assert_eq!(&payload[..], b"x"),
                    MessagePayload::Block(_) => panic!("expected app message"),
                }
            }
            ChannelData::Block { .. } => panic!("expected message batch"),
        }
    }
}
