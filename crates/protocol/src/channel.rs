//! The reliable-ordered message channel: [`ReliableMessageChannel`] and its
//! wire payload, [`ChannelData`].
//!
//! A channel owns three sliding windows (send queue, receive queue, sent-
//! packet history) and, at any moment, is doing exactly one of three things:
//! nothing (nothing unacked), packing small messages into outgoing packets,
//! or driving a single large block through [`crate::data_block`] fragment by
//! fragment. The two sending modes never interleave within one packet - the
//! oldest unacked message decides which mode is active, and a large block
//! blocks every message queued behind it until it is fully acked.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{
    bits::{BitReader, BitWriter, MeasureStream},
    block::Block,
    config::ChannelConfig,
    data_block::{DataBlockError, DataBlockReceiver, DataBlockSender},
    error::{ChannelError, ConfigError},
    message::{Message, MessageFactory, MessagePayload, BLOCK_MESSAGE_KIND},
    seq::less_than,
    seq_buf::SequenceBuffer,
};

/// Per-channel traffic counters, sampled for diagnostics or tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCounters {
    /// Messages accepted by [`ReliableMessageChannel::send_message`].
    pub messages_sent: u64,
    /// Messages (or block fragments) actually placed into an outgoing
    /// packet.
    pub messages_written: u64,
    /// Messages accepted into the receive queue from an incoming packet.
    pub messages_read: u64,
    /// Messages handed to the application via
    /// [`ReliableMessageChannel::receive_message`].
    pub messages_received: u64,
    /// Incoming messages discarded because their id was already consumed.
    pub messages_discarded_late: u64,
    /// Incoming messages discarded because the receive queue had no room.
    pub messages_discarded_early: u64,
}

#[derive(Debug, Clone, Default)]
struct SendQueueEntry {
    message: Option<Arc<Message>>,
    time_last_sent: f64,
    measured_bits: usize,
    large_block: bool,
}

#[derive(Debug, Clone, Default)]
struct ReceiveQueueEntry {
    message: Option<Arc<Message>>,
}

#[derive(Debug, Clone)]
enum SentPacketKind {
    Messages(Vec<u16>),
    BlockFragment { block_id: u16, fragment_id: u16 },
}

impl Default for SentPacketKind {
    fn default() -> Self {
        Self::Messages(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
struct SentPacketEntry {
    time_sent: f64,
    kind: SentPacketKind,
}

/// The per-packet payload a [`ReliableMessageChannel`] contributes: either a
/// batch of whole messages, or a single large-block fragment.
///
/// These two shapes are mutually exclusive within one packet - see the
/// module documentation.
#[derive(Debug, Clone)]
pub enum ChannelData {
    /// A batch of small messages (and/or small blocks), each carried in
    /// full.
    Messages(Vec<Arc<Message>>),
    /// One fragment of a large block currently being sent.
    Block {
        /// Id of the message (in the send queue) that this block belongs
        /// to.
        block_id: u16,
        /// Index of this fragment within the block.
        fragment_id: u16,
        /// Total size of the block, in bytes.
        block_size: u32,
        /// This fragment's payload, padded to `block_fragment_size`.
        fragment_bytes: Bytes,
    },
}

/// Writes each message's id, in order: the first one raw, every later one
/// delta-relative to its predecessor via the bit-packer's ladder encoding.
/// Ids are expected non-decreasing (mod wraparound) in `messages`' order,
/// which the channel's send scheduler already guarantees; a same-or-lower
/// id than its predecessor is treated as having wrapped past `u16::MAX`.
fn write_message_ids(writer: &mut BitWriter<'_>, messages: &[Arc<Message>]) {
    let mut previous_unwrapped = 0u32;
    for (i, message) in messages.iter().enumerate() {
        let id = u32::from(message.id());
        if i == 0 {
            writer.serialize_u16(message.id());
        } else {
            let current_unwrapped = if id <= previous_unwrapped { id + 65536 } else { id };
            writer.serialize_int_relative(previous_unwrapped, current_unwrapped);
            previous_unwrapped = current_unwrapped;
            continue;
        }
        previous_unwrapped = id;
    }
}

/// Reads `num_messages` ids previously written by [`write_message_ids`].
fn read_message_ids(reader: &mut BitReader<'_>, num_messages: usize) -> Vec<u16> {
    let mut ids = Vec::with_capacity(num_messages);
    let mut previous_unwrapped = 0u32;
    for i in 0..num_messages {
        if i == 0 {
            let id = reader.serialize_u16();
            previous_unwrapped = u32::from(id);
            ids.push(id);
        } else {
            let current_unwrapped = reader.serialize_int_relative(previous_unwrapped);
            ids.push((current_unwrapped % 65536) as u16);
            previous_unwrapped = current_unwrapped;
        }
    }
    ids
}

impl ChannelData {
    /// Writes this payload's wire representation.
    pub fn serialize_write(&self, writer: &mut BitWriter<'_>, config: &ChannelConfig) {
        match self {
            Self::Messages(messages) => {
                writer.serialize_bool(false);
                debug_assert!(!messages.is_empty());
                writer.serialize_integer(
                    messages.len() as i32,
                    1,
                    config.max_messages_per_packet as i32,
                );
                write_message_ids(writer, messages);
                for message in messages {
                    writer.serialize_integer(i32::from(message.kind()), 0, i32::from(config.max_message_kind));
                    match message.payload() {
                        MessagePayload::Block(block) => {
                            writer.serialize_block(block.as_bytes(), config.max_small_block_size);
                        }
                        MessagePayload::App { payload, .. } => {
                            writer.serialize_block(payload, config.max_message_size);
                        }
                    }
                }
            }
            Self::Block {
                block_id,
                fragment_id,
                block_size,
                fragment_bytes,
            } => {
                writer.serialize_bool(true);
                writer.serialize_u16(*block_id);
                writer.serialize_u16(*fragment_id);
                writer.serialize_u32(*block_size);
                writer.align();
                debug_assert_eq!(fragment_bytes.len(), config.block_fragment_size);
                for &b in fragment_bytes.iter() {
                    writer.serialize_bits(u32::from(b), 8);
                }
            }
        }
    }

    /// Reads a payload previously written by
    /// [`ChannelData::serialize_write`].
    pub fn serialize_read(
        reader: &mut BitReader<'_>,
        config: &ChannelConfig,
        factory: &MessageFactory,
    ) -> Option<Self> {
        let large_block = reader.serialize_bool();
        if large_block {
            let block_id = reader.serialize_u16();
            let fragment_id = reader.serialize_u16();
            let block_size = reader.serialize_u32();
            reader.align();
            let mut fragment_bytes = vec![0u8; config.block_fragment_size];
            for slot in &mut fragment_bytes {
                *slot = reader.serialize_bits(8) as u8;
            }
            Some(Self::Block {
                block_id,
                fragment_id,
                block_size,
                fragment_bytes: Bytes::from(fragment_bytes),
            })
        } else {
            let num_messages =
                reader.serialize_integer(1, config.max_messages_per_packet as i32)? as usize;
            let ids = read_message_ids(reader, num_messages);
            let mut messages = Vec::with_capacity(num_messages);
            for id in ids {
                let kind = reader.serialize_integer(0, i32::from(config.max_message_kind))? as u16;
                let mut message = if kind == BLOCK_MESSAGE_KIND {
                    let bytes = reader.serialize_block(config.max_small_block_size)?;
                    factory.create_block(Block::adopt(Bytes::from(bytes)))
                } else {
                    let bytes = reader.serialize_block(config.max_message_size)?;
                    factory.create_app(kind, Bytes::from(bytes))
                };
                Arc::get_mut(&mut message)
                    .expect("freshly created message has no other references yet")
                    .set_id(id);
                messages.push(message);
            }
            Some(Self::Messages(messages))
        }
    }

    /// Accounts for the bits [`ChannelData::serialize_write`] would produce.
    pub fn measure(&self, measure: &mut MeasureStream, config: &ChannelConfig) {
        measure.serialize_bool();
        match self {
            Self::Messages(messages) => {
                measure.serialize_integer(1, config.max_messages_per_packet as i32);
                for (i, message) in messages.iter().enumerate() {
                    if i == 0 {
                        measure.serialize_bits(16);
                    } else {
                        measure.serialize_int_relative_worst_case();
                    }
                    measure.serialize_integer(0, i32::from(config.max_message_kind));
                    match message.payload() {
                        MessagePayload::Block(block) => {
                            measure.serialize_block(block.len(), config.max_small_block_size);
                        }
                        MessagePayload::App { payload, .. } => {
                            measure.serialize_block(payload.len(), config.max_message_size);
                        }
                    }
                }
            }
            Self::Block { .. } => {
                measure.serialize_bits(32);
                measure.serialize_bits(32);
                measure.align();
                measure.serialize_bytes(config.block_fragment_size);
            }
        }
    }
}

/// A reliable, ordered channel multiplexed over a
/// [`crate::connection::Connection`].
///
/// Messages are delivered to the application in the order they were sent,
/// exactly once, regardless of reordering or loss on the wire - the cost is
/// unbounded delivery latency for a message stuck behind a lost
/// predecessor. See the module documentation for how this interacts with
/// large block transfer.
#[derive(Debug)]
pub struct ReliableMessageChannel {
    config: ChannelConfig,
    factory: MessageFactory,

    send_message_id: u16,
    receive_message_id: u16,
    oldest_unacked_message_id: u16,

    sent_packets: SequenceBuffer<SentPacketEntry>,
    message_send_queue: SequenceBuffer<SendQueueEntry>,
    message_receive_queue: SequenceBuffer<ReceiveQueueEntry>,

    send_block: Option<DataBlockSender>,
    send_block_message_id: Option<u16>,
    receive_block: DataBlockReceiver,
    receive_block_message_id: Option<u16>,

    counters: ChannelCounters,
    error: Option<ChannelError>,
    last_rejection: Option<ChannelError>,
}

impl ReliableMessageChannel {
    /// Creates a channel, validating `config` first.
    pub fn new(config: ChannelConfig, factory: MessageFactory) -> Result<Self, ConfigError> {
        config.validate()?;
        let receive_block = DataBlockReceiver::new(config.block_fragment_size, config.max_large_block_size);
        Ok(Self {
            sent_packets: SequenceBuffer::new(config.sent_packets_size),
            message_send_queue: SequenceBuffer::new(config.send_queue_size),
            message_receive_queue: SequenceBuffer::new(config.receive_queue_size),
            send_message_id: 0,
            receive_message_id: 0,
            oldest_unacked_message_id: 0,
            send_block: None,
            send_block_message_id: None,
            receive_block,
            receive_block_message_id: None,
            counters: ChannelCounters::default(),
            error: None,
            last_rejection: None,
            config,
            factory,
        })
    }

    /// This channel's configuration.
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Traffic counters accumulated so far.
    #[must_use]
    pub fn counters(&self) -> ChannelCounters {
        self.counters
    }

    /// This channel's latched fatal error, if any. Once set, the owning
    /// [`crate::connection::Connection`] treats `write_packet`/`read_packet`
    /// as no-ops until [`ReliableMessageChannel::reset`].
    #[must_use]
    pub fn error(&self) -> Option<ChannelError> {
        self.error
    }

    /// The most recent packet-level rejection [`ReliableMessageChannel::process_data`]
    /// recorded, if any. Unlike [`ReliableMessageChannel::error`] this is
    /// diagnostic only - it never halts the channel, and is overwritten by
    /// the next rejection.
    #[must_use]
    pub fn last_rejection(&self) -> Option<ChannelError> {
        self.last_rejection
    }

    /// Whether there is at least one unacked sent message (or block
    /// fragment) still awaiting acknowledgement.
    #[must_use]
    pub fn has_messages_to_send(&self) -> bool {
        self.oldest_unacked_message_id != self.send_message_id
    }

    /// Whether the send queue has room for one more message.
    #[must_use]
    pub fn can_send_message(&self) -> bool {
        self.message_send_queue.is_available(self.send_message_id)
    }

    /// Queues `message` for sending, assigning it the next message id.
    ///
    /// # Panics
    ///
    /// Panics if `message` is already shared (has more than one strong
    /// reference) - the id must be set before the message is ever cloned.
    pub fn send_message(&mut self, message: Arc<Message>) -> Result<(), ChannelError> {
        if !self.can_send_message() {
            warn!(send_message_id = self.send_message_id, "send queue full, latching channel error");
            self.error = Some(ChannelError::SendQueueFull);
            return Err(ChannelError::SendQueueFull);
        }

        let id = self.send_message_id;
        let mut message = message;
        Arc::get_mut(&mut message)
            .expect("message must not be shared before send_message assigns its id")
            .set_id(id);

        let large_block = match message.payload() {
            MessagePayload::Block(block) => block.len() > self.config.max_small_block_size,
            MessagePayload::App { .. } => false,
        };

        let measured_bits = if large_block {
            0
        } else {
            Self::measure_message(&message, &self.config)
        };

        self.message_send_queue.insert(
            id,
            SendQueueEntry {
                message: Some(message),
                time_last_sent: -1.0,
                measured_bits,
                large_block,
            },
        );

        self.counters.messages_sent += 1;
        self.send_message_id = self.send_message_id.wrapping_add(1);
        Ok(())
    }

    /// Queues a block for sending, as a small inline block or a fragmented
    /// large block depending on its size.
    pub fn send_block(&mut self, block: Block) -> Result<(), ChannelError> {
        let message = self.factory.create_block(block);
        self.send_message(message)
    }

    fn measure_message(message: &Message, config: &ChannelConfig) -> usize {
        let mut measure = MeasureStream::new();
        measure.serialize_integer(0, i32::from(config.max_message_kind));
        measure.serialize_bits(16);
        match message.payload() {
            MessagePayload::Block(block) => measure.serialize_block(block.len(), config.max_small_block_size),
            MessagePayload::App { payload, .. } => {
                measure.serialize_block(payload.len(), config.max_message_size);
            }
        }
        measure.bits_written()
    }

    /// Dequeues the next in-order received message, if it has arrived.
    pub fn receive_message(&mut self) -> Option<Arc<Message>> {
        let message = self
            .message_receive_queue
            .find_mut(self.receive_message_id)?
            .message
            .take();
        self.message_receive_queue.remove(self.receive_message_id);
        self.receive_message_id = self.receive_message_id.wrapping_add(1);
        if message.is_some() {
            self.counters.messages_received += 1;
        }
        message
    }

    /// Produces this channel's contribution to the packet being built at
    /// `packet_sequence`, if it has anything to send within
    /// `available_bits`.
    pub fn get_data(
        &mut self,
        time: f64,
        packet_sequence: u16,
        available_bits: usize,
    ) -> Option<ChannelData> {
        if !self.has_messages_to_send() {
            return None;
        }

        let head_id = self.oldest_unacked_message_id;
        let head_is_large = self
            .message_send_queue
            .find(head_id)
            .is_some_and(|entry| entry.large_block);

        if head_is_large {
            self.get_large_block_data(time, packet_sequence, head_id)
        } else {
            self.get_small_message_data(time, packet_sequence, available_bits)
        }
    }

    fn get_small_message_data(
        &mut self,
        time: f64,
        packet_sequence: u16,
        available_bits: usize,
    ) -> Option<ChannelData> {
        let ids = self.schedule_small_messages(time, available_bits);
        if ids.is_empty() {
            return None;
        }

        let messages: Vec<Arc<Message>> = ids
            .iter()
            .map(|id| {
                self.message_send_queue
                    .find(*id)
                    .and_then(|entry| entry.message.clone())
                    .expect("scheduled id must still be present in the send queue")
            })
            .collect();

        self.counters.messages_written += messages.len() as u64;
        self.sent_packets.insert(
            packet_sequence,
            SentPacketEntry {
                time_sent: time,
                kind: SentPacketKind::Messages(ids),
            },
        );
        Some(ChannelData::Messages(messages))
    }

    fn schedule_small_messages(&mut self, time: f64, available_bits: usize) -> Vec<u16> {
        let packet_budget_bits = self.config.packet_budget * 8;
        let available_bits = available_bits.min(packet_budget_bits);
        let message_limit = self.config.receive_queue_size.min(self.config.send_queue_size);
        let resend_rate = self.config.resend_rate();

        let mut message_ids = Vec::new();
        let mut used_bits = 0usize;

        for i in 0..message_limit {
            if message_ids.len() >= self.config.max_messages_per_packet {
                break;
            }
            if available_bits.saturating_sub(used_bits) < self.config.give_up_bits {
                break;
            }

            let id = self.oldest_unacked_message_id.wrapping_add(i as u16);
            let Some(entry) = self.message_send_queue.find_mut(id) else {
                continue;
            };

            if entry.large_block {
                // a later large block blocks everything behind it from
                // sharing this packet's message-batch format.
                break;
            }

            if entry.time_last_sent + resend_rate > time {
                continue;
            }
            if used_bits + entry.measured_bits > available_bits {
                continue;
            }

            entry.time_last_sent = time;
            used_bits += entry.measured_bits;
            message_ids.push(id);
        }

        message_ids
    }

    fn get_large_block_data(
        &mut self,
        time: f64,
        packet_sequence: u16,
        head_id: u16,
    ) -> Option<ChannelData> {
        if self.send_block_message_id != Some(head_id) {
            let entry = self.message_send_queue.find(head_id)?;
            let message = entry.message.clone()?;
            let block = match message.payload() {
                MessagePayload::Block(block) => block.clone(),
                MessagePayload::App { .. } => return None,
            };
            let sender = DataBlockSender::new(block, self.config.block_fragment_size);
            debug!(block_id = head_id, num_fragments = sender.num_fragments(), "large block activated");
            self.send_block = Some(sender);
            self.send_block_message_id = Some(head_id);
        }

        let resend_rate = self.config.resend_rate();
        let sender = self.send_block.as_mut()?;
        let fragment_id = sender.next_fragment_to_send(time, resend_rate)?;

        let block_size = sender.block_size();
        let mut fragment_bytes = vec![0u8; self.config.block_fragment_size];
        let raw = sender.fragment_bytes(fragment_id);
        fragment_bytes[..raw.len()].copy_from_slice(raw);

        self.counters.messages_written += 1;
        self.sent_packets.insert(
            packet_sequence,
            SentPacketEntry {
                time_sent: time,
                kind: SentPacketKind::BlockFragment {
                    block_id: head_id,
                    fragment_id: fragment_id as u16,
                },
            },
        );

        Some(ChannelData::Block {
            block_id: head_id,
            fragment_id: fragment_id as u16,
            block_size: block_size as u32,
            fragment_bytes: Bytes::from(fragment_bytes),
        })
    }

    /// Applies an incoming packet's payload for this channel.
    ///
    /// Returns `false` if the payload must cause the whole packet to be
    /// discarded (an early message, a bitpacked payload arriving mid
    /// large-block receive, or a malformed/mismatched block fragment) -
    /// [`crate::connection::Connection::read_packet`] relies on this to
    /// decide whether to ack the packet at all.
    pub fn process_data(&mut self, data: ChannelData) -> bool {
        match data {
            ChannelData::Messages(messages) => {
                if self.receive_block_message_id.is_some() {
                    trace!("bitpacked data rejected while a large block receive is active");
                    return false;
                }
                self.process_messages(messages)
            }
            ChannelData::Block {
                block_id,
                fragment_id,
                block_size,
                fragment_bytes,
            } => self.process_block_fragment(block_id, fragment_id, block_size, &fragment_bytes),
        }
    }

    fn process_messages(&mut self, messages: Vec<Arc<Message>>) -> bool {
        let min_id = self.receive_message_id;
        let max_id = self
            .receive_message_id
            .wrapping_add(self.config.receive_queue_size as u16 - 1);
        let mut early = false;

        for message in messages {
            let id = message.id();
            if less_than(id, min_id) {
                trace!(id, expected = min_id, "message discarded late");
                self.counters.messages_discarded_late += 1;
                continue;
            }
            if less_than(max_id, id) {
                trace!(id, max_id, "message discarded early, outside receive window");
                self.counters.messages_discarded_early += 1;
                early = true;
                continue;
            }
            if self.message_receive_queue.find(id).is_none() {
                trace!(id, "message accepted");
                self.message_receive_queue.insert(id, ReceiveQueueEntry { message: Some(message) });
                self.counters.messages_read += 1;
            }
        }

        !early
    }

    fn process_block_fragment(
        &mut self,
        block_id: u16,
        fragment_id: u16,
        block_size: u32,
        fragment_bytes: &[u8],
    ) -> bool {
        let latest = self.message_receive_queue.latest_sequence();
        if less_than(block_id, latest) {
            trace!(block_id, "fragment for an already-delivered block, acked but ignored");
            return true;
        }

        if self.receive_block_message_id.is_none() {
            if block_id != latest {
                trace!(block_id, expected = latest, "unexpected block id, rejecting packet");
                return false;
            }
            self.receive_block.clear();
            self.receive_block_message_id = Some(block_id);
            debug!(block_id, "large block receive activated");
        } else if self.receive_block_message_id != Some(block_id) {
            trace!(
                block_id,
                active = ?self.receive_block_message_id,
                "block id mismatch, rejecting packet"
            );
            return false;
        }

        let fragment_size = self.config.block_fragment_size;
        let num_fragments = (block_size as usize).div_ceil(fragment_size).max(1);
        let fragment_start = usize::from(fragment_id) * fragment_size;
        let actual_len = (block_size as usize).saturating_sub(fragment_start).min(fragment_size);

        if let Err(err) = self.receive_block.receive_fragment(
            block_size as usize,
            num_fragments,
            usize::from(fragment_id),
            &fragment_bytes[..actual_len],
        ) {
            let rejection = match err {
                DataBlockError::BlockTooLarge { block_size, max_block_size } => {
                    ChannelError::BlockTooLarge { size: block_size, max: max_block_size }
                }
                DataBlockError::FragmentMismatch { .. } => ChannelError::FragmentMismatch { block_id },
            };
            warn!(block_id, %rejection, "block fragment rejected, discarding packet");
            self.last_rejection = Some(rejection);
            return false;
        }

        if self.receive_block.receive_completed() {
            if let Some(block) = self.receive_block.take_block() {
                let mut message = self.factory.create_block(block);
                Arc::get_mut(&mut message)
                    .expect("freshly created message has no other references yet")
                    .set_id(block_id);
                self.message_receive_queue
                    .insert(block_id, ReceiveQueueEntry { message: Some(message) });
                self.counters.messages_read += 1;
            }
            debug!(block_id, "large block receive deactivated, fully reassembled");
            self.receive_block_message_id = None;
        }

        true
    }

    /// Applies an ack for `ack` (a previously sent packet sequence),
    /// releasing any send-queue entries it fully covers.
    pub fn process_ack(&mut self, ack: u16) {
        let Some(entry) = self.sent_packets.find(ack) else {
            return;
        };

        match entry.kind.clone() {
            SentPacketKind::Messages(ids) => {
                for id in ids {
                    let acked = self
                        .message_send_queue
                        .find_mut(id)
                        .is_some_and(|slot| slot.message.take().is_some());
                    if acked {
                        self.message_send_queue.remove(id);
                        self.advance_oldest_unacked();
                    }
                }
            }
            SentPacketKind::BlockFragment { block_id, fragment_id } => {
                if self.send_block_message_id == Some(block_id) {
                    let completed = if let Some(sender) = &mut self.send_block {
                        sender.process_ack(usize::from(fragment_id));
                        sender.send_completed()
                    } else {
                        false
                    };
                    if completed {
                        debug!(block_id, "large block deactivated, fully acked");
                        if let Some(slot) = self.message_send_queue.find_mut(block_id) {
                            slot.message = None;
                        }
                        self.message_send_queue.remove(block_id);
                        self.send_block = None;
                        self.send_block_message_id = None;
                        self.advance_oldest_unacked();
                    }
                }
            }
        }
    }

    fn advance_oldest_unacked(&mut self) {
        while self.oldest_unacked_message_id != self.send_message_id
            && self.message_send_queue.find(self.oldest_unacked_message_id).is_none()
        {
            self.oldest_unacked_message_id = self.oldest_unacked_message_id.wrapping_add(1);
        }
    }

    /// Current large-block send status, for diagnostics: `(block_id,
    /// num_fragments, num_acked_fragments)`.
    #[must_use]
    pub fn send_block_status(&self) -> Option<(u16, usize, usize)> {
        let sender = self.send_block.as_ref()?;
        Some((
            self.send_block_message_id?,
            sender.num_fragments(),
            sender.num_acked_fragments(),
        ))
    }

    /// Resets all send/receive state, as if the channel had just been
    /// constructed. Used when the owning connection is reset.
    pub fn reset(&mut self) {
        self.send_message_id = 0;
        self.receive_message_id = 0;
        self.oldest_unacked_message_id = 0;
        self.sent_packets.reset();
        self.message_send_queue.reset();
        self.message_receive_queue.reset();
        self.send_block = None;
        self.send_block_message_id = None;
        self.receive_block.clear();
        self.receive_block_message_id = None;
        self.counters = ChannelCounters::default();
        self.error = None;
        self.last_rejection = None;
    }
}
