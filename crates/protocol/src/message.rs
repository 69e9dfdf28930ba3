//! See [`Message`] and [`MessageFactory`].

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;

use crate::block::Block;

/// Reserved message kind carrying a [`Block`] payload - serialized as a
/// small, inline block when its size is at most `max_small_block_size`, or
/// as a fragmented large block otherwise (see
/// [`crate::channel::ReliableMessageChannel`]).
pub const BLOCK_MESSAGE_KIND: u16 = 0;

/// The payload half of a [`Message`]: either the reserved block kind, or an
/// application-defined kind with an opaque, already-serialized body.
#[derive(Debug, Clone)]
pub enum MessagePayload {
    /// A block of bytes, small or large depending on
    /// `max_small_block_size`.
    Block(Block),
    /// An application message: a factory-registered kind tag plus its
    /// serialized body.
    App {
        /// Application-defined kind, validated against
        /// [`MessageFactory::max_kind`] at creation time.
        kind: u16,
        /// Pre-serialized message body.
        payload: Bytes,
    },
}

/// A single application message or block, tagged with a 16-bit id assigned
/// by the sending channel.
///
/// Messages are reference-counted: the same logical message may be aliased
/// from a `SendQueueEntry` and one or more outgoing channel-data payloads
/// simultaneously. `netcode` achieves this with `Arc<Message>` rather than a
/// hand-rolled refcount, and [`MessageFactory`] additionally tracks a live
/// count for leak detection in tests.
#[derive(Debug)]
pub struct Message {
    id: u16,
    payload: MessagePayload,
    live: Arc<AtomicUsize>,
}

impl Message {
    /// The id assigned to this message by its sending channel.
    ///
    /// Set once, before the message is inserted into a send or receive
    /// queue, and never mutated afterwards.
    #[must_use]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Sets this message's id. Only valid to call while this `Message` has
    /// no other outstanding `Arc` references (i.e. before it is shared).
    pub(crate) fn set_id(&mut self, id: u16) {
        self.id = id;
    }

    /// This message's kind: [`BLOCK_MESSAGE_KIND`] for a block, or the
    /// application-defined kind otherwise.
    #[must_use]
    pub fn kind(&self) -> u16 {
        match &self.payload {
            MessagePayload::Block(_) => BLOCK_MESSAGE_KIND,
            MessagePayload::App { kind, .. } => *kind,
        }
    }

    /// Borrows this message's payload.
    #[must_use]
    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    /// Size, in bytes, of this message's block, if it is one.
    #[must_use]
    pub fn block_len(&self) -> Option<usize> {
        match &self.payload {
            MessagePayload::Block(block) => Some(block.len()),
            MessagePayload::App { .. } => None,
        }
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Construction and classification authority for [`Message`]s, and the
/// leak-tracking point a test suite checks at teardown.
///
/// The source this is modeled on uses a factory as a central destroy point
/// with a registered-types table; this port keeps the factory as the
/// construction/live-count authority, since `Arc`'s own refcounting already
/// handles destruction.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    live: Arc<AtomicUsize>,
    max_kind: u16,
}

impl MessageFactory {
    /// Creates a factory. `max_kind` is the highest application-defined kind
    /// value that will ever be passed to [`MessageFactory::create_app`].
    #[must_use]
    pub fn new(max_kind: u16) -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            max_kind,
        }
    }

    /// Highest valid application message kind.
    #[must_use]
    pub fn max_kind(&self) -> u16 {
        self.max_kind
    }

    /// Number of messages created by this factory that have not yet been
    /// fully dropped. Should be zero at test teardown; a nonzero count is a
    /// leak.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Creates a block message with id `0` (to be assigned by the channel
    /// that sends it).
    #[must_use]
    pub fn create_block(&self, block: Block) -> Arc<Message> {
        self.create(MessagePayload::Block(block))
    }

    /// Creates an application message with id `0` (to be assigned by the
    /// channel that sends it).
    ///
    /// # Panics
    ///
    /// Panics if `kind` exceeds [`MessageFactory::max_kind`].
    #[must_use]
    pub fn create_app(&self, kind: u16, payload: Bytes) -> Arc<Message> {
        assert!(kind <= self.max_kind, "message kind out of range");
        self.create(MessagePayload::App { kind, payload })
    }

    fn create(&self, payload: MessagePayload) -> Arc<Message> {
        self.live.fetch_add(1, Ordering::AcqRel);
        Arc::new(Message {
            id: 0,
            payload,
            live: self.live.clone(),
        })
    }
}
