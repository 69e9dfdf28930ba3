//! Fragmentation and reassembly for large blocks: [`DataBlockSender`] and
//! [`DataBlockReceiver`].
//!
//! A [`crate::block::Block`] larger than a channel's `max_small_block_size`
//! is never serialized inline; instead it is split into fixed-size
//! fragments, each acked independently, and reassembled once every fragment
//! has arrived. [`crate::channel::ReliableMessageChannel`] owns one sender
//! and one receiver per direction and drives both from its own scheduling
//! loop.

use bit_vec::BitVec;
use bytes::Bytes;
use derive_more::{Display, Error};

use crate::block::Block;

/// Failure modes [`DataBlockReceiver::receive_fragment`] can report.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum DataBlockError {
    /// The advertised block size exceeds this receiver's configured
    /// `max_block_size`. Fatal: the sender is misbehaving or the channel
    /// configurations have drifted apart.
    #[display("block size {block_size} exceeds receiver limit {max_block_size}")]
    BlockTooLarge {
        /// Size the sender advertised.
        block_size: usize,
        /// This receiver's configured ceiling.
        max_block_size: usize,
    },
    /// A fragment disagreed with the block currently being assembled
    /// (block size, fragment count, or fragment id out of range), or its
    /// payload would write past `block_size`. Not fatal: the caller should
    /// discard the packet and let the sender retry.
    #[display("fragment {fragment_id} did not match the block in progress (block_size={block_size}, num_fragments={num_fragments})")]
    FragmentMismatch {
        /// Fragment id carried by the mismatched fragment.
        fragment_id: usize,
        /// Block size carried by the mismatched fragment.
        block_size: usize,
        /// Fragment count carried by the mismatched fragment.
        num_fragments: usize,
    },
}

/// Per-fragment send-side bookkeeping.
#[derive(Debug, Clone, Copy)]
struct SendFragmentData {
    time_last_sent: f64,
    acked: bool,
}

impl Default for SendFragmentData {
    fn default() -> Self {
        Self {
            time_last_sent: -1.0,
            acked: false,
        }
    }
}

/// Drives one large block through fragmented transmission until every
/// fragment is acked.
///
/// Fragments are offered for (re)send in round-robin order, skipping any
/// fragment whose minimum resend spacing has not yet elapsed; this spreads
/// retransmissions across a loss burst rather than repeatedly retrying the
/// same fragment.
#[derive(Debug)]
pub struct DataBlockSender {
    block: Block,
    fragment_size: usize,
    num_fragments: usize,
    num_acked_fragments: usize,
    fragments: Vec<SendFragmentData>,
    next_fragment: usize,
}

impl DataBlockSender {
    /// Begins sending `block`, split into `fragment_size`-byte pieces (the
    /// final fragment may be shorter).
    #[must_use]
    pub fn new(block: Block, fragment_size: usize) -> Self {
        let num_fragments = block.len().div_ceil(fragment_size).max(1);
        Self {
            block,
            fragment_size,
            num_fragments,
            num_acked_fragments: 0,
            fragments: vec![SendFragmentData::default(); num_fragments],
            next_fragment: 0,
        }
    }

    /// Total size of the block being sent, in bytes.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    /// Number of fragments this block was split into.
    #[must_use]
    pub fn num_fragments(&self) -> usize {
        self.num_fragments
    }

    /// Whether every fragment has been acked.
    #[must_use]
    pub fn send_completed(&self) -> bool {
        self.num_acked_fragments == self.num_fragments
    }

    /// Number of fragments acked so far.
    #[must_use]
    pub fn num_acked_fragments(&self) -> usize {
        self.num_acked_fragments
    }

    /// Byte range carried by `fragment_id`.
    #[must_use]
    pub fn fragment_bytes(&self, fragment_id: usize) -> &[u8] {
        let start = fragment_id * self.fragment_size;
        let end = (start + self.fragment_size).min(self.block.len());
        &self.block.as_bytes()[start..end]
    }

    /// Marks `fragment_id` as acked by the peer.
    pub fn process_ack(&mut self, fragment_id: usize) {
        if let Some(entry) = self.fragments.get_mut(fragment_id) {
            if !entry.acked {
                entry.acked = true;
                self.num_acked_fragments += 1;
            }
        }
    }

    /// Picks the next fragment due for (re)transmission, if any, marking it
    /// as sent at `time`. Returns `None` once nothing is due.
    pub fn next_fragment_to_send(&mut self, time: f64, resend_rate: f64) -> Option<usize> {
        for step in 0..self.num_fragments {
            let id = (self.next_fragment + step) % self.num_fragments;
            let entry = &mut self.fragments[id];
            if entry.acked {
                continue;
            }
            if entry.time_last_sent + resend_rate > time {
                continue;
            }
            entry.time_last_sent = time;
            self.next_fragment = (id + 1) % self.num_fragments;
            return Some(id);
        }
        None
    }
}

/// Per-fragment receive-side bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
struct ReceiveFragmentData {
    received: bool,
}

/// Reassembles a large block from its independently-arriving, possibly
/// reordered or duplicated fragments.
#[derive(Debug)]
pub struct DataBlockReceiver {
    max_block_size: usize,
    fragment_size: usize,
    max_fragments: usize,
    data: Vec<u8>,
    block_size: Option<usize>,
    num_fragments: Option<usize>,
    fragments: Vec<ReceiveFragmentData>,
    num_received_fragments: usize,
}

impl DataBlockReceiver {
    /// Creates a receiver that will reject any block larger than
    /// `max_block_size`.
    #[must_use]
    pub fn new(fragment_size: usize, max_block_size: usize) -> Self {
        let max_fragments = max_block_size.div_ceil(fragment_size).max(1);
        Self {
            max_block_size,
            fragment_size,
            max_fragments,
            data: vec![0u8; max_block_size],
            block_size: None,
            num_fragments: None,
            fragments: vec![ReceiveFragmentData::default(); max_fragments],
            num_received_fragments: 0,
        }
    }

    /// Resets this receiver to accept a new block from scratch.
    pub fn clear(&mut self) {
        self.block_size = None;
        self.num_fragments = None;
        self.num_received_fragments = 0;
        for f in &mut self.fragments {
            f.received = false;
        }
    }

    /// Number of fragments received so far for the block currently in
    /// progress.
    #[must_use]
    pub fn num_received_fragments(&self) -> usize {
        self.num_received_fragments
    }

    /// Whether every fragment of the current block has arrived.
    #[must_use]
    pub fn receive_completed(&self) -> bool {
        self.num_fragments
            .is_some_and(|n| self.num_received_fragments == n)
    }

    /// Accepts one fragment. A duplicate fragment is silently ignored (the
    /// sender will simply keep retrying until acked). An oversized block, a
    /// mismatched block size/fragment count against an already-in-progress
    /// block, or an out-of-range fragment id are all reported as
    /// [`DataBlockError`] - the caller must discard the packet rather than
    /// treat the block as making progress.
    pub fn receive_fragment(
        &mut self,
        block_size: usize,
        num_fragments: usize,
        fragment_id: usize,
        fragment_data: &[u8],
    ) -> Result<(), DataBlockError> {
        if block_size > self.max_block_size {
            return Err(DataBlockError::BlockTooLarge {
                block_size,
                max_block_size: self.max_block_size,
            });
        }

        let mismatch = || DataBlockError::FragmentMismatch {
            fragment_id,
            block_size,
            num_fragments,
        };

        if self.block_size.is_none() {
            self.block_size = Some(block_size);
        }
        if self.block_size != Some(block_size) {
            return Err(mismatch());
        }

        if num_fragments > self.max_fragments {
            return Err(mismatch());
        }
        if self.num_fragments.is_none() {
            self.num_fragments = Some(num_fragments);
        }
        if self.num_fragments != Some(num_fragments) {
            return Err(mismatch());
        }

        if fragment_id >= num_fragments {
            return Err(mismatch());
        }

        let start = fragment_id * self.fragment_size;
        let end = start + fragment_data.len();
        if end > block_size {
            return Err(mismatch());
        }

        if !self.fragments[fragment_id].received {
            self.fragments[fragment_id].received = true;
            self.num_received_fragments += 1;
            self.data[start..end].copy_from_slice(fragment_data);
        }

        Ok(())
    }

    /// Takes the reassembled block, clearing this receiver for re-use.
    /// Returns `None` unless [`DataBlockReceiver::receive_completed`].
    pub fn take_block(&mut self) -> Option<Block> {
        let block_size = self.block_size.filter(|_| self.receive_completed())?;
        let bytes = Bytes::copy_from_slice(&self.data[..block_size]);
        self.clear();
        Some(Block::adopt(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_reports_completion_once_every_fragment_acked() {
        let mut sender = DataBlockSender::new(Block::new(vec![1u8; 10]), 4);
        assert_eq!(sender.num_fragments(), 3);
        assert!(!sender.send_completed());
        for id in 0..3 {
            sender.process_ack(id);
        }
        assert!(sender.send_completed());
    }

    #[test]
    fn sender_skips_fragments_whose_resend_window_has_not_elapsed() {
        let mut sender = DataBlockSender::new(Block::new(vec![1u8; 8]), 4);
        assert_eq!(sender.next_fragment_to_send(0.0, 0.1), Some(0));
        assert_eq!(sender.next_fragment_to_send(0.0, 0.1), Some(1));
        assert_eq!(sender.next_fragment_to_send(0.05, 0.1), None);
        assert_eq!(sender.next_fragment_to_send(0.2, 0.1), Some(0));
    }

    #[test]
    fn receiver_reassembles_out_of_order_fragments() {
        let mut receiver = DataBlockReceiver::new(4, 1024);
        let data = b"hello world!".to_vec();
        receiver
            .receive_fragment(data.len(), 3, 2, &data[8..12])
            .unwrap();
        receiver
            .receive_fragment(data.len(), 3, 0, &data[0..4])
            .unwrap();
        assert!(!receiver.receive_completed());
        receiver
            .receive_fragment(data.len(), 3, 1, &data[4..8])
            .unwrap();
        assert!(receiver.receive_completed());

        let block = receiver.take_block().unwrap();
        assert_eq!(block.as_bytes(), &data[..]);
    }

    #[test]
    fn receiver_rejects_oversized_block() {
        let mut receiver = DataBlockReceiver::new(4, 8);
        let err = receiver.receive_fragment(16, 4, 0, &[0; 4]).unwrap_err();
        assert_eq!(
            err,
            DataBlockError::BlockTooLarge {
                block_size: 16,
                max_block_size: 8
            }
        );
    }

    #[test]
    fn duplicate_fragment_is_ignored() {
        let mut receiver = DataBlockReceiver::new(4, 1024);
        receiver.receive_fragment(4, 1, 0, &[1, 2, 3, 4]).unwrap();
        receiver.receive_fragment(4, 1, 0, &[9, 9, 9, 9]).unwrap();
        let block = receiver.take_block().unwrap();
        assert_eq!(block.as_bytes(), &[1, 2, 3, 4]);
    }
}
