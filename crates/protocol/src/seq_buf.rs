//! See [`SequenceBuffer`].

use bit_vec::BitVec;

use crate::seq::{greater_than, less_than};

/// A capacity-`size` circular store indexed by a 16-bit sequence number, with
/// wraparound-aware insertion and lookup.
///
/// This provides constant-time insertion, query, and removal of items keyed
/// by a sequence number that increases (with wraparound at [`u16::MAX`]) over
/// the lifetime of a connection. Slot index is `sequence % size`; a parallel
/// `exists` bitmap plus a stored-sequence array lets [`SequenceBuffer::find`]
/// detect when a slot has been overwritten by a later, unrelated sequence
/// that happened to collide on the same index.
///
/// Unlike a plain ring buffer, [`SequenceBuffer::insert`] also *rejects*
/// sequences that are too old relative to the newest sequence ever inserted -
/// a sequence a whole buffer's worth of slots behind `latest_sequence` no
/// longer has a reliable home, since that slot may already have been reused.
///
/// This implementation is based on the sequence-buffer data structure
/// described in [*Gaffer On Games*].
///
/// [*Gaffer On Games*]: https://gafferongames.com/post/reliable_ordered_messages#sequence-buffers
///
/// # Examples
///
/// ```
/// use netcode_protocol::seq_buf::SequenceBuffer;
///
/// let mut buf = SequenceBuffer::<u32>::new(4);
/// assert_eq!(buf.insert(10, 100), Some(()));
/// assert_eq!(buf.find(10), Some(&100));
/// assert_eq!(buf.find(11), None);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceBuffer<T> {
    exists: BitVec,
    entry_sequence: Vec<u16>,
    entries: Vec<T>,
    size: usize,
    first_entry: bool,
    latest_sequence: u16,
}

impl<T: Default + Clone> SequenceBuffer<T> {
    /// Creates a new, empty sequence buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "sequence buffer size must be greater than zero");
        Self {
            exists: BitVec::from_elem(size, false),
            entry_sequence: vec![0u16; size],
            entries: vec![T::default(); size],
            size,
            first_entry: true,
            latest_sequence: 0,
        }
    }
}

impl<T> SequenceBuffer<T> {
    /// Number of slots in this buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// The sequence number one past the newest sequence ever inserted (or
    /// `0` if nothing has been inserted yet).
    ///
    /// This is the value `Connection::write_packet` uses as the next
    /// outgoing packet sequence, and is the upper bound `generate_ack_bits`
    /// walks down from.
    #[must_use]
    pub fn latest_sequence(&self) -> u16 {
        self.latest_sequence
    }

    fn index_of(&self, sequence: u16) -> usize {
        sequence as usize % self.size
    }

    /// Inserts `value` at `sequence`, returning a mutable reference to the
    /// stored slot, or `None` if `sequence` is older than this buffer's
    /// retention window (`latest_sequence - size`).
    ///
    /// Every successful insert sets the slot's exists-bit; there is no path
    /// to store a value without marking it present.
    pub fn insert(&mut self, sequence: u16, value: T) -> Option<&mut T> {
        if self.first_entry {
            self.latest_sequence = sequence.wrapping_add(1);
            self.first_entry = false;
        } else if greater_than(sequence.wrapping_add(1), self.latest_sequence) {
            self.latest_sequence = sequence.wrapping_add(1);
        } else if less_than(sequence, self.latest_sequence.wrapping_sub(self.size as u16)) {
            return None;
        }

        let index = self.index_of(sequence);
        self.exists.set(index, true);
        self.entry_sequence[index] = sequence;
        self.entries[index] = value;
        Some(&mut self.entries[index])
    }

    /// Like [`SequenceBuffer::insert`], but only constructs the value (via
    /// `make`) if the insert would actually succeed - avoids building a value
    /// that would just be discarded for a too-old sequence.
    pub fn insert_with(&mut self, sequence: u16, make: impl FnOnce() -> T) -> Option<&mut T> {
        if !self.would_accept(sequence) {
            return None;
        }
        self.insert(sequence, make())
    }

    fn would_accept(&self, sequence: u16) -> bool {
        self.first_entry
            || greater_than(sequence.wrapping_add(1), self.latest_sequence)
            || !less_than(sequence, self.latest_sequence.wrapping_sub(self.size as u16))
    }

    /// Clears the exists-bit for `sequence`, without touching the stored
    /// value (diagnostics may still want to read the stale sequence number).
    pub fn remove(&mut self, sequence: u16) {
        let index = self.index_of(sequence);
        self.exists.set(index, false);
    }

    /// Returns a reference to the value at `sequence`, iff that slot is
    /// occupied by exactly that sequence (not a later collision).
    #[must_use]
    pub fn find(&self, sequence: u16) -> Option<&T> {
        let index = self.index_of(sequence);
        if self.exists.get(index) == Some(true) && self.entry_sequence[index] == sequence {
            Some(&self.entries[index])
        } else {
            None
        }
    }

    /// Mutable counterpart to [`SequenceBuffer::find`].
    pub fn find_mut(&mut self, sequence: u16) -> Option<&mut T> {
        let index = self.index_of(sequence);
        if self.exists.get(index) == Some(true) && self.entry_sequence[index] == sequence {
            Some(&mut self.entries[index])
        } else {
            None
        }
    }

    /// Whether the slot `sequence` would map to is currently free.
    #[must_use]
    pub fn is_available(&self, sequence: u16) -> bool {
        let index = self.index_of(sequence);
        self.exists.get(index) != Some(true)
    }

    /// Clears every exists-bit and resets the latest-sequence tracking.
    /// Stored values are left in place (they will simply be overwritten on
    /// the next insert to their slot).
    pub fn reset(&mut self) {
        self.exists = BitVec::from_elem(self.size, false);
        self.entry_sequence.iter_mut().for_each(|s| *s = 0);
        self.first_entry = true;
        self.latest_sequence = 0;
    }

    /// Computes the packet-header ack fields: `ack` is the newest sequence
    /// inserted, and bit `i` of `ack_bits` is set iff `ack - i` is present in
    /// this buffer, for `i` in `0..32`.
    #[must_use]
    pub fn generate_ack_bits(&self) -> (u16, u32) {
        let ack = self.latest_sequence.wrapping_sub(1);
        let mut ack_bits = 0u32;
        for i in 0..32u16 {
            if self.find(ack.wrapping_sub(i)).is_some() {
                ack_bits |= 1 << i;
            }
        }
        (ack, ack_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S2: sequence buffer bounds.
    #[test]
    fn bounds_after_overrunning_insert() {
        let mut buf = SequenceBuffer::<u32>::new(256);
        for id in 0..=1024u32 {
            buf.insert(id as u16, id);
        }
        assert_eq!(buf.latest_sequence(), 1025);

        for id in 769..=1024u16 {
            assert!(buf.find(id).is_some(), "expected {id} to still be present");
        }
        for id in 0..256u16 {
            assert!(buf.find(id).is_none(), "expected {id} to have been evicted");
            assert_eq!(buf.insert(id, 0), None, "{id} is too old to accept");
        }
    }

    /// Scenario S3: generate ack bits with gaps.
    #[test]
    fn ack_bits_with_gaps() {
        let mut buf = SequenceBuffer::<()>::new(256);
        for id in [1u16, 5, 9, 11] {
            buf.insert(id, ());
        }
        let (ack, ack_bits) = buf.generate_ack_bits();
        assert_eq!(ack, 11);
        assert_eq!(ack_bits, 1 | (1 << 2) | (1 << 6) | (1 << 10));
    }

    #[test]
    fn remove_clears_existence_but_not_history() {
        let mut buf = SequenceBuffer::<u32>::new(8);
        buf.insert(3, 42);
        assert_eq!(buf.find(3), Some(&42));
        buf.remove(3);
        assert_eq!(buf.find(3), None);
        assert!(buf.is_available(3));
    }

    #[test]
    fn reset_clears_existence() {
        let mut buf = SequenceBuffer::<u32>::new(4);
        buf.insert(0, 1);
        buf.insert(1, 2);
        buf.reset();
        assert_eq!(buf.find(0), None);
        assert_eq!(buf.find(1), None);
        assert_eq!(buf.latest_sequence(), 0);
    }

    #[test]
    fn stale_collision_is_not_found() {
        let mut buf = SequenceBuffer::<u32>::new(4);
        buf.insert(0, 10);
        buf.insert(4, 14); // same slot as 0
        assert_eq!(buf.find(0), None);
        assert_eq!(buf.find(4), Some(&14));
    }
}
