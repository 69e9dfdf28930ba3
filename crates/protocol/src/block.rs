//! See [`Block`].

use bytes::Bytes;

/// An owned, contiguous byte buffer carried by a [`crate::message::Message`]
/// whose payload is [`crate::message::MessagePayload::Block`].
///
/// The source this crate is modeled on ties a block to an explicit allocator
/// and models ownership transfer with a manual connect/disconnect pair. Rust
/// already gives move semantics for free, so a [`Block`] is just a cheaply
/// cloneable [`Bytes`] buffer: "owning" is simply holding the buffer,
/// "adopting" an existing allocation is [`Block::adopt`], and "detaching" is
/// [`Block::detach`]. There is exactly one logical owner at a time - cloning
/// a [`Block`] clones the handle (cheap, via `Bytes`'s refcounted storage),
/// not semantically distinct ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    bytes: Bytes,
}

impl Block {
    /// Creates a block that owns a fresh copy of `data`.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Bytes::from(data.into()),
        }
    }

    /// Adopts an existing buffer as a block, taking ownership without
    /// copying.
    #[must_use]
    pub fn adopt(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Hands the underlying bytes back to the caller, relinquishing
    /// ownership without copying.
    #[must_use]
    pub fn detach(self) -> Bytes {
        self.bytes
    }

    /// Borrows the block's contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the block in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the block is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for Block {
    fn from(data: Vec<u8>) -> Self {
        Self::adopt(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_detach() {
        let block = Block::new(vec![1, 2, 3]);
        let bytes = block.detach();
        assert_eq!(&bytes[..], &[1, 2, 3]);
    }
}
