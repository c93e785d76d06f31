//! Binary Merkle Tree hasher

use alloy_primitives::{B256, Keccak256};
use std::sync::LazyLock;

use super::{MAX_DATA_LENGTH, SEGMENT_PAIR_LENGTH};

/// Levels between a single segment pair (64 bytes) and the full 4096-byte tree
const ZERO_TREE_LEVELS: usize = 7;

/// Root of an all-zero subtree, indexed by level (level 0 covers 64 bytes).
static ZERO_HASHES: LazyLock<[B256; ZERO_TREE_LEVELS]> = LazyLock::new(|| {
    let mut hashes = [B256::ZERO; ZERO_TREE_LEVELS];
    hashes[0] = keccak_pair(&[0u8; SEGMENT_PAIR_LENGTH], &[]);
    for level in 1..ZERO_TREE_LEVELS {
        hashes[level] = keccak_pair(hashes[level - 1].as_slice(), hashes[level - 1].as_slice());
    }
    hashes
});

#[inline(always)]
fn keccak_pair(left: &[u8], right: &[u8]) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize()
}

/// Level of a power-of-two subtree length between 64 and 4096
#[inline(always)]
const fn level_of(length: usize) -> usize {
    length.trailing_zeros() as usize - SEGMENT_PAIR_LENGTH.trailing_zeros() as usize
}

/// BMT hasher over a single chunk payload.
///
/// Data beyond 4096 bytes is ignored. The span is written separately because
/// intermediate tree chunks carry the length of the subtree they cover, not
/// the length of their own payload.
#[derive(Debug, Clone)]
pub struct Hasher {
    span: u64,
    buffer: Box<[u8; MAX_DATA_LENGTH]>,
    cursor: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create an empty hasher
    pub fn new() -> Self {
        Self {
            span: 0,
            buffer: Box::new([0u8; MAX_DATA_LENGTH]),
            cursor: 0,
        }
    }

    /// Set the span of data to be hashed
    pub const fn set_span(&mut self, span: u64) {
        self.span = span;
    }

    /// Get the current span
    pub const fn span(&self) -> u64 {
        self.span
    }

    /// Amount of payload buffered so far
    pub const fn len(&self) -> usize {
        self.cursor
    }

    /// Whether no payload has been written
    pub const fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Append payload bytes, truncating at the chunk size
    pub fn update(&mut self, data: &[u8]) {
        let take = data.len().min(MAX_DATA_LENGTH - self.cursor);
        self.buffer[self.cursor..self.cursor + take].copy_from_slice(&data[..take]);
        self.cursor += take;
    }

    /// Compute `keccak256(span_le ‖ bmt_root)` without consuming the hasher
    #[must_use]
    pub fn sum(&self) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(self.span.to_le_bytes());
        hasher.update(self.root());
        hasher.finalize()
    }

    /// Clear the payload and span
    pub fn reset(&mut self) {
        self.buffer.fill(0);
        self.cursor = 0;
        self.span = 0;
    }

    fn root(&self) -> B256 {
        if self.cursor == 0 {
            return ZERO_HASHES[ZERO_TREE_LEVELS - 1];
        }

        // Hash the smallest power-of-two subtree holding the data, then fold in
        // zero siblings up to the full tree.
        let mut size = self
            .cursor
            .next_power_of_two()
            .clamp(SEGMENT_PAIR_LENGTH, MAX_DATA_LENGTH);
        let mut root = self.subtree(&self.buffer[..size]);
        while size < MAX_DATA_LENGTH {
            root = keccak_pair(root.as_slice(), ZERO_HASHES[level_of(size)].as_slice());
            size *= 2;
        }
        root
    }

    fn subtree(&self, data: &[u8]) -> B256 {
        if data.len() == SEGMENT_PAIR_LENGTH {
            return keccak_pair(data, &[]);
        }

        let half = data.len() / 2;
        let (left, right) = data.split_at(half);
        let offset = data.as_ptr() as usize - self.buffer.as_ptr() as usize;

        let (l, r) = if offset + half >= self.cursor {
            (self.subtree(left), ZERO_HASHES[level_of(half)])
        } else {
            rayon::join(|| self.subtree(left), || self.subtree(right))
        };
        keccak_pair(l.as_slice(), r.as_slice())
    }
}
