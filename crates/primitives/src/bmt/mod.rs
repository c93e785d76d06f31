//! Binary Merkle Tree (BMT) hashing for content addressing.
//!
//! A chunk's content address is `keccak256(span ‖ root)` where `root` is the
//! root of a binary keccak tree over the payload zero-padded to 4096 bytes.

mod hasher;

pub use hasher::Hasher;

/// Hash size in bytes (keccak256)
pub(crate) const HASH_SIZE: usize = 32;

/// Size of a segment in the BMT (same as hash size)
pub(crate) const SEGMENT_SIZE: usize = HASH_SIZE;

/// Length of a segment pair (two segments)
pub(crate) const SEGMENT_PAIR_LENGTH: usize = 2 * SEGMENT_SIZE;

/// Number of branches in the Binary Merkle Tree
pub const BRANCHES: usize = 128;

/// Maximum payload carried by a single chunk (128 branches * 32 byte segments)
pub const MAX_DATA_LENGTH: usize = BRANCHES * SEGMENT_SIZE;

/// Width of the little-endian span prefix
pub const SPAN_SIZE: usize = std::mem::size_of::<u64>();
