//! Utility functions for postage operations.

use apiary_primitives::SwarmAddress;
use std::time::{SystemTime, UNIX_EPOCH};

/// Collision bucket of a chunk: the first `bucket_depth` bits of its address.
///
/// ```
/// use apiary_postage::calculate_bucket;
/// use apiary_primitives::SwarmAddress;
///
/// let mut bytes = [0u8; 32];
/// bytes[..2].copy_from_slice(&[0xCB, 0xE5]);
/// assert_eq!(calculate_bucket(&SwarmAddress::new(bytes), 16), 0xCBE5);
/// ```
#[inline]
pub fn calculate_bucket(address: &SwarmAddress, bucket_depth: u8) -> u32 {
    if bucket_depth == 0 {
        return 0;
    }
    let b = address.as_bytes();
    let leading = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
    leading >> (32 - u32::from(bucket_depth))
}

/// Nanoseconds since the Unix epoch, as carried in stamps.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Chain state relevant to batch usability: current block and cumulative payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainState {
    block: u64,
    /// Total payout per chunk so far; batches whose value is at or below it are expired.
    total_amount: u128,
}

impl ChainState {
    /// Creates a new chain state.
    #[inline]
    pub const fn new(block: u64, total_amount: u128) -> Self {
        Self {
            block,
            total_amount,
        }
    }

    /// Returns the current block number.
    #[inline]
    pub const fn block(&self) -> u64 {
        self.block
    }

    /// Returns the cumulative payout per chunk.
    #[inline]
    pub const fn total_amount(&self) -> u128 {
        self.total_amount
    }
}
