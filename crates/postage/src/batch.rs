//! Postage batch types.

use alloy_primitives::{Address, B256};

use crate::{ChainState, StampError};

/// A 32-byte batch identifier.
pub type BatchId = B256;

/// A prepaid storage allocation.
///
/// A batch of depth `d` can stamp `2^d` chunks, spread over `2^bucket_depth`
/// collision buckets keyed by the leading bits of each chunk address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Batch {
    id: BatchId,
    /// Normalized balance per chunk.
    value: u128,
    /// Block the batch was created at; `None` until the creation is observed on chain.
    block_created: Option<u64>,
    owner: Address,
    depth: u8,
    bucket_depth: u8,
    /// Immutable batches refuse stamps once a bucket is full instead of overwriting.
    immutable: bool,
}

impl Batch {
    /// Creates a new batch with the given parameters.
    #[inline]
    pub const fn new(
        id: BatchId,
        value: u128,
        block_created: Option<u64>,
        owner: Address,
        depth: u8,
        bucket_depth: u8,
        immutable: bool,
    ) -> Self {
        Self {
            id,
            value,
            block_created,
            owner,
            depth,
            bucket_depth,
            immutable,
        }
    }

    /// Returns the batch ID.
    #[inline]
    pub const fn id(&self) -> BatchId {
        self.id
    }

    /// Returns the normalized value (balance per chunk).
    #[inline]
    pub const fn value(&self) -> u128 {
        self.value
    }

    /// Returns the block number when this batch was created.
    #[inline]
    pub const fn block_created(&self) -> Option<u64> {
        self.block_created
    }

    /// Returns the owner's Ethereum address.
    #[inline]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Returns the batch depth.
    #[inline]
    pub const fn depth(&self) -> u8 {
        self.depth
    }

    /// Returns the bucket depth.
    #[inline]
    pub const fn bucket_depth(&self) -> u8 {
        self.bucket_depth
    }

    /// Returns whether this batch is immutable.
    #[inline]
    pub const fn immutable(&self) -> bool {
        self.immutable
    }

    /// Returns the maximum number of chunks per bucket, `2^(depth - bucket_depth)`.
    #[inline]
    pub const fn bucket_upper_bound(&self) -> u32 {
        1u32 << (self.depth - self.bucket_depth)
    }

    /// Returns the number of collision buckets, `2^bucket_depth`.
    #[inline]
    pub const fn bucket_count(&self) -> u32 {
        1u32 << self.bucket_depth
    }

    /// A batch expires once the cumulative payout reaches its per-chunk value.
    #[inline]
    pub const fn is_expired(&self, state: &ChainState) -> bool {
        self.value <= state.total_amount()
    }

    /// Check that the batch is confirmed, buried under `threshold` blocks and not expired.
    pub const fn check_usable(&self, state: &ChainState, threshold: u64) -> Result<(), StampError> {
        let Some(created) = self.block_created else {
            return Err(StampError::BatchPending);
        };
        if state.block() < created.saturating_add(threshold) {
            return Err(StampError::BatchNotUsable {
                created,
                current: state.block(),
                threshold,
            });
        }
        if self.is_expired(state) {
            return Err(StampError::BatchExpired {
                value: self.value,
                total_amount: state.total_amount(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(value: u128, created: Option<u64>) -> Batch {
        Batch::new(B256::ZERO, value, created, Address::ZERO, 18, 16, false)
    }

    #[test]
    fn test_bucket_calculations() {
        let batch = batch(0, None);

        // 2^(18-16) = 4 chunks per bucket
        assert_eq!(batch.bucket_upper_bound(), 4);
        assert_eq!(batch.bucket_count(), 65536);
    }

    #[test]
    fn usable_after_threshold() {
        let batch = batch(1000, Some(100));
        assert!(batch.check_usable(&ChainState::new(105, 10), 5).is_ok());
        assert!(matches!(
            batch.check_usable(&ChainState::new(104, 10), 5),
            Err(StampError::BatchNotUsable { .. })
        ));
    }

    #[test]
    fn expired_and_pending_are_rejected() {
        assert!(matches!(
            batch(1000, Some(1)).check_usable(&ChainState::new(50, 1000), 0),
            Err(StampError::BatchExpired { .. })
        ));
        assert_eq!(
            batch(1000, None).check_usable(&ChainState::new(50, 0), 0),
            Err(StampError::BatchPending)
        );
    }
}
