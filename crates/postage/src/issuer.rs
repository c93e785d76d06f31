//! Stamp issuers: bucket bookkeeping for a batch.

use std::sync::Arc;

use apiary_primitives::SwarmAddress;
use parking_lot::Mutex;

use crate::{Batch, BatchId, StampDigest, StampError, StampIndex, calculate_bucket};

/// Allocates stamp indices within a batch.
///
/// The issuer only tracks and allocates; signing is left to a [`Stamper`](crate::Stamper)
/// so the same issuer state can back different signers.
pub trait StampIssuer {
    /// Allocate the next index in the chunk's bucket and return the digest to sign.
    ///
    /// # Errors
    ///
    /// Returns `StampError::BucketFull` if an immutable batch has no room left in the bucket.
    fn prepare_stamp(
        &mut self,
        address: &SwarmAddress,
        timestamp: u64,
    ) -> Result<StampDigest, StampError>;

    /// Returns the batch ID that stamps are issued for.
    fn batch_id(&self) -> BatchId;

    /// Returns the current utilization of the most-used bucket.
    fn max_bucket_utilization(&self) -> u32;

    /// Returns the total number of stamps issued.
    fn stamps_issued(&self) -> u64;
}

/// In-memory issuer holding one counter per bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryIssuer {
    batch_id: BatchId,
    depth: u8,
    bucket_depth: u8,
    immutable: bool,
    bucket_indices: Vec<u32>,
    max_utilization: u32,
    stamps_issued: u64,
}

impl MemoryIssuer {
    /// Creates a memory issuer from a batch.
    pub fn from_batch(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id(),
            depth: batch.depth(),
            bucket_depth: batch.bucket_depth(),
            immutable: batch.immutable(),
            bucket_indices: vec![0u32; batch.bucket_count() as usize],
            max_utilization: 0,
            stamps_issued: 0,
        }
    }

    /// Returns the maximum number of chunks per bucket.
    pub const fn bucket_capacity(&self) -> u32 {
        1u32 << (self.depth - self.bucket_depth)
    }

    /// An immutable batch with a full bucket can stamp nothing landing in that bucket.
    pub const fn is_exhausted(&self) -> bool {
        self.immutable && self.max_utilization >= self.bucket_capacity()
    }

    /// Returns the utilization of a specific bucket.
    pub fn bucket_utilization(&self, bucket: u32) -> u32 {
        self.bucket_indices
            .get(bucket as usize)
            .copied()
            .unwrap_or(0)
    }
}

impl StampIssuer for MemoryIssuer {
    fn prepare_stamp(
        &mut self,
        address: &SwarmAddress,
        timestamp: u64,
    ) -> Result<StampDigest, StampError> {
        let bucket = calculate_bucket(address, self.bucket_depth);
        let capacity = self.bucket_capacity();
        let slot = self
            .bucket_indices
            .get_mut(bucket as usize)
            .ok_or(StampError::InvalidIndex)?;

        let mut index = *slot;
        if index >= capacity {
            if self.immutable {
                return Err(StampError::BucketFull { bucket, capacity });
            }
            // Mutable batches wrap around and overwrite the oldest chunk.
            index = 0;
        }
        *slot = index + 1;
        self.stamps_issued += 1;
        self.max_utilization = self.max_utilization.max(index + 1);

        Ok(StampDigest::new(
            *address,
            self.batch_id,
            StampIndex::new(bucket, index),
            timestamp,
        ))
    }

    fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    fn max_bucket_utilization(&self) -> u32 {
        self.max_utilization
    }

    fn stamps_issued(&self) -> u64 {
        self.stamps_issued
    }
}

/// A [`MemoryIssuer`] shared between the postage service and open upload sessions.
#[derive(Debug, Clone)]
pub struct SharedIssuer(Arc<Mutex<MemoryIssuer>>);

impl SharedIssuer {
    /// Wrap an issuer for sharing.
    pub fn new(issuer: MemoryIssuer) -> Self {
        Self(Arc::new(Mutex::new(issuer)))
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> MemoryIssuer {
        self.0.lock().clone()
    }

    /// Whether the underlying issuer can no longer stamp.
    pub fn is_exhausted(&self) -> bool {
        self.0.lock().is_exhausted()
    }
}

impl StampIssuer for SharedIssuer {
    fn prepare_stamp(
        &mut self,
        address: &SwarmAddress,
        timestamp: u64,
    ) -> Result<StampDigest, StampError> {
        self.0.lock().prepare_stamp(address, timestamp)
    }

    fn batch_id(&self) -> BatchId {
        self.0.lock().batch_id()
    }

    fn max_bucket_utilization(&self) -> u32 {
        self.0.lock().max_bucket_utilization()
    }

    fn stamps_issued(&self) -> u64 {
        self.0.lock().stamps_issued()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};

    fn test_address(leading: u16) -> SwarmAddress {
        let mut bytes = [0u8; 32];
        bytes[..2].copy_from_slice(&leading.to_be_bytes());
        SwarmAddress::new(bytes)
    }

    fn issuer(immutable: bool) -> MemoryIssuer {
        MemoryIssuer::from_batch(&Batch::new(
            B256::ZERO,
            0,
            None,
            Address::ZERO,
            18,
            16,
            immutable,
        ))
    }

    #[test]
    fn allocates_sequential_indices() {
        let mut issuer = issuer(true);
        let address = test_address(0xCBE5);

        for expected in 0..4 {
            let digest = issuer.prepare_stamp(&address, 7).unwrap();
            assert_eq!(digest.index, StampIndex::new(0xCBE5, expected));
        }
        assert_eq!(issuer.bucket_utilization(0xCBE5), 4);
        assert_eq!(issuer.stamps_issued(), 4);
        assert!(issuer.is_exhausted());
    }

    #[test]
    fn immutable_bucket_fills_up() {
        let mut issuer = issuer(true);
        let address = test_address(1);
        for _ in 0..4 {
            issuer.prepare_stamp(&address, 0).unwrap();
        }
        assert_eq!(
            issuer.prepare_stamp(&address, 0),
            Err(StampError::BucketFull {
                bucket: 1,
                capacity: 4
            })
        );
    }

    #[test]
    fn mutable_bucket_wraps() {
        let mut issuer = issuer(false);
        let address = test_address(1);
        for _ in 0..4 {
            issuer.prepare_stamp(&address, 0).unwrap();
        }
        let digest = issuer.prepare_stamp(&address, 0).unwrap();
        assert_eq!(digest.index.index(), 0);
        assert!(!issuer.is_exhausted());
    }

    #[test]
    fn shared_issuer_sees_updates() {
        let shared = SharedIssuer::new(issuer(true));
        let mut handle = shared.clone();
        handle.prepare_stamp(&test_address(2), 0).unwrap();
        assert_eq!(shared.snapshot().stamps_issued(), 1);
    }
}
