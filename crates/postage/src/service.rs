//! The postage service: which batches this node may stamp with.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use parking_lot::RwLock;

use crate::{Batch, BatchId, BatchStore, BatchStoreError, MemoryIssuer, SharedIssuer, StampError};

/// Tracks live stamp issuers for the node's own batches and decides whether
/// a batch is usable for new uploads.
///
/// Issuers are live objects shared with open upload sessions. [`save`](Self::save)
/// copies an issuer's bucket state into the persisted snapshot; a session calls
/// it when it finalizes.
#[derive(Debug)]
pub struct PostageService {
    store: Arc<dyn BatchStore>,
    owner: Address,
    threshold: u64,
    issuers: RwLock<HashMap<BatchId, SharedIssuer>>,
    saved: RwLock<HashMap<BatchId, MemoryIssuer>>,
}

impl PostageService {
    /// Service for batches owned by `owner`, usable after `threshold` confirmations.
    pub fn new(store: Arc<dyn BatchStore>, owner: Address, threshold: u64) -> Self {
        Self {
            store,
            owner,
            threshold,
            issuers: RwLock::default(),
            saved: RwLock::default(),
        }
    }

    /// The batch store backing this service.
    pub fn store(&self) -> &Arc<dyn BatchStore> {
        &self.store
    }

    /// Owner whose batches this service stamps for.
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Start issuing for a batch, restoring saved bucket state when present.
    pub fn add(&self, batch: &Batch) -> SharedIssuer {
        let issuer = self
            .saved
            .read()
            .get(&batch.id())
            .cloned()
            .unwrap_or_else(|| MemoryIssuer::from_batch(batch));
        let shared = SharedIssuer::new(issuer);
        self.issuers.write().insert(batch.id(), shared.clone());
        shared
    }

    /// The live issuer for a batch.
    pub fn stamp_issuer(&self, id: &BatchId) -> Result<SharedIssuer, StampError> {
        self.issuers
            .read()
            .get(id)
            .cloned()
            .ok_or(StampError::BatchNotFound(*id))
    }

    /// Check that a batch exists, belongs to this node, is confirmed, unexpired
    /// and still has room. Returns the batch on success.
    pub fn usable_batch(&self, id: &BatchId) -> Result<Batch, UsableError> {
        let batch = self
            .store
            .get(id)?
            .ok_or(StampError::BatchNotFound(*id))?;
        if batch.owner() != self.owner {
            return Err(StampError::OwnerMismatch {
                expected: self.owner,
                actual: batch.owner(),
            }
            .into());
        }
        batch.check_usable(&self.store.chain_state()?, self.threshold)?;

        let issuer = self.stamp_issuer(id)?;
        if issuer.is_exhausted() {
            return Err(StampError::BucketFull {
                bucket: 0,
                capacity: batch.bucket_upper_bound(),
            }
            .into());
        }
        Ok(batch)
    }

    /// Persist the live issuer state of a batch.
    pub fn save(&self, id: &BatchId) -> Result<(), StampError> {
        let snapshot = self.stamp_issuer(id)?.snapshot();
        self.saved.write().insert(*id, snapshot);
        Ok(())
    }

    /// Last persisted issuer state for a batch.
    pub fn saved(&self, id: &BatchId) -> Option<MemoryIssuer> {
        self.saved.read().get(id).cloned()
    }
}

/// Why a batch cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum UsableError {
    /// The batch itself is unusable.
    #[error(transparent)]
    Stamp(#[from] StampError),
    /// The batch store failed.
    #[error(transparent)]
    Store(#[from] BatchStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChainState, MemoryBatchStore, StampIssuer};
    use alloy_primitives::B256;
    use apiary_primitives::SwarmAddress;

    fn service(block: u64) -> (PostageService, Batch) {
        let owner = Address::repeat_byte(1);
        let store = Arc::new(MemoryBatchStore::new(ChainState::new(block, 0)));
        let batch = Batch::new(B256::repeat_byte(2), 100, Some(10), owner, 17, 16, true);
        store.put(batch.clone()).unwrap();
        let service = PostageService::new(store, owner, 5);
        service.add(&batch);
        (service, batch)
    }

    #[test]
    fn usable_batch_checks_confirmations() {
        let (service, batch) = service(12);
        assert!(matches!(
            service.usable_batch(&batch.id()),
            Err(UsableError::Stamp(StampError::BatchNotUsable { .. }))
        ));

        service
            .store()
            .set_chain_state(ChainState::new(20, 0))
            .unwrap();
        assert_eq!(service.usable_batch(&batch.id()).unwrap(), batch);
    }

    #[test]
    fn unknown_batch_is_not_found() {
        let (service, _) = service(20);
        let missing = B256::repeat_byte(9);
        assert!(matches!(
            service.usable_batch(&missing),
            Err(UsableError::Stamp(StampError::BatchNotFound(id))) if id == missing
        ));
    }

    #[test]
    fn foreign_batch_is_rejected() {
        let (service, _) = service(20);
        let foreign = Batch::new(B256::repeat_byte(4), 100, Some(1), Address::ZERO, 17, 16, true);
        service.store().put(foreign.clone()).unwrap();
        service.add(&foreign);
        assert!(matches!(
            service.usable_batch(&foreign.id()),
            Err(UsableError::Stamp(StampError::OwnerMismatch { .. }))
        ));
    }

    #[test]
    fn exhausted_batch_is_rejected() {
        let (service, batch) = service(20);
        let mut issuer = service.stamp_issuer(&batch.id()).unwrap();
        let address = SwarmAddress::zero();
        for _ in 0..batch.bucket_upper_bound() {
            issuer.prepare_stamp(&address, 0).unwrap();
        }
        assert!(matches!(
            service.usable_batch(&batch.id()),
            Err(UsableError::Stamp(StampError::BucketFull { .. }))
        ));
    }

    #[test]
    fn save_snapshots_issuer_state() {
        let (service, batch) = service(20);
        let mut issuer = service.stamp_issuer(&batch.id()).unwrap();
        issuer.prepare_stamp(&SwarmAddress::zero(), 0).unwrap();

        assert!(service.saved(&batch.id()).is_none());
        service.save(&batch.id()).unwrap();
        assert_eq!(service.saved(&batch.id()).unwrap().stamps_issued(), 1);

        // A re-added issuer resumes from the saved state
        let resumed = service.add(&batch);
        assert_eq!(resumed.stamps_issued(), 1);
    }
}
