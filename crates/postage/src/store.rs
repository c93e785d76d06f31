//! Batch storage.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::{Batch, BatchId, ChainState};

/// Errors from batch store backends.
#[derive(Debug, Error)]
pub enum BatchStoreError {
    /// The backend could not be read or written.
    #[error("batch store backend: {0}")]
    Backend(String),
}

/// Looks up batches and the chain state they are judged against.
///
/// Implementations may keep batches in memory, on disk, or mirror them from a
/// chain node; all calls are synchronous.
pub trait BatchStore: Send + Sync + std::fmt::Debug {
    /// Retrieves a batch by its ID, `None` if unknown.
    fn get(&self, id: &BatchId) -> Result<Option<Batch>, BatchStoreError>;

    /// Stores or updates a batch.
    fn put(&self, batch: Batch) -> Result<(), BatchStoreError>;

    /// Checks if a batch exists in the store.
    fn contains(&self, id: &BatchId) -> Result<bool, BatchStoreError> {
        Ok(self.get(id)?.is_some())
    }

    /// Returns the current chain state.
    fn chain_state(&self) -> Result<ChainState, BatchStoreError>;

    /// Updates the chain state.
    fn set_chain_state(&self, state: ChainState) -> Result<(), BatchStoreError>;
}

/// In-memory batch store.
#[derive(Debug, Default)]
pub struct MemoryBatchStore {
    batches: RwLock<HashMap<BatchId, Batch>>,
    state: RwLock<ChainState>,
}

impl MemoryBatchStore {
    /// Creates an empty store at the given chain state.
    pub fn new(state: ChainState) -> Self {
        Self {
            batches: RwLock::default(),
            state: RwLock::new(state),
        }
    }
}

impl BatchStore for MemoryBatchStore {
    fn get(&self, id: &BatchId) -> Result<Option<Batch>, BatchStoreError> {
        Ok(self.batches.read().get(id).cloned())
    }

    fn put(&self, batch: Batch) -> Result<(), BatchStoreError> {
        self.batches.write().insert(batch.id(), batch);
        Ok(())
    }

    fn chain_state(&self) -> Result<ChainState, BatchStoreError> {
        Ok(*self.state.read())
    }

    fn set_chain_state(&self, state: ChainState) -> Result<(), BatchStoreError> {
        *self.state.write() = state;
        Ok(())
    }
}
