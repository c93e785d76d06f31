use std::sync::Arc;

use alloy_primitives::{B256, hex};
use alloy_signer_local::PrivateKeySigner;
use apiary_postage::{
    Batch, BatchId, BatchStamper, BatchStore, ChainState, MemoryBatchStore, MemoryIssuer, Stamper,
};
use apiary_primitives::SwarmAddress;
use apiary_storage::{Cancellation, MemoryStore};

use crate::{ManualClock, Node, NodeConfig, UploadOptions};

/// A node over in-memory stores with one usable batch.
pub(crate) struct TestNode {
    pub(crate) node: Node,
    pub(crate) store: MemoryStore,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) batch: BatchId,
    pub(crate) owner: PrivateKeySigner,
    pub(crate) cx: Cancellation,
}

impl TestNode {
    pub(crate) fn new() -> Self {
        Self::with_config(NodeConfig::default())
    }

    pub(crate) fn with_config(config: NodeConfig) -> Self {
        let signer = PrivateKeySigner::random();
        let batches = Arc::new(MemoryBatchStore::new(ChainState::new(100, 0)));
        let batch = Batch::new(B256::repeat_byte(7), 1, Some(1), signer.address(), 22, 16, true);
        batches.put(batch.clone()).unwrap();

        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(500));
        let node = Node::new(
            config,
            signer.clone(),
            Arc::new(store.clone()),
            batches,
            clock.clone(),
        );
        node.postage().add(&batch);
        Self {
            node,
            store,
            clock,
            batch: batch.id(),
            owner: signer,
            cx: Cancellation::new(),
        }
    }

    pub(crate) fn options(&self) -> UploadOptions {
        UploadOptions::new(hex::encode(self.batch))
    }

    /// An encoded stamp for `address` signed by `signer` on the node's batch.
    pub(crate) fn presigned(&self, address: &SwarmAddress, signer: &PrivateKeySigner) -> Vec<u8> {
        let batch = self.node.postage().store().get(&self.batch).unwrap().unwrap();
        let stamp = BatchStamper::new(MemoryIssuer::from_batch(&batch), signer.clone())
            .stamp(address)
            .unwrap();
        stamp.to_bytes().to_vec()
    }
}
