//! Sequential feeds: numbered single-owner updates under an (owner, topic) pair.
//!
//! Update `i` is a single-owner chunk with id `keccak256(topic ‖ be64(i))`.
//! Its payload starts with the update time as a big-endian u64. A payload of
//! exactly that timestamp followed by a 32-byte reference is a legacy update
//! pointing at content stored elsewhere.

use std::fmt::Debug;

use alloy_primitives::{Address, B256, Keccak256};
use alloy_signer::SignerSync;
use apiary_primitives::{Chunk, ChunkError, PrimitivesError, SingleOwnerChunk, SwarmAddress};
use apiary_storage::{Cancellation, Getter, StorageError};
use bytes::{BufMut, Bytes, BytesMut};

const TIMESTAMP_SIZE: usize = 8;
const LEGACY_PAYLOAD_SIZE: usize = TIMESTAMP_SIZE + 32;

/// Metadata key holding the hex feed owner.
pub const FEED_OWNER_KEY: &str = "swarm-feed-owner";
/// Metadata key holding the hex feed topic.
pub const FEED_TOPIC_KEY: &str = "swarm-feed-topic";
/// Metadata key holding the feed type.
pub const FEED_TYPE_KEY: &str = "swarm-feed-type";

/// How a feed's updates are indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::IntoStaticStr)]
#[derive(strum::EnumString)]
#[derive(strum::Display)]
pub enum FeedType {
    /// Updates numbered 0, 1, 2, ...
    Sequence,
    /// Updates placed in a time-based epoch tree.
    Epoch,
}

/// A feed: the updates one owner publishes under one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Feed {
    owner: Address,
    topic: B256,
}

impl Feed {
    /// The feed of `owner` under `topic`.
    pub const fn new(owner: Address, topic: B256) -> Self {
        Self { owner, topic }
    }

    /// Returns the owner.
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Returns the topic.
    pub const fn topic(&self) -> B256 {
        self.topic
    }

    /// Single-owner chunk id of update `index`.
    pub fn update_id(&self, index: u64) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(self.topic);
        hasher.update(index.to_be_bytes());
        hasher.finalize()
    }

    /// Address of update `index`.
    pub fn update_address(&self, index: u64) -> SwarmAddress {
        SingleOwnerChunk::calculate_address(&self.update_id(index), &self.owner)
    }

    /// Sign update `index` carrying `payload`.
    pub fn new_update(
        &self,
        index: u64,
        payload: impl Into<Bytes>,
        signer: &impl SignerSync,
    ) -> apiary_primitives::Result<SingleOwnerChunk> {
        SingleOwnerChunk::new(self.update_id(index), payload, signer)
    }
}

/// Payload of a legacy update: `be64(timestamp) ‖ reference`.
pub fn legacy_payload(timestamp: u64, reference: &SwarmAddress) -> Bytes {
    let mut out = BytesMut::with_capacity(LEGACY_PAYLOAD_SIZE);
    out.put_u64(timestamp);
    out.put_slice(reference.as_bytes());
    out.freeze()
}

fn malformed(message: &'static str) -> StorageError {
    StorageError::Chunk(PrimitivesError::from(ChunkError::invalid_format(message)))
}

/// A feed update found by a lookup.
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    /// Position in the sequence.
    pub index: u64,
    /// Time the update claims.
    pub timestamp: u64,
    /// The update itself.
    pub chunk: SingleOwnerChunk,
}

impl FeedUpdate {
    fn from_chunk(index: u64, chunk: SingleOwnerChunk) -> Result<Self, StorageError> {
        let payload = chunk.data();
        if payload.len() < TIMESTAMP_SIZE {
            return Err(malformed("feed update shorter than its timestamp"));
        }
        let mut timestamp = [0u8; TIMESTAMP_SIZE];
        timestamp.copy_from_slice(&payload[..TIMESTAMP_SIZE]);
        Ok(Self {
            index,
            timestamp: u64::from_be_bytes(timestamp),
            chunk,
        })
    }

    /// Address of the content this update carries.
    ///
    /// A legacy update yields the reference it holds, which must be
    /// retrievable. Any other update yields its wrapped content chunk.
    pub fn wrapped_address(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
    ) -> Result<SwarmAddress, StorageError> {
        let payload = self.chunk.data();
        if payload.len() == LEGACY_PAYLOAD_SIZE {
            let reference = SwarmAddress::from_slice(&payload[TIMESTAMP_SIZE..])?;
            getter.get(cx, &reference)?;
            return Ok(reference);
        }
        Ok(*self.chunk.wrapped().address())
    }
}

/// Finds the latest update of a feed at a given time.
pub trait FeedLookup: Send + Sync + Debug {
    /// The latest update of `feed` not after `at`, probing from index `after`.
    ///
    /// `None` when the feed has no such update.
    fn at(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
        feed: &Feed,
        at: u64,
        after: u64,
    ) -> Result<Option<FeedUpdate>, StorageError>;
}

/// Linear lookup over a [`FeedType::Sequence`] feed.
///
/// Walks indices upward until an update is missing or newer than the
/// requested time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceLookup;

impl FeedLookup for SequenceLookup {
    fn at(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
        feed: &Feed,
        at: u64,
        after: u64,
    ) -> Result<Option<FeedUpdate>, StorageError> {
        let mut latest = None;
        for index in after..=u64::MAX {
            let chunk = match getter.get(cx, &feed.update_address(index)) {
                Ok(chunk) => chunk,
                Err(StorageError::NotFound(_)) => break,
                Err(err) => return Err(err),
            };
            let Some(soc) = chunk.as_single_owner() else {
                return Err(malformed("feed update is not a single-owner chunk"));
            };
            let update = FeedUpdate::from_chunk(index, soc.clone())?;
            if update.timestamp > at {
                break;
            }
            latest = Some(update);
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer_local::PrivateKeySigner;
    use apiary_primitives::{AnyChunk, ContentChunk};
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct Chunks(HashMap<SwarmAddress, AnyChunk>);

    impl Chunks {
        fn insert(&mut self, chunk: impl Into<AnyChunk>) {
            let chunk = chunk.into();
            self.0.insert(*chunk.address(), chunk);
        }
    }

    impl Getter for Chunks {
        fn get(&self, _: &Cancellation, address: &SwarmAddress) -> apiary_storage::Result<AnyChunk> {
            self.0
                .get(address)
                .cloned()
                .ok_or(StorageError::NotFound(*address))
        }

        fn has(&self, address: &SwarmAddress) -> apiary_storage::Result<bool> {
            Ok(self.0.contains_key(address))
        }
    }

    fn feed(signer: &PrivateKeySigner) -> Feed {
        Feed::new(signer.address(), B256::repeat_byte(0x70))
    }

    #[test]
    fn update_addresses_are_owner_scoped() {
        let a = feed(&PrivateKeySigner::random());
        let b = feed(&PrivateKeySigner::random());
        assert_eq!(a.update_id(3), b.update_id(3));
        assert_ne!(a.update_address(3), b.update_address(3));
        assert_ne!(a.update_address(3), a.update_address(4));
    }

    #[test]
    fn never_updated_feed_has_no_update() {
        let signer = PrivateKeySigner::random();
        let found = SequenceLookup
            .at(&Cancellation::new(), &Chunks::default(), &feed(&signer), 100, 0)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn lookup_respects_time() {
        let signer = PrivateKeySigner::random();
        let feed = feed(&signer);
        let mut chunks = Chunks::default();

        let mut targets = Vec::new();
        for (index, timestamp) in [(0u64, 10u64), (1, 20), (2, 30)] {
            let target = ContentChunk::new(format!("version {index}").into_bytes()).unwrap();
            targets.push(*target.address());
            chunks.insert(target.clone());
            let update = feed
                .new_update(index, legacy_payload(timestamp, target.address()), &signer)
                .unwrap();
            chunks.insert(update);
        }

        let cx = Cancellation::new();
        let at = |time| {
            SequenceLookup
                .at(&cx, &chunks, &feed, time, 0)
                .unwrap()
                .map(|update| update.wrapped_address(&cx, &chunks).unwrap())
        };
        assert_eq!(at(5), None);
        assert_eq!(at(10), Some(targets[0]));
        assert_eq!(at(25), Some(targets[1]));
        assert_eq!(at(u64::MAX), Some(targets[2]));
    }

    #[test]
    fn last_index_ends_the_walk() {
        let signer = PrivateKeySigner::random();
        let feed = feed(&signer);
        let mut chunks = Chunks::default();
        let target = ContentChunk::new(b"final".to_vec()).unwrap();
        chunks.insert(target.clone());
        let update = feed
            .new_update(u64::MAX, legacy_payload(10, target.address()), &signer)
            .unwrap();
        chunks.insert(update);

        let cx = Cancellation::new();
        let found = SequenceLookup
            .at(&cx, &chunks, &feed, 100, u64::MAX)
            .unwrap()
            .unwrap();
        assert_eq!(found.index, u64::MAX);
        assert_eq!(found.wrapped_address(&cx, &chunks).unwrap(), *target.address());
    }

    #[test]
    fn non_legacy_update_yields_wrapped_chunk() {
        let signer = PrivateKeySigner::random();
        let feed = feed(&signer);
        let mut payload = 7u64.to_be_bytes().to_vec();
        payload.extend_from_slice(b"inline content");
        let soc = feed.new_update(0, payload, &signer).unwrap();
        let wrapped = *soc.wrapped().address();

        let mut chunks = Chunks::default();
        chunks.insert(soc);
        let cx = Cancellation::new();
        let update = SequenceLookup.at(&cx, &chunks, &feed, 7, 0).unwrap().unwrap();
        assert_eq!(update.index, 0);
        assert_eq!(update.wrapped_address(&cx, &chunks).unwrap(), wrapped);
    }

    #[test]
    fn missing_legacy_target_is_not_found() {
        let signer = PrivateKeySigner::random();
        let feed = feed(&signer);
        let target = SwarmAddress::new([9; 32]);
        let mut chunks = Chunks::default();
        chunks.insert(feed.new_update(0, legacy_payload(1, &target), &signer).unwrap());

        let cx = Cancellation::new();
        let update = SequenceLookup.at(&cx, &chunks, &feed, 1, 0).unwrap().unwrap();
        assert!(matches!(
            update.wrapped_address(&cx, &chunks),
            Err(StorageError::NotFound(address)) if address == target
        ));
    }

    #[test]
    fn feed_type_names() {
        assert_eq!(FeedType::Sequence.to_string(), "Sequence");
        assert_eq!("Epoch".parse::<FeedType>().unwrap(), FeedType::Epoch);
    }
}
