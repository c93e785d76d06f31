//! Store and session traits.

use apiary_postage::Stamp;
use apiary_primitives::{AnyChunk, SwarmAddress};

use crate::{Cancellation, Result};

/// A chunk together with the stamp that pays for storing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedChunk {
    chunk: AnyChunk,
    stamp: Stamp,
}

impl StampedChunk {
    /// Pair a chunk with its stamp.
    pub const fn new(chunk: AnyChunk, stamp: Stamp) -> Self {
        Self { chunk, stamp }
    }

    /// The chunk.
    pub const fn chunk(&self) -> &AnyChunk {
        &self.chunk
    }

    /// The stamp.
    pub const fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    /// Address of the chunk.
    pub fn address(&self) -> &SwarmAddress {
        self.chunk.address()
    }

    /// Split into chunk and stamp.
    pub fn into_parts(self) -> (AnyChunk, Stamp) {
        (self.chunk, self.stamp)
    }
}

/// Bookkeeping for a tracked upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionInfo {
    /// Session id, never zero.
    pub id: u64,
    /// Chunks written through the session, duplicates included.
    pub split: u64,
    /// Chunks the session added to the store.
    pub stored: u64,
    /// Last root finalized through the session.
    pub root: Option<SwarmAddress>,
}

/// Reads chunks by address.
pub trait Getter: Send + Sync {
    /// Retrieve the chunk stored under `address`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`](crate::StorageError::NotFound) when nothing is stored there.
    fn get(&self, cx: &Cancellation, address: &SwarmAddress) -> Result<AnyChunk>;

    /// Whether a chunk is stored under `address`.
    fn has(&self, address: &SwarmAddress) -> Result<bool>;
}

/// Accepts chunks that still need to be paid for.
///
/// Splitters write into a `Putter`; the upload session behind it stamps each
/// chunk on its way to the store.
pub trait Putter {
    /// Write one chunk.
    fn put(&mut self, cx: &Cancellation, chunk: AnyChunk) -> Result<()>;
}

/// A store-side write transaction of stamped chunks.
///
/// Chunks put into a session stay uncommitted until [`done`](Self::done) is
/// called with the root they belong to. [`cleanup`](Self::cleanup) discards
/// everything still uncommitted; dropping the session does the same.
pub trait PutterSession: Send {
    /// Write one stamped chunk.
    fn put(&mut self, cx: &Cancellation, chunk: StampedChunk) -> Result<()>;

    /// Commit the chunks of the tree under `root` written by this session.
    ///
    /// Chunks outside that tree stay uncommitted.
    fn done(&mut self, cx: &Cancellation, root: SwarmAddress) -> Result<()>;

    /// Discard every uncommitted chunk.
    fn cleanup(&mut self) -> Result<()>;
}

/// Opens upload sessions.
pub trait SessionOpener: Send + Sync {
    /// Start tracking a new upload session.
    fn new_session(&self) -> Result<SessionInfo>;

    /// Bookkeeping of an existing session.
    ///
    /// # Errors
    ///
    /// [`StorageError::SessionNotFound`](crate::StorageError::SessionNotFound) for unknown ids.
    fn session(&self, id: u64) -> Result<SessionInfo>;

    /// Open a deferred upload attached to session `session_id`, pinning every
    /// root it finalizes when `pin` is set. A zero id opens an untracked upload.
    fn upload(&self, pin: bool, session_id: u64) -> Result<Box<dyn PutterSession>>;

    /// Open an upload that is pushed straight to the network.
    fn direct_upload(&self) -> Result<Box<dyn PutterSession>>;
}

/// A full chunk store: reads and upload sessions.
pub trait ChunkStore: Getter + SessionOpener + std::fmt::Debug {}

impl<T: Getter + SessionOpener + std::fmt::Debug> ChunkStore for T {}
