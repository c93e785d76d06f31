//! In-memory chunk store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use apiary_postage::Stamp;
use apiary_primitives::{AnyChunk, MAX_CHUNK_SIZE, SwarmAddress};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{
    Cancellation, Getter, PutterSession, Result, SessionInfo, SessionOpener, StampedChunk,
    StorageError,
};

#[derive(Debug)]
struct Entry {
    chunk: AnyChunk,
    stamp: Stamp,
    /// Write that owns the entry until it is committed.
    pending: Option<u64>,
}

#[derive(Debug, Default)]
struct Inner {
    chunks: RwLock<HashMap<SwarmAddress, Entry>>,
    sessions: RwLock<HashMap<u64, SessionInfo>>,
    pins: RwLock<HashSet<SwarmAddress>>,
    next_session: AtomicU64,
    next_write: AtomicU64,
}

const REF_SIZE: usize = 32;

/// Commit the chunks of the tree under `root` that `write` still owns.
///
/// Intermediate nodes are followed through their child references, whoever
/// owns them. Chunks outside the tree are left as they are.
fn commit_tree(chunks: &mut HashMap<SwarmAddress, Entry>, write: u64, root: SwarmAddress) -> usize {
    let mut committed = 0;
    let mut seen = HashSet::new();
    let mut queue = vec![root];
    while let Some(address) = queue.pop() {
        if !seen.insert(address) {
            continue;
        }
        let Some(entry) = chunks.get_mut(&address) else {
            continue;
        };
        if entry.pending == Some(write) {
            entry.pending = None;
            committed += 1;
        }
        let chunk = &entry.chunk;
        if chunk.as_content().is_some() && chunk.span() > MAX_CHUNK_SIZE as u64 {
            queue.extend(
                chunk
                    .data()
                    .chunks_exact(REF_SIZE)
                    .filter_map(|child| SwarmAddress::from_slice(child).ok()),
            );
        }
    }
    committed
}

/// A chunk store held in memory.
///
/// Chunks written through a session are readable right away but stay owned
/// by that session's write until the root of a tree they belong to is
/// finalized. Cleaning up the session
/// removes exactly the chunks it added; chunks that were already present are
/// never taken over by a later write.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks, committed or not.
    pub fn len(&self) -> usize {
        self.inner.chunks.read().len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a chunk is stored and committed.
    pub fn is_committed(&self, address: &SwarmAddress) -> bool {
        self.inner
            .chunks
            .read()
            .get(address)
            .is_some_and(|entry| entry.pending.is_none())
    }

    /// Number of chunks still owned by an unfinished write.
    pub fn uncommitted(&self) -> usize {
        self.inner
            .chunks
            .read()
            .values()
            .filter(|entry| entry.pending.is_some())
            .count()
    }

    /// The stamp a chunk was stored with.
    pub fn stamp(&self, address: &SwarmAddress) -> Option<Stamp> {
        self.inner
            .chunks
            .read()
            .get(address)
            .map(|entry| entry.stamp.clone())
    }

    /// Whether a root was pinned by a finalized upload.
    pub fn is_pinned(&self, root: &SwarmAddress) -> bool {
        self.inner.pins.read().contains(root)
    }

    fn open(&self, pin: bool, session: Option<u64>) -> MemorySession {
        MemorySession {
            inner: Arc::clone(&self.inner),
            write: self.inner.next_write.fetch_add(1, Ordering::Relaxed) + 1,
            session,
            pin,
            owned: Vec::new(),
            closed: false,
        }
    }
}

impl Getter for MemoryStore {
    fn get(&self, cx: &Cancellation, address: &SwarmAddress) -> Result<AnyChunk> {
        cx.check()?;
        self.inner
            .chunks
            .read()
            .get(address)
            .map(|entry| entry.chunk.clone())
            .ok_or(StorageError::NotFound(*address))
    }

    fn has(&self, address: &SwarmAddress) -> Result<bool> {
        Ok(self.inner.chunks.read().contains_key(address))
    }
}

impl SessionOpener for MemoryStore {
    fn new_session(&self) -> Result<SessionInfo> {
        let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let info = SessionInfo {
            id,
            ..Default::default()
        };
        self.inner.sessions.write().insert(id, info);
        debug!(session = id, "upload session created");
        Ok(info)
    }

    fn session(&self, id: u64) -> Result<SessionInfo> {
        self.inner
            .sessions
            .read()
            .get(&id)
            .copied()
            .ok_or(StorageError::SessionNotFound(id))
    }

    fn upload(&self, pin: bool, session_id: u64) -> Result<Box<dyn PutterSession>> {
        let session = match session_id {
            0 => None,
            id => Some(self.session(id)?.id),
        };
        Ok(Box::new(self.open(pin, session)))
    }

    fn direct_upload(&self) -> Result<Box<dyn PutterSession>> {
        Ok(Box::new(self.open(false, None)))
    }
}

/// A write transaction against a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    inner: Arc<Inner>,
    write: u64,
    session: Option<u64>,
    pin: bool,
    owned: Vec<SwarmAddress>,
    closed: bool,
}

impl MemorySession {
    fn with_info(&self, f: impl FnOnce(&mut SessionInfo)) {
        let Some(id) = self.session else { return };
        if let Some(info) = self.inner.sessions.write().get_mut(&id) {
            f(info);
        }
    }

    fn discard(&mut self) -> usize {
        let mut chunks = self.inner.chunks.write();
        let mut removed = 0;
        for address in self.owned.drain(..) {
            if chunks
                .get(&address)
                .is_some_and(|entry| entry.pending == Some(self.write))
            {
                chunks.remove(&address);
                removed += 1;
            }
        }
        removed
    }
}

impl PutterSession for MemorySession {
    fn put(&mut self, cx: &Cancellation, chunk: StampedChunk) -> Result<()> {
        cx.check()?;
        if self.closed {
            return Err(StorageError::Closed);
        }

        let address = *chunk.address();
        let stored = {
            let mut chunks = self.inner.chunks.write();
            if chunks.contains_key(&address) {
                false
            } else {
                let (chunk, stamp) = chunk.into_parts();
                chunks.insert(
                    address,
                    Entry {
                        chunk,
                        stamp,
                        pending: Some(self.write),
                    },
                );
                true
            }
        };
        if stored {
            self.owned.push(address);
        }
        trace!(%address, stored, "chunk written");

        self.with_info(|info| {
            info.split += 1;
            info.stored += u64::from(stored);
        });
        Ok(())
    }

    fn done(&mut self, cx: &Cancellation, root: SwarmAddress) -> Result<()> {
        cx.check()?;
        if self.closed {
            return Err(StorageError::Closed);
        }

        let write = self.write;
        let committed = {
            let mut chunks = self.inner.chunks.write();
            let committed = commit_tree(&mut chunks, write, root);
            self.owned.retain(|address| {
                chunks
                    .get(address)
                    .is_some_and(|entry| entry.pending == Some(write))
            });
            committed
        };
        if self.pin {
            self.inner.pins.write().insert(root);
        }
        self.with_info(|info| info.root = Some(root));
        debug!(%root, committed, pinned = self.pin, "upload finalized");
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        let removed = self.discard();
        self.closed = true;
        if removed > 0 {
            debug!(removed, "upload discarded");
        }
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.discard();
    }
}
