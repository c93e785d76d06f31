//! Append-only history of access lists.

use alloy_primitives::B256;
use apiary_primitives::SwarmAddress;
use apiary_storage::{Cancellation, Getter, PipelineOptions, Putter, Splitter};
use bytes::{Buf, BufMut, BytesMut};

use crate::{AccessControlError, Result};

const VERSION: u8 = 1;
const RECORD_SIZE: usize = 40;

/// One history entry: the access list in force from `timestamp` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Unix seconds.
    pub timestamp: u64,
    /// Root of the access list.
    pub access_list: SwarmAddress,
}

/// Time-ordered access list versions.
///
/// Entries are only ever appended. Encoded as
/// `version (u8) ‖ count (u32 BE) ‖ (timestamp u64 BE ‖ root)*` in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn add(&mut self, access_list: SwarmAddress, timestamp: u64) {
        self.entries.push(HistoryEntry {
            timestamp,
            access_list,
        });
    }

    /// The entry in force at `timestamp`: the latest one not after it, and of
    /// several at the same time the one appended last.
    pub fn lookup(&self, timestamp: u64) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.timestamp <= timestamp)
            .fold(None, |best: Option<&HistoryEntry>, entry| match best {
                Some(best) if best.timestamp > entry.timestamp => Some(best),
                _ => Some(entry),
            })
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry was ever added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn encode(&self) -> BytesMut {
        let mut out = BytesMut::with_capacity(5 + self.entries.len() * RECORD_SIZE);
        out.put_u8(VERSION);
        out.put_u32(self.entries.len() as u32);
        for entry in &self.entries {
            out.put_u64(entry.timestamp);
            out.put_slice(entry.access_list.as_bytes());
        }
        out
    }

    fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < 5 {
            return Err(AccessControlError::malformed("history", "missing header"));
        }
        let version = data.get_u8();
        if version != VERSION {
            return Err(AccessControlError::malformed(
                "history",
                format!("unknown version {version}"),
            ));
        }
        let count = data.get_u32() as usize;
        if data.len() != count * RECORD_SIZE {
            return Err(AccessControlError::malformed(
                "history",
                format!("{count} entries in {} bytes", data.len()),
            ));
        }
        let entries = data
            .chunks_exact(RECORD_SIZE)
            .map(|mut record| HistoryEntry {
                timestamp: record.get_u64(),
                access_list: SwarmAddress(B256::from_slice(record)),
            })
            .collect();
        Ok(Self { entries })
    }

    /// Store this version of the history and return its root.
    ///
    /// Earlier versions stay in the store under their own roots.
    pub fn save(
        &self,
        cx: &Cancellation,
        putter: &mut dyn Putter,
        splitter: &dyn Splitter,
    ) -> Result<SwarmAddress> {
        Ok(splitter.split(cx, putter, &self.encode(), PipelineOptions::default())?)
    }

    /// Load the history stored under `root`.
    pub fn load(
        cx: &Cancellation,
        getter: &dyn Getter,
        splitter: &dyn Splitter,
        root: &SwarmAddress,
    ) -> Result<Self> {
        Self::decode(&splitter.join(cx, getter, root)?)
    }
}
