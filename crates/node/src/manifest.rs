//! A flat metadata tree: paths mapped to references with string metadata.
//!
//! Encoded as
//! `version (u8) ‖ entries (u16) ‖ (path ‖ reference ‖ pairs (u16) ‖ (key ‖ value)*)*`
//! with every string prefixed by its u16 big-endian length. Entries and
//! metadata keys are written in sorted order, so equal trees share a root.

use std::collections::BTreeMap;

use apiary_primitives::SwarmAddress;
use apiary_storage::{Cancellation, Getter, PipelineOptions, Putter, Splitter};
use bytes::{Buf, BufMut, BytesMut};

use crate::{Error, Result};

const VERSION: u8 = 1;

/// Path of the single entry a feed manifest carries.
pub const ROOT_PATH: &str = "/";

/// One path in a [`MetadataTree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    /// What the path points to; zero for a pure metadata entry.
    pub reference: SwarmAddress,
    /// String metadata attached to the path.
    pub metadata: BTreeMap<String, String>,
}

impl ManifestEntry {
    /// Entry pointing at `reference` with `metadata`.
    pub fn new(reference: SwarmAddress, metadata: BTreeMap<String, String>) -> Self {
        Self {
            reference,
            metadata,
        }
    }
}

/// Paths mapped to [`ManifestEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTree {
    entries: BTreeMap<String, ManifestEntry>,
}

fn put_str(out: &mut BytesMut, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| Error::Manifest(format!("string of {} bytes is too long", value.len())))?;
    out.put_u16(len);
    out.put_slice(value.as_bytes());
    Ok(())
}

fn get_str(data: &mut &[u8]) -> Result<String> {
    if data.remaining() < 2 {
        return Err(Error::Manifest("truncated string length".into()));
    }
    let len = data.get_u16() as usize;
    if data.remaining() < len {
        return Err(Error::Manifest("truncated string".into()));
    }
    let slice: &[u8] = *data;
    let (value, rest) = slice.split_at(len);
    *data = rest;
    String::from_utf8(value.to_vec()).map_err(|e| Error::Manifest(e.to_string()))
}

fn get_u16(data: &mut &[u8]) -> Result<u16> {
    if data.remaining() < 2 {
        return Err(Error::Manifest("truncated count".into()));
    }
    Ok(data.get_u16())
}

impl MetadataTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry at `path`.
    pub fn add(&mut self, path: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(path.into(), entry);
    }

    /// The entry at `path`.
    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no paths.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn encode(&self) -> Result<BytesMut> {
        let mut out = BytesMut::new();
        out.put_u8(VERSION);
        out.put_u16(
            u16::try_from(self.entries.len()).map_err(|_| Error::Manifest("too many entries".into()))?,
        );
        for (path, entry) in &self.entries {
            put_str(&mut out, path)?;
            out.put_slice(entry.reference.as_bytes());
            out.put_u16(
                u16::try_from(entry.metadata.len())
                    .map_err(|_| Error::Manifest("too many metadata pairs".into()))?,
            );
            for (key, value) in &entry.metadata {
                put_str(&mut out, key)?;
                put_str(&mut out, value)?;
            }
        }
        Ok(out)
    }

    fn decode(mut data: &[u8]) -> Result<Self> {
        if data.remaining() < 1 || data.get_u8() != VERSION {
            return Err(Error::Manifest("unknown version".into()));
        }
        let mut entries = BTreeMap::new();
        for _ in 0..get_u16(&mut data)? {
            let path = get_str(&mut data)?;
            if data.remaining() < 32 {
                return Err(Error::Manifest("truncated reference".into()));
            }
            let reference = SwarmAddress::from_slice(&data[..32])?;
            data.advance(32);

            let mut metadata = BTreeMap::new();
            for _ in 0..get_u16(&mut data)? {
                let key = get_str(&mut data)?;
                metadata.insert(key, get_str(&mut data)?);
            }
            entries.insert(path, ManifestEntry::new(reference, metadata));
        }
        if data.has_remaining() {
            return Err(Error::Manifest(format!("{} trailing bytes", data.remaining())));
        }
        Ok(Self { entries })
    }

    /// Store the tree and return its root.
    pub fn save(
        &self,
        cx: &Cancellation,
        putter: &mut dyn Putter,
        splitter: &dyn Splitter,
        options: PipelineOptions,
    ) -> Result<SwarmAddress> {
        Ok(splitter.split(cx, putter, &self.encode()?, options)?)
    }

    /// Load the tree stored under `root`.
    pub fn load(
        cx: &Cancellation,
        getter: &dyn Getter,
        splitter: &dyn Splitter,
        root: &SwarmAddress,
    ) -> Result<Self> {
        Self::decode(&splitter.join(cx, getter, root)?)
    }
}
