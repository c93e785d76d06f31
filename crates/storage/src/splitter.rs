//! Byte streams to chunk trees and back.
//!
//! A tree is built bottom-up: the input is cut into 4096-byte leaves, and
//! every level above packs up to 128 child addresses into one intermediate
//! chunk whose span is the number of bytes the children cover. An input that
//! fits a single chunk is its own root.

use core::fmt;

use apiary_primitives::{Chunk, ContentChunk, MAX_CHUNK_SIZE, SwarmAddress};
use bytes::{Bytes, BytesMut};
use num_enum::TryFromPrimitiveError;
use tracing::trace;

use crate::{Cancellation, Getter, Putter, Result, StorageError};

const REF_SIZE: usize = 32;
const BRANCHES: usize = MAX_CHUNK_SIZE / REF_SIZE;

/// Erasure-coding level requested for an upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(strum::IntoStaticStr)]
#[derive(strum::EnumString)]
#[derive(strum::EnumIter)]
#[derive(num_enum::TryFromPrimitive)]
#[derive(num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum RedundancyLevel {
    /// No parity chunks.
    None = 0,
    /// Tolerates about 1% chunk loss.
    Medium = 1,
    /// Tolerates about 5% chunk loss.
    Strong = 2,
    /// Tolerates about 10% chunk loss.
    Insane = 3,
    /// Tolerates about 50% chunk loss.
    Paranoid = 4,
}

impl Default for RedundancyLevel {
    #[inline]
    fn default() -> Self {
        Self::None
    }
}

impl RedundancyLevel {
    /// Decode a level from its header byte.
    pub fn from_byte(byte: u8) -> core::result::Result<Self, TryFromPrimitiveError<Self>> {
        Self::try_from(byte)
    }

    /// Returns the string representation of the level.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for RedundancyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a byte stream is turned into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Encrypt every chunk of the tree.
    pub encrypt: bool,
    /// Erasure-coding level.
    pub redundancy: RedundancyLevel,
}

impl PipelineOptions {
    /// Options with the given redundancy and no encryption.
    pub const fn with_redundancy(redundancy: RedundancyLevel) -> Self {
        Self {
            encrypt: false,
            redundancy,
        }
    }
}

/// Splits byte streams into chunk trees and joins them back.
pub trait Splitter: Send + Sync + fmt::Debug {
    /// Write the tree for `data` into `putter` and return its root.
    fn split(
        &self,
        cx: &Cancellation,
        putter: &mut dyn Putter,
        data: &[u8],
        options: PipelineOptions,
    ) -> Result<SwarmAddress>;

    /// Read back the bytes of the tree under `root`.
    fn join(&self, cx: &Cancellation, getter: &dyn Getter, root: &SwarmAddress) -> Result<Bytes>;
}

/// The plain chunk-tree splitter.
///
/// Encrypted pipelines are not supported. Redundancy levels are accepted
/// but no parity chunks are produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkTree;

impl ChunkTree {
    fn put_node(
        cx: &Cancellation,
        putter: &mut dyn Putter,
        span: u64,
        payload: Bytes,
    ) -> Result<(SwarmAddress, u64)> {
        cx.check()?;
        let chunk = ContentChunk::with_span(span, payload)?;
        let address = *chunk.address();
        putter.put(cx, chunk.into())?;
        Ok((address, span))
    }

    fn join_into(
        cx: &Cancellation,
        getter: &dyn Getter,
        address: &SwarmAddress,
        out: &mut BytesMut,
    ) -> Result<()> {
        let chunk = getter.get(cx, address)?;
        let span = chunk.span();
        let data = chunk.data();

        if span <= MAX_CHUNK_SIZE as u64 {
            if data.len() as u64 != span {
                return Err(StorageError::InvalidTree(format!(
                    "leaf {address} holds {} bytes for span {span}",
                    data.len()
                )));
            }
            out.extend_from_slice(data);
            return Ok(());
        }

        if data.is_empty() || data.len() % REF_SIZE != 0 {
            return Err(StorageError::InvalidTree(format!(
                "intermediate {address} has {} reference bytes",
                data.len()
            )));
        }
        let start = out.len();
        for child in data.chunks_exact(REF_SIZE) {
            Self::join_into(cx, getter, &SwarmAddress::from_slice(child)?, out)?;
        }
        let joined = (out.len() - start) as u64;
        if joined != span {
            return Err(StorageError::InvalidTree(format!(
                "intermediate {address} spans {span} bytes but children hold {joined}"
            )));
        }
        Ok(())
    }
}

impl Splitter for ChunkTree {
    fn split(
        &self,
        cx: &Cancellation,
        putter: &mut dyn Putter,
        data: &[u8],
        options: PipelineOptions,
    ) -> Result<SwarmAddress> {
        if options.encrypt {
            return Err(StorageError::Unsupported("encrypted pipeline"));
        }

        if data.len() <= MAX_CHUNK_SIZE {
            let (root, _) = Self::put_node(cx, putter, data.len() as u64, Bytes::copy_from_slice(data))?;
            return Ok(root);
        }

        let mut level = data
            .chunks(MAX_CHUNK_SIZE)
            .map(|leaf| Self::put_node(cx, putter, leaf.len() as u64, Bytes::copy_from_slice(leaf)))
            .collect::<Result<Vec<_>>>()?;

        while level.len() > 1 {
            level = level
                .chunks(BRANCHES)
                .map(|children| {
                    let span: u64 = children.iter().map(|(_, span)| *span).sum();
                    let mut refs = BytesMut::with_capacity(children.len() * REF_SIZE);
                    for (address, _) in children {
                        refs.extend_from_slice(address.as_bytes());
                    }
                    Self::put_node(cx, putter, span, refs.freeze())
                })
                .collect::<Result<Vec<_>>>()?;
        }

        let (root, span) = level[0];
        trace!(%root, span, redundancy = %options.redundancy, "split tree");
        Ok(root)
    }

    fn join(&self, cx: &Cancellation, getter: &dyn Getter, root: &SwarmAddress) -> Result<Bytes> {
        let mut out = BytesMut::new();
        Self::join_into(cx, getter, root, &mut out)?;
        Ok(out.freeze())
    }
}
