//! Content-addressed chunk implementation
//!
//! A content-addressed chunk's address is the BMT hash of its body, so the
//! same span and payload always produce the same address.

use alloy_primitives::hex;
use bytes::Bytes;
use std::fmt;

use crate::error::{PrimitivesError, Result};

use super::bmt_body::BmtBody;
use super::traits::{BmtChunk, Chunk, ChunkAddress};

/// A content-addressed chunk.
///
/// Immutable once created; the address is computed lazily and cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    body: BmtBody,
}

impl ContentChunk {
    /// Create a new content chunk whose span is the payload length.
    ///
    /// Fails if the payload exceeds 4096 bytes.
    #[must_use = "this returns a new chunk without modifying the input"]
    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        Ok(Self::from_body(BmtBody::new(data)?))
    }

    /// Create a chunk with an explicit span, such as an intermediate tree node.
    #[must_use = "this returns a new chunk without modifying the input"]
    pub fn with_span(span: u64, data: impl Into<Bytes>) -> Result<Self> {
        Ok(Self::from_body(BmtBody::with_span(span, data)?))
    }

    /// Create a ContentChunk from a pre-existing BmtBody.
    #[must_use]
    pub const fn from_body(body: BmtBody) -> Self {
        Self { body }
    }

    /// The body this chunk wraps
    pub const fn body(&self) -> &BmtBody {
        &self.body
    }
}

impl Chunk for ContentChunk {
    fn address(&self) -> &ChunkAddress {
        self.body.hash()
    }

    fn data(&self) -> &Bytes {
        self.body.data()
    }

    fn size(&self) -> usize {
        self.body.size()
    }
}

impl BmtChunk for ContentChunk {
    fn span(&self) -> u64 {
        self.body.span()
    }
}

impl From<ContentChunk> for Bytes {
    fn from(chunk: ContentChunk) -> Self {
        chunk.body.into()
    }
}

impl TryFrom<Bytes> for ContentChunk {
    type Error = PrimitivesError;

    fn try_from(bytes: Bytes) -> Result<Self> {
        Ok(Self::from_body(BmtBody::try_from(bytes)?))
    }
}

impl TryFrom<&[u8]> for ContentChunk {
    type Error = PrimitivesError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::try_from(Bytes::copy_from_slice(bytes))
    }
}

impl fmt::Display for ContentChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentChunk[{}]",
            hex::encode(&self.address().as_bytes()[..8])
        )
    }
}

#[cfg(any(test, feature = "arbitrary"))]
impl<'a> arbitrary::Arbitrary<'a> for ContentChunk {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from_body(BmtBody::arbitrary(u)?))
    }
}
