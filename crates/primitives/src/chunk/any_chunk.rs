//! Type-erased chunk type

use bytes::Bytes;

use crate::error::Result;

use super::content::ContentChunk;
use super::error::ChunkError;
use super::single_owner::SingleOwnerChunk;
use super::traits::{BmtChunk, Chunk, ChunkAddress};

/// Either chunk kind, for stores and callers that handle both.
///
/// # Examples
///
/// ```
/// use apiary_primitives::{AnyChunk, Chunk, ContentChunk};
///
/// let content = ContentChunk::new(&b"hello world"[..]).unwrap();
/// let any: AnyChunk = content.clone().into();
///
/// assert_eq!(any.as_content().unwrap().address(), content.address());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyChunk {
    /// A content-addressed chunk (CAC).
    Content(ContentChunk),
    /// A single-owner chunk (SOC).
    SingleOwner(SingleOwnerChunk),
}

impl AnyChunk {
    /// Decode wire bytes of unknown kind.
    ///
    /// Content-addressed decoding is tried first. Bytes that do not form a
    /// valid content chunk are decoded as a single-owner envelope, which must
    /// then carry a recoverable signature.
    pub fn parse(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        match ContentChunk::try_from(bytes.clone()) {
            Ok(chunk) => Ok(Self::Content(chunk)),
            Err(_) => {
                let soc = SingleOwnerChunk::try_from(bytes)?;
                if !soc.is_valid() {
                    return Err(ChunkError::invalid_format("invalid single-owner chunk").into());
                }
                Ok(Self::SingleOwner(soc))
            }
        }
    }

    /// Get the address of this chunk.
    pub fn address(&self) -> &ChunkAddress {
        match self {
            Self::Content(c) => c.address(),
            Self::SingleOwner(c) => c.address(),
        }
    }

    /// Get the payload contained in this chunk.
    pub fn data(&self) -> &Bytes {
        match self {
            Self::Content(c) => c.data(),
            Self::SingleOwner(c) => c.data(),
        }
    }

    /// Get the span of this chunk.
    pub fn span(&self) -> u64 {
        match self {
            Self::Content(c) => c.span(),
            Self::SingleOwner(c) => c.span(),
        }
    }

    /// Get the total encoded size of this chunk in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Content(c) => c.size(),
            Self::SingleOwner(c) => c.size(),
        }
    }

    /// Verify that this chunk's address matches an expected address.
    pub fn verify(&self, expected: &ChunkAddress) -> Result<()> {
        match self {
            Self::Content(c) => c.verify(expected),
            Self::SingleOwner(c) => c.verify(expected),
        }
    }

    /// Returns the content chunk, if this is one.
    pub const fn as_content(&self) -> Option<&ContentChunk> {
        match self {
            Self::Content(c) => Some(c),
            Self::SingleOwner(_) => None,
        }
    }

    /// Returns the single-owner chunk, if this is one.
    pub const fn as_single_owner(&self) -> Option<&SingleOwnerChunk> {
        match self {
            Self::SingleOwner(c) => Some(c),
            Self::Content(_) => None,
        }
    }

    /// Wire encoding of the chunk
    pub fn to_bytes(&self) -> Bytes {
        self.clone().into()
    }
}

impl From<ContentChunk> for AnyChunk {
    fn from(chunk: ContentChunk) -> Self {
        Self::Content(chunk)
    }
}

impl From<SingleOwnerChunk> for AnyChunk {
    fn from(chunk: SingleOwnerChunk) -> Self {
        Self::SingleOwner(chunk)
    }
}

impl From<AnyChunk> for Bytes {
    fn from(chunk: AnyChunk) -> Self {
        match chunk {
            AnyChunk::Content(c) => c.into(),
            AnyChunk::SingleOwner(c) => c.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use alloy_signer_local::PrivateKeySigner;

    #[test]
    fn parse_prefers_content() {
        let chunk = ContentChunk::new(b"payload".to_vec()).unwrap();
        let parsed = AnyChunk::parse(Bytes::from(chunk.clone())).unwrap();
        assert_eq!(parsed.as_content(), Some(&chunk));
    }

    #[test]
    fn parse_falls_back_to_single_owner() {
        // Payload long enough that the envelope cannot pass as a content chunk
        let wallet = PrivateKeySigner::random();
        let soc = SingleOwnerChunk::new(B256::repeat_byte(7), vec![9u8; 4096], &wallet).unwrap();
        let parsed = AnyChunk::parse(Bytes::from(soc.clone())).unwrap();
        assert_eq!(parsed.address(), soc.address());
        assert!(parsed.as_single_owner().is_some());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(AnyChunk::parse(vec![0xffu8; 5000]).is_err());
    }
}
