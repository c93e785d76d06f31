//! Single-owner chunk implementation
//!
//! A single-owner chunk wraps a content-addressed chunk together with a
//! 32-byte identifier and a signature by the owner over
//! `keccak256(id ‖ wrapped_address)`. Its address is `keccak256(id ‖ owner)`,
//! so an owner can publish successive contents under one address.
//!
//! Wire layout: `id (32) ‖ signature (65) ‖ span (8, LE) ‖ payload`.

use alloy_primitives::{Address, B256, Keccak256, Signature, hex};
use alloy_signer::SignerSync;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::sync::OnceLock;

use crate::PrimitivesError;
use crate::chunk::error::{self, ChunkError};
use crate::error::Result;

use super::bmt_body::BmtBody;
use super::content::ContentChunk;
use super::traits::{BmtChunk, Chunk, ChunkAddress};

/// Size of the identifier field
pub const ID_SIZE: usize = std::mem::size_of::<B256>();
/// Size of the serialized `r ‖ s ‖ v` signature
pub const SIGNATURE_SIZE: usize = 65;
const MIN_SOC_FIELDS_SIZE: usize = ID_SIZE + SIGNATURE_SIZE;

/// A single-owner chunk.
#[derive(Debug, Clone)]
pub struct SingleOwnerChunk {
    id: B256,
    signature: Signature,
    body: BmtBody,
    address_cache: OnceLock<ChunkAddress>,
    owner_cache: OnceLock<Address>,
}

impl SingleOwnerChunk {
    /// Create and sign a new single-owner chunk over `data`.
    #[must_use = "this returns a new chunk without modifying the input"]
    pub fn new(id: B256, data: impl Into<Bytes>, signer: &impl SignerSync) -> Result<Self> {
        let body = BmtBody::new(data)?;
        let signature = signer
            .sign_message_sync(Self::to_sign(&id, &body).as_ref())
            .map_err(ChunkError::from)?;
        Ok(Self::from_parts(id, signature, body))
    }

    /// Create a chunk from a pre-computed signature without checking it.
    #[must_use = "this returns a new chunk without modifying the input"]
    pub fn with_signature(id: B256, signature: Signature, data: impl Into<Bytes>) -> Result<Self> {
        Ok(Self::from_parts(id, signature, BmtBody::new(data)?))
    }

    /// Wrap `inner` under `id`, checking that `signature` was produced by `owner`.
    ///
    /// This is the path for externally signed uploads: the caller supplies the
    /// owner it claims, and the chunk is only built when the signature
    /// recovers exactly that owner.
    pub fn new_signed(
        owner: Address,
        id: B256,
        signature: Signature,
        inner: ContentChunk,
    ) -> Result<Self> {
        let chunk = Self::from_parts(id, signature, inner.body().clone());
        let recovered = chunk.owner()?;
        if recovered != owner {
            return Err(ChunkError::OwnerMismatch {
                claimed: owner,
                recovered,
            }
            .into());
        }
        Ok(chunk)
    }

    /// Create a SingleOwnerChunk from pre-computed parts.
    #[must_use]
    pub const fn from_parts(id: B256, signature: Signature, body: BmtBody) -> Self {
        Self {
            id,
            signature,
            body,
            address_cache: OnceLock::new(),
            owner_cache: OnceLock::new(),
        }
    }

    /// Get the owner's address, recovered from the signature.
    ///
    /// Successful recoveries are cached; failures are not.
    pub fn owner(&self) -> error::Result<Address> {
        if let Some(addr) = self.owner_cache.get() {
            return Ok(*addr);
        }

        let hash = Self::to_sign(&self.id, &self.body);
        let addr = self.signature.recover_address_from_msg(hash)?;
        let _ = self.owner_cache.set(addr);
        Ok(addr)
    }

    /// `keccak256(id ‖ wrapped_address)`, signed as an EIP-191 personal message
    fn to_sign(id: &B256, body: &BmtBody) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(id);
        hasher.update(body.hash());
        hasher.finalize()
    }

    /// Address of a chunk published by `owner` under `id`
    pub fn calculate_address(id: &B256, owner: &Address) -> ChunkAddress {
        let mut hasher = Keccak256::new();
        hasher.update(id);
        hasher.update(owner);
        hasher.finalize().into()
    }

    /// Get the ID of this chunk.
    pub const fn id(&self) -> B256 {
        self.id
    }

    /// Get the signature of this chunk.
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The content-addressed chunk carried inside the envelope
    pub fn wrapped(&self) -> ContentChunk {
        ContentChunk::from_body(self.body.clone())
    }

    /// Check that the signature recovers an owner and the chunk hashes to its own address.
    pub fn is_valid(&self) -> bool {
        self.owner().is_ok() && self.verify(self.address()).is_ok()
    }
}

impl Chunk for SingleOwnerChunk {
    fn address(&self) -> &ChunkAddress {
        self.address_cache.get_or_init(|| {
            // A signature that recovers nothing yields an address no caller can
            // ask for, so verification against any real address fails.
            let owner = self.owner().unwrap_or(Address::ZERO);
            Self::calculate_address(&self.id, &owner)
        })
    }

    fn data(&self) -> &Bytes {
        self.body.data()
    }

    fn size(&self) -> usize {
        MIN_SOC_FIELDS_SIZE + self.body.size()
    }

    fn verify(&self, expected: &ChunkAddress) -> Result<()> {
        self.owner()?;
        let actual = self.address();
        if actual != expected {
            return Err(ChunkError::verification_failed(*expected, *actual).into());
        }
        Ok(())
    }
}

impl BmtChunk for SingleOwnerChunk {
    fn span(&self) -> u64 {
        self.body.span()
    }
}

impl From<SingleOwnerChunk> for Bytes {
    fn from(chunk: SingleOwnerChunk) -> Self {
        let mut bytes = BytesMut::with_capacity(chunk.size());
        bytes.put_slice(chunk.id.as_slice());
        bytes.put_slice(&chunk.signature.as_bytes());
        bytes.put_slice(&chunk.body.to_bytes());
        bytes.freeze()
    }
}

impl TryFrom<Bytes> for SingleOwnerChunk {
    type Error = PrimitivesError;

    fn try_from(bytes: Bytes) -> Result<Self> {
        if bytes.len() < MIN_SOC_FIELDS_SIZE {
            return Err(ChunkError::invalid_size(
                "insufficient data for single-owner chunk",
                MIN_SOC_FIELDS_SIZE,
                bytes.len(),
            )
            .into());
        }

        let id = B256::from_slice(&bytes[..ID_SIZE]);
        let signature = Signature::from_raw(&bytes[ID_SIZE..MIN_SOC_FIELDS_SIZE])
            .map_err(ChunkError::from)?;
        let body = BmtBody::try_from(bytes.slice(MIN_SOC_FIELDS_SIZE..))?;

        Ok(Self::from_parts(id, signature, body))
    }
}

impl TryFrom<&[u8]> for SingleOwnerChunk {
    type Error = PrimitivesError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::try_from(Bytes::copy_from_slice(bytes))
    }
}

impl fmt::Display for SingleOwnerChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner_str = match self.owner() {
            Ok(addr) => hex::encode(addr.as_slice()),
            Err(_) => "invalid".to_string(),
        };
        write!(
            f,
            "SingleOwnerChunk[id={}, owner={}]",
            hex::encode(&self.id[..8]),
            owner_str
        )
    }
}

impl PartialEq for SingleOwnerChunk {
    fn eq(&self, other: &Self) -> bool {
        match (self.owner(), other.owner()) {
            (Ok(a), Ok(b)) => self.id == other.id && a == b && self.body == other.body,
            _ => false,
        }
    }
}

impl Eq for SingleOwnerChunk {}

#[cfg(any(test, feature = "arbitrary"))]
impl<'a> arbitrary::Arbitrary<'a> for SingleOwnerChunk {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let id = B256::arbitrary(u)?;
        let body = BmtBody::arbitrary(u)?;
        let signer = alloy_signer_local::PrivateKeySigner::random();
        let signature = signer
            .sign_message_sync(Self::to_sign(&id, &body).as_ref())
            .map_err(|_| arbitrary::Error::IncorrectFormat)?;

        Ok(Self::from_parts(id, signature, body))
    }
}
