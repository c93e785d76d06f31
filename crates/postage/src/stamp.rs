//! Postage stamp types.

use alloy_primitives::{Address, B256, Signature, keccak256};
use apiary_primitives::SwarmAddress;
use byteorder::{BigEndian, ByteOrder};

use crate::{Batch, BatchId, StampError, calculate_bucket};

/// The size of a serialized stamp in bytes.
///
/// Layout: batch_id (32) + bucket (4) + index (4) + timestamp (8) + signature (65) = 113 bytes
pub const STAMP_SIZE: usize = 113;

/// A serialized postage stamp as a fixed-size byte array.
pub type StampBytes = [u8; STAMP_SIZE];

/// Position of a chunk within a batch: collision bucket and slot in that bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StampIndex {
    bucket: u32,
    index: u32,
}

impl StampIndex {
    /// Creates a new stamp index.
    #[inline]
    pub const fn new(bucket: u32, index: u32) -> Self {
        Self { bucket, index }
    }

    /// Returns the collision bucket.
    #[inline]
    pub const fn bucket(&self) -> u32 {
        self.bucket
    }

    /// Returns the position within the bucket.
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// `bucket ‖ index`, both big-endian, as it appears in the signed digest.
    #[inline]
    pub const fn to_be_bytes(&self) -> [u8; 8] {
        (((self.bucket as u64) << 32) | (self.index as u64)).to_be_bytes()
    }
}

/// Proof that a chunk is paid for by a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stamp {
    batch: BatchId,
    index: StampIndex,
    /// Nanoseconds since the Unix epoch.
    timestamp: u64,
    #[cfg_attr(feature = "serde", serde(with = "serde_sig"))]
    sig: [u8; 65],
}

impl Stamp {
    /// Creates a stamp from its parts.
    #[inline]
    pub const fn with_index(
        batch: BatchId,
        index: StampIndex,
        timestamp: u64,
        sig: [u8; 65],
    ) -> Self {
        Self {
            batch,
            index,
            timestamp,
            sig,
        }
    }

    /// Returns the batch ID.
    #[inline]
    pub const fn batch(&self) -> BatchId {
        self.batch
    }

    /// Returns the stamp index.
    #[inline]
    pub const fn stamp_index(&self) -> StampIndex {
        self.index
    }

    /// Returns the timestamp.
    #[inline]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the signature bytes (r ‖ s ‖ v).
    #[inline]
    pub const fn signature(&self) -> &[u8; 65] {
        &self.sig
    }

    /// Serializes the stamp to a 113-byte array.
    pub fn to_bytes(&self) -> StampBytes {
        let mut bytes = [0u8; STAMP_SIZE];
        bytes[..32].copy_from_slice(self.batch.as_slice());
        BigEndian::write_u32(&mut bytes[32..36], self.index.bucket());
        BigEndian::write_u32(&mut bytes[36..40], self.index.index());
        BigEndian::write_u64(&mut bytes[40..48], self.timestamp);
        bytes[48..].copy_from_slice(&self.sig);
        bytes
    }

    /// Deserializes a stamp, requiring exactly 113 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, StampError> {
        if bytes.len() != STAMP_SIZE {
            return Err(StampError::InvalidData("stamp must be exactly 113 bytes"));
        }

        let mut sig = [0u8; 65];
        sig.copy_from_slice(&bytes[48..]);

        Ok(Self {
            batch: B256::from_slice(&bytes[..32]),
            index: StampIndex::new(
                BigEndian::read_u32(&bytes[32..36]),
                BigEndian::read_u32(&bytes[36..40]),
            ),
            timestamp: BigEndian::read_u64(&bytes[40..48]),
            sig,
        })
    }

    /// The digest this stamp claims to sign for `address`.
    pub const fn digest(&self, address: SwarmAddress) -> StampDigest {
        StampDigest::new(address, self.batch, self.index, self.timestamp)
    }

    /// Recover the signer of this stamp for `address`.
    pub fn recover_owner(&self, address: SwarmAddress) -> Result<Address, StampError> {
        let signature =
            Signature::from_raw(&self.sig).map_err(|_| StampError::InvalidSignature)?;
        signature
            .recover_address_from_msg(self.digest(address).to_prehash())
            .map_err(|_| StampError::InvalidSignature)
    }

    /// Check the stamp against `batch` for a chunk at `address`: batch id, bucket,
    /// index range and signer must all agree.
    pub fn validate(&self, address: SwarmAddress, batch: &Batch) -> Result<(), StampError> {
        if self.batch != batch.id() {
            return Err(StampError::BatchMismatch {
                stamp: self.batch,
                session: batch.id(),
            });
        }
        if self.index.bucket() != calculate_bucket(&address, batch.bucket_depth()) {
            return Err(StampError::BucketMismatch);
        }
        if self.index.index() >= batch.bucket_upper_bound() {
            return Err(StampError::InvalidIndex);
        }
        let actual = self.recover_owner(address)?;
        if actual != batch.owner() {
            return Err(StampError::OwnerMismatch {
                expected: batch.owner(),
                actual,
            });
        }
        Ok(())
    }
}

impl From<Stamp> for StampBytes {
    #[inline]
    fn from(stamp: Stamp) -> Self {
        stamp.to_bytes()
    }
}

impl TryFrom<&[u8]> for Stamp {
    type Error = StampError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::try_from_slice(bytes)
    }
}

/// The digest that must be signed to create a valid stamp.
///
/// `keccak256(chunk_address ‖ batch_id ‖ index ‖ timestamp)`, signed as an
/// EIP-191 personal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampDigest {
    /// The chunk address being stamped.
    pub chunk_address: SwarmAddress,
    /// The batch ID.
    pub batch_id: BatchId,
    /// The stamp index (bucket and position).
    pub index: StampIndex,
    /// The timestamp.
    pub timestamp: u64,
}

impl StampDigest {
    /// Creates a new stamp digest.
    #[inline]
    pub const fn new(
        chunk_address: SwarmAddress,
        batch_id: BatchId,
        index: StampIndex,
        timestamp: u64,
    ) -> Self {
        Self {
            chunk_address,
            batch_id,
            index,
            timestamp,
        }
    }

    /// Computes the 32-byte hash that must be signed.
    pub fn to_prehash(&self) -> B256 {
        let mut data = [0u8; 80];
        data[..32].copy_from_slice(self.chunk_address.as_bytes());
        data[32..64].copy_from_slice(self.batch_id.as_slice());
        data[64..72].copy_from_slice(&self.index.to_be_bytes());
        data[72..80].copy_from_slice(&self.timestamp.to_be_bytes());
        keccak256(data)
    }
}

#[cfg(feature = "serde")]
mod serde_sig {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(sig: &[u8; 65], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(sig)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 65], D::Error> {
        let bytes = Vec::<u8>::deserialize(d)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 65 bytes"))
    }
}
