//! BMT body shared by both chunk kinds
//!
//! A body is an 8-byte little-endian span followed by at most 4096 payload
//! bytes. A single body does not constrain its span: leaves of a chunk tree
//! carry their payload length, intermediate nodes the length of their
//! subtree. Whether a span fits its tree is checked when the tree is joined.

use bytes::{BufMut, Bytes, BytesMut};
use std::marker::PhantomData;
use std::sync::OnceLock;

use crate::SwarmAddress;
use crate::bmt::{Hasher, MAX_DATA_LENGTH, SPAN_SIZE};
use crate::chunk::error::ChunkError;
use crate::error::{PrimitivesError, Result};

/// Span plus payload, with its BMT hash computed once on demand.
#[derive(Debug, Clone)]
pub struct BmtBody {
    span: u64,
    data: Bytes,
    cached_hash: OnceLock<SwarmAddress>,
}

impl BmtBody {
    /// Body whose span is the payload length
    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        BmtBodyBuilder::default().auto_from_data(data)?.build()
    }

    /// Body with an explicit span, as carried by intermediate tree chunks
    pub fn with_span(span: u64, data: impl Into<Bytes>) -> Result<Self> {
        BmtBodyBuilder::default()
            .with_span(span)
            .with_data(data)?
            .build()
    }

    /// Get the span of this body
    pub const fn span(&self) -> u64 {
        self.span
    }

    /// Get the data of this body
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Get the size of this body in bytes
    pub fn size(&self) -> usize {
        SPAN_SIZE + self.data.len()
    }

    /// BMT hash of this body, which is the content address of the chunk it forms
    pub fn hash(&self) -> &SwarmAddress {
        self.cached_hash.get_or_init(|| {
            let mut hasher = Hasher::new();
            hasher.set_span(self.span);
            hasher.update(self.data.as_ref());
            hasher.sum().into()
        })
    }

    /// Serialize as `span_le ‖ data`
    pub fn to_bytes(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(self.size());
        bytes.put_u64_le(self.span);
        bytes.put_slice(&self.data);
        bytes.freeze()
    }
}

impl PartialEq for BmtBody {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.data == other.data
    }
}

impl Eq for BmtBody {}

fn validate_data(data: impl Into<Bytes>) -> Result<Bytes> {
    let data = data.into();
    if data.len() > MAX_DATA_LENGTH {
        return Err(ChunkError::invalid_size(
            "data exceeds maximum chunk size",
            MAX_DATA_LENGTH,
            data.len(),
        )
        .into());
    }
    Ok(data)
}

impl From<BmtBody> for Bytes {
    fn from(body: BmtBody) -> Self {
        body.to_bytes()
    }
}

impl TryFrom<Bytes> for BmtBody {
    type Error = PrimitivesError;

    fn try_from(mut buf: Bytes) -> Result<Self> {
        if buf.len() < SPAN_SIZE {
            return Err(ChunkError::invalid_size(
                "insufficient data for span",
                SPAN_SIZE,
                buf.len(),
            )
            .into());
        }

        let span_bytes = buf.split_to(SPAN_SIZE);
        let span = u64::from_le_bytes(span_bytes.as_ref().try_into()?);

        Self::with_span(span, buf)
    }
}

impl TryFrom<&[u8]> for BmtBody {
    type Error = PrimitivesError;

    fn try_from(buf: &[u8]) -> Result<Self> {
        Self::try_from(Bytes::copy_from_slice(buf))
    }
}

trait BuilderState {}

#[derive(Default, Debug)]
struct Initial;
impl BuilderState for Initial {}

#[derive(Debug)]
struct WithSpan;
impl BuilderState for WithSpan {}

#[derive(Debug)]
struct ReadyToBuild;
impl BuilderState for ReadyToBuild {}

/// Builder for BmtBody with type state pattern
#[derive(Debug)]
struct BmtBodyBuilder<S: BuilderState = Initial> {
    span: u64,
    data: Bytes,
    _state: PhantomData<S>,
}

impl Default for BmtBodyBuilder<Initial> {
    fn default() -> Self {
        Self {
            span: 0,
            data: Bytes::new(),
            _state: PhantomData,
        }
    }
}

impl BmtBodyBuilder<Initial> {
    fn with_span(self, span: u64) -> BmtBodyBuilder<WithSpan> {
        BmtBodyBuilder {
            span,
            data: self.data,
            _state: PhantomData,
        }
    }

    fn auto_from_data(self, data: impl Into<Bytes>) -> Result<BmtBodyBuilder<ReadyToBuild>> {
        let data = validate_data(data)?;
        Ok(BmtBodyBuilder {
            span: data.len() as u64,
            data,
            _state: PhantomData,
        })
    }
}

impl BmtBodyBuilder<WithSpan> {
    fn with_data(self, data: impl Into<Bytes>) -> Result<BmtBodyBuilder<ReadyToBuild>> {
        let data = validate_data(data)?;
        Ok(BmtBodyBuilder {
            span: self.span,
            data,
            _state: PhantomData,
        })
    }
}

impl BmtBodyBuilder<ReadyToBuild> {
    fn build(self) -> Result<BmtBody> {
        Ok(BmtBody {
            span: self.span,
            data: self.data,
            cached_hash: OnceLock::new(),
        })
    }
}

#[cfg(any(test, feature = "arbitrary"))]
impl<'a> arbitrary::Arbitrary<'a> for BmtBody {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let data_len: usize = u.int_in_range(0..=MAX_DATA_LENGTH)?;
        let mut buf = vec![0; data_len];
        u.fill_buffer(&mut buf)?;

        // Either a leaf or an intermediate node covering more than one chunk
        let span = if u.arbitrary()? {
            data_len as u64
        } else {
            u.int_in_range(MAX_DATA_LENGTH as u64 + 1..=u64::MAX)?
        };

        Self::with_span(span, buf).map_err(|_| arbitrary::Error::IncorrectFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_is_kept_as_given() {
        let mut raw = 200u64.to_le_bytes().to_vec();
        raw.extend_from_slice(&[1u8; 100]);
        let body = BmtBody::try_from(raw.as_slice()).unwrap();
        assert_eq!((body.span(), body.data().len()), (200, 100));
        assert_eq!(&body.to_bytes()[..], &raw[..]);
        assert_ne!(body.hash(), BmtBody::new(vec![1u8; 100]).unwrap().hash());
    }

    #[test]
    fn intermediate_span_is_accepted() {
        let body = BmtBody::with_span(10_000, vec![0u8; 64]).unwrap();
        assert_eq!(body.span(), 10_000);
        assert_eq!(BmtBody::try_from(body.to_bytes()).unwrap(), body);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        assert!(BmtBody::new(vec![0u8; MAX_DATA_LENGTH + 1]).is_err());
    }
}
