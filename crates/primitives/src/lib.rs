//! Core primitives for the apiary upload layer
//!
//! This crate provides the chunk types that every write path in apiary produces,
//! the 32-byte [`SwarmAddress`] used to reference them, and the binary merkle tree
//! hasher that content addresses are derived from.
//!
//! ## Key Components
//!
//! - **Chunks**: Content-addressed and signed data chunks ([`ContentChunk`], [`SingleOwnerChunk`])
//!   plus the tagged [`AnyChunk`] used where the kind is only known after decoding.
//! - **Binary Merkle Tree**: Content addressing ([`bmt::Hasher`])
//! - **SwarmAddress**: 256-bit identifiers, with the all-zero address reserved as "absent"
//!
//! ## Usage Examples
//!
//! ```
//! use apiary_primitives::{AnyChunk, Chunk, ContentChunk, SingleOwnerChunk};
//! use alloy_signer_local::PrivateKeySigner;
//! use alloy_primitives::B256;
//!
//! let chunk = ContentChunk::new(b"Hello, world!".as_slice()).unwrap();
//! let address = *chunk.address();
//!
//! let wallet = PrivateKeySigner::random();
//! let soc = SingleOwnerChunk::new(B256::ZERO, b"Signed data".as_slice(), &wallet).unwrap();
//!
//! // Wire bytes decode back into the right kind
//! let decoded = AnyChunk::parse(bytes::Bytes::from(chunk)).unwrap();
//! assert_eq!(decoded.address(), &address);
//! # let _ = soc;
//! ```

// Re-export dependencies that are part of our public API
pub use bytes;

pub mod address;
pub mod bmt;
pub mod chunk;
pub mod error;

// Re-export core constants
pub use bmt::{MAX_DATA_LENGTH as MAX_CHUNK_SIZE, SPAN_SIZE};

// Re-export core types
pub use address::SwarmAddress;
pub use error::{PrimitivesError, Result};

pub use bmt::Hasher;

pub use chunk::{
    AnyChunk, BmtBody, BmtChunk, Chunk, ChunkAddress, ChunkError, ContentChunk, SingleOwnerChunk,
};
