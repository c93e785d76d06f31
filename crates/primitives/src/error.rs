//! Error types for the apiary-primitives crate
//!
//! The crate uses a two-level error hierarchy:
//!
//! - `PrimitivesError`: The top-level error type that wraps all other errors
//! - `ChunkError`: detailed errors from chunk construction, decoding and verification
//!
//! ```
//! use apiary_primitives::error::{PrimitivesError, Result};
//! use apiary_primitives::ContentChunk;
//!
//! fn build(data: &[u8]) -> Result<ContentChunk> {
//!     ContentChunk::new(data.to_vec())
//! }
//!
//! match build(&[0u8; 5000]) {
//!     Err(PrimitivesError::Chunk(e)) => println!("chunk error: {e}"),
//!     _ => unreachable!(),
//! }
//! ```

use thiserror::Error;

/// Result type for operations in the primitives crate
pub type Result<T> = std::result::Result<T, PrimitivesError>;

/// Main error type for the primitives crate
#[derive(Error, Debug)]
pub enum PrimitivesError {
    /// Errors from chunk operations
    #[error(transparent)]
    Chunk(#[from] crate::chunk::error::ChunkError),

    /// Array conversion errors
    #[error("Array conversion error: {0}")]
    ArrayConversion(#[from] std::array::TryFromSliceError),

    /// Hex decoding errors
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}
