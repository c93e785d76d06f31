//! Chunk types and operations
//!
//! Two chunk kinds exist: content-addressed chunks, whose address is the BMT
//! hash of their body, and single-owner chunks, whose address is derived from
//! an identifier and the owner recovered from a signature. [`AnyChunk`] holds
//! either and decodes wire bytes by trying each kind in turn.

mod any_chunk;
mod bmt_body;
mod content;
pub(crate) mod error;
mod single_owner;
mod traits;

pub use any_chunk::AnyChunk;
pub use bmt_body::BmtBody;
pub use content::ContentChunk;
pub use error::ChunkError;
pub use single_owner::{ID_SIZE, SIGNATURE_SIZE, SingleOwnerChunk};
pub use traits::{BmtChunk, Chunk, ChunkAddress};
