//! Traits shared by all chunk types

use crate::SwarmAddress;
use crate::chunk::error::ChunkError;
use crate::error::Result;
use bytes::Bytes;

/// Type alias for chunk addresses
pub type ChunkAddress = SwarmAddress;

/// Core trait for all chunk types in the system.
pub trait Chunk: Send + Sync + 'static {
    /// Get the address of this chunk
    fn address(&self) -> &ChunkAddress;

    /// Get the payload carried by this chunk (without span or envelope)
    fn data(&self) -> &Bytes;

    /// Get the total encoded size of this chunk in bytes
    fn size(&self) -> usize;

    /// Verify that this chunk matches an expected address
    fn verify(&self, expected: &ChunkAddress) -> Result<()> {
        let actual = self.address();
        if actual != expected {
            return Err(ChunkError::verification_failed(*expected, *actual).into());
        }
        Ok(())
    }
}

/// Trait for chunks that contain a BMT body
pub trait BmtChunk: Chunk {
    /// Get the span of the chunk data
    fn span(&self) -> u64;
}
