//! Storage errors.

use apiary_postage::SigningError;
use apiary_primitives::{PrimitivesError, SwarmAddress};
use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors from stores, sessions and the splitter
#[derive(Debug, Error)]
pub enum StorageError {
    /// No chunk is stored under the address
    #[error("chunk not found: {0}")]
    NotFound(SwarmAddress),

    /// No upload session has the id
    #[error("upload session {0} not found")]
    SessionNotFound(u64),

    /// The operation observed a cancellation request
    #[error("operation cancelled")]
    Cancelled,

    /// A chunk could not be built or decoded
    #[error(transparent)]
    Chunk(#[from] PrimitivesError),

    /// A chunk could not be stamped on its way into the store
    #[error("stamping failed: {0}")]
    Stamp(#[from] SigningError),

    /// A stored tree does not have the shape its root claims
    #[error("malformed chunk tree: {0}")]
    InvalidTree(String),

    /// The requested pipeline feature is not available
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// The session was already discarded
    #[error("session is closed")]
    Closed,

    /// The backend failed
    #[error("storage backend: {0}")]
    Backend(String),
}
