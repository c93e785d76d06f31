//! Chunk storage for the apiary upload layer.
//!
//! Writes reach a store through upload sessions: every chunk is stamped,
//! held as uncommitted until the session is finalized with
//! [`PutterSession::done`] for the root it produced, and discarded by
//! [`PutterSession::cleanup`] otherwise. Reads go through [`Getter`].
//!
//! The [`ChunkTree`] splitter turns byte streams into a tree of content
//! chunks and back.
//!
//! # Core Types
//!
//! - [`MemoryStore`]: In-memory store with session-scoped commits
//! - [`StampedChunk`]: A chunk paired with the postage stamp paying for it
//! - [`Cancellation`]: Cooperative cancellation shared by every operation
//!
//! # Traits
//!
//! - [`Getter`]: Retrieve chunks by address
//! - [`Putter`]: Write unstamped chunks (what a splitter writes into)
//! - [`PutterSession`]: Write stamped chunks, then finalize or discard
//! - [`SessionOpener`]: Open upload sessions and track their bookkeeping
//! - [`Splitter`]: Split bytes into a chunk tree and join them back

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod cancel;
mod error;
mod memory;
mod splitter;
mod traits;

pub use cancel::Cancellation;
pub use error::{Result, StorageError};
pub use memory::{MemorySession, MemoryStore};
pub use splitter::{ChunkTree, PipelineOptions, RedundancyLevel, Splitter};
pub use traits::{ChunkStore, Getter, Putter, PutterSession, SessionInfo, SessionOpener, StampedChunk};
