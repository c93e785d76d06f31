//! The apiary node: stamped uploads, access control and mutable pointers
//! over a chunk store.
//!
//! A [`Node`] bundles an identity, a chunk store, a batch store and a clock.
//! Every operation opens its own [`UploadSession`], writes its content,
//! optionally protects the resulting reference through the access control
//! history, and finalizes the roots it produced. Failed writes are cleaned up
//! and reported as [`Error::Aborted`].
//!
//! # Operations
//!
//! - [`Node::add_bytes`] / [`Node::get_bytes`]: Chunk trees from byte streams
//! - [`Node::add_chunk`] / [`Node::get_chunk`]: Single chunks in wire format
//! - [`Node::add_single_owner_chunk`]: Single-owner chunks with external signatures
//! - [`Node::publish_pointer`] / [`Node::resolve_pointer`]: Feed manifests and lookups
//! - [`Node::list_grantees`], [`Node::update_grantees`], [`Node::create_grantees`]:
//!   The grantee registry
//!
//! # Features
//!
//! - `serde`: Enable serde serialization/deserialization of the configuration

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod chunk;
mod clock;
mod config;
mod content;
mod error;
mod feed;
mod grantees;
mod manifest;
mod node;
mod pointer;
mod session;

#[cfg(test)]
mod test_utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_CONFIRMATIONS, NodeConfig, NodeMode};
pub use error::{Error, ErrorKind, Result};
pub use feed::{
    FEED_OWNER_KEY, FEED_TOPIC_KEY, FEED_TYPE_KEY, Feed, FeedLookup, FeedType, FeedUpdate,
    SequenceLookup, legacy_payload,
};
pub use grantees::GranteesUpdated;
pub use manifest::{ManifestEntry, MetadataTree, ROOT_PATH};
pub use node::{AccessOptions, Node, UploadOptions, Uploaded, parse_batch};
pub use pointer::feed_manifest;
pub use session::UploadSession;
