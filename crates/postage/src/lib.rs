//! Postage stamps and the capacity service behind apiary uploads.
//!
//! Every chunk written through an upload session must carry a [`Stamp`]
//! proving it is paid for by a [`Batch`]. This crate holds the batch and stamp
//! types, the bucket bookkeeping that allocates stamp indices, the signers
//! that produce stamps, and the [`PostageService`] that decides whether a
//! batch may be used at all.
//!
//! # Core Types
//!
//! - [`Batch`]: A postage batch representing prepaid storage
//! - [`Stamp`]: A 113-byte proof binding a chunk address to a batch
//! - [`StampDigest`]: The data signed when creating a stamp
//! - [`ChainState`]: Block height and cumulative payout used for expiry
//!
//! # Traits
//!
//! - [`StampIssuer`]: Track bucket utilization and prepare stamps
//! - [`Stamper`]: Produce a stamp for a chunk address
//! - [`BatchStore`]: Look up batches and chain state
//!
//! # Features
//!
//! - `serde`: Enable serde serialization/deserialization

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod batch;
mod error;
mod issuer;
mod service;
mod stamp;
mod stamper;
mod store;
mod util;

pub use batch::{Batch, BatchId};
pub use error::{SigningError, StampError};
pub use issuer::{MemoryIssuer, SharedIssuer, StampIssuer};
pub use service::{PostageService, UsableError};
pub use stamp::{STAMP_SIZE, Stamp, StampBytes, StampDigest, StampIndex};
pub use stamper::{BatchStamper, PresignedStamper, Stamper};
pub use store::{BatchStore, BatchStoreError, MemoryBatchStore};
pub use util::{ChainState, calculate_bucket, current_timestamp};
