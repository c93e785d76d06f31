//! Access control for apiary references.
//!
//! A publisher protects a reference by encrypting it with a random access
//! key. The access key is wrapped once per grantee in an access list, keyed
//! by a lookup key that only the publisher and that grantee can derive from
//! their shared ECDH secret. Access lists are versioned through an
//! append-only [`History`] of `(timestamp, access list root)` entries, so a
//! revocation only affects lookups at or after the time it was made.
//!
//! The publisher's set of grantees is kept in a [`GranteeList`] stored
//! encrypted under a key only the publisher can derive.
//!
//! [`Controller`] ties these together into the upload, download and grantee
//! update flows.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod cipher;
mod controller;
mod error;
mod grantee;
mod history;
mod kvs;
mod session;

pub use cipher::Cipher;
pub use controller::{Controller, GranteeUpdate, Protected};
pub use error::{AccessControlError, Result};
pub use grantee::{GranteeList, decode_public_key, encode_public_key};
pub use history::{History, HistoryEntry};
pub use kvs::AccessList;
pub use session::{DerivedKeys, Session};

pub use k256::PublicKey;
