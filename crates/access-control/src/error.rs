//! Access control errors.

use apiary_storage::StorageError;
use thiserror::Error;

/// Result type for access control operations
pub type Result<T> = std::result::Result<T, AccessControlError>;

/// Errors from the access control flows
#[derive(Debug, Error)]
pub enum AccessControlError {
    /// The requester has no entry for the requested time
    #[error("access denied")]
    AccessDenied,

    /// An update named no grantees at all
    #[error("nothing to add or revoke")]
    EmptyUpdate,

    /// A public key could not be decoded
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A stored structure could not be decoded
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// Which structure
        what: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Loading or saving failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccessControlError {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}
