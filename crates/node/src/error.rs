//! Node errors and their classification.

use apiary_access_control::AccessControlError;
use apiary_postage::{SigningError, StampError, UsableError};
use apiary_primitives::{ChunkError, PrimitivesError};
use apiary_storage::StorageError;
use thiserror::Error;

/// Result type for node operations
pub type Result<T> = std::result::Result<T, Error>;

/// How a caller should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// The request itself is malformed; retrying it unchanged cannot succeed.
    Input,
    /// The postage batch is missing or cannot pay for the upload.
    Capacity,
    /// The requester has no access at the requested time.
    Access,
    /// A referenced object is absent.
    NotFound,
    /// Signatures, addresses or stored structures do not agree.
    Consistency,
    /// The caller cancelled the operation.
    Cancelled,
    /// The node's mode or pipeline does not offer the operation.
    Unsupported,
    /// The storage backend failed.
    Storage,
}

/// Errors returned by [`Node`](crate::Node) operations
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed
    #[error("{0}")]
    Input(String),

    /// The batch id could not be decoded
    #[error("invalid postage batch id: {0}")]
    InvalidBatch(String),

    /// Uploads without deferral need a capacity issuer the node does not run
    #[error("operation not supported in dev mode")]
    UnsupportedMode,

    /// Reading the request body failed
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The batch cannot be used
    #[error("batch not usable: {0}")]
    Unusable(#[from] UsableError),

    /// A presigned stamp could not be decoded
    #[error("invalid stamp: {0}")]
    Stamp(#[from] StampError),

    /// Chunk construction or validation failed
    #[error(transparent)]
    Chunk(#[from] PrimitivesError),

    /// The chunk store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An access control flow failed
    #[error(transparent)]
    AccessControl(#[from] AccessControlError),

    /// A stored metadata tree could not be decoded
    #[error("malformed metadata tree: {0}")]
    Manifest(String),

    /// A write failed and the session was cleaned up
    #[error("{cause}{}", cleanup_suffix(.cleanup))]
    Aborted {
        /// The failure that aborted the write
        cause: Box<Error>,
        /// Failure of the cleanup that followed, if any
        cleanup: Option<Box<Error>>,
    },
}

fn cleanup_suffix(cleanup: &Option<Box<Error>>) -> String {
    cleanup
        .as_ref()
        .map(|err| format!(" (cleanup failed: {err})"))
        .unwrap_or_default()
}

impl Error {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Join a write failure with the outcome of the cleanup it triggered.
    pub fn aborted(cause: Self, cleanup: Option<Self>) -> Self {
        Self::Aborted {
            cause: Box::new(cause),
            cleanup: cleanup.map(Box::new),
        }
    }

    /// The failure at the root of an aborted write, or `self`.
    pub fn cause(&self) -> &Self {
        match self {
            Self::Aborted { cause, .. } => cause.cause(),
            other => other,
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) | Self::Io(_) => ErrorKind::Input,
            Self::InvalidBatch(_) | Self::Unusable(UsableError::Stamp(_)) | Self::Stamp(_) => {
                ErrorKind::Capacity
            }
            Self::Unusable(UsableError::Store(_)) => ErrorKind::Storage,
            Self::UnsupportedMode => ErrorKind::Unsupported,
            Self::Chunk(err) => chunk_kind(err),
            Self::Storage(err) => storage_kind(err),
            Self::AccessControl(err) => match err {
                AccessControlError::AccessDenied => ErrorKind::Access,
                AccessControlError::EmptyUpdate | AccessControlError::InvalidPublicKey(_) => {
                    ErrorKind::Input
                }
                AccessControlError::Malformed { .. } => ErrorKind::Consistency,
                AccessControlError::Storage(err) => storage_kind(err),
            },
            Self::Manifest(_) => ErrorKind::Consistency,
            Self::Aborted { cause, .. } => cause.kind(),
        }
    }
}

fn chunk_kind(err: &PrimitivesError) -> ErrorKind {
    match err {
        PrimitivesError::Chunk(ChunkError::InvalidSize { .. }) => ErrorKind::Input,
        PrimitivesError::Chunk(_) => ErrorKind::Consistency,
        PrimitivesError::ArrayConversion(_) | PrimitivesError::InvalidHex(_) => ErrorKind::Input,
    }
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound(_) | StorageError::SessionNotFound(_) => ErrorKind::NotFound,
        StorageError::Cancelled => ErrorKind::Cancelled,
        StorageError::Chunk(err) => chunk_kind(err),
        StorageError::Stamp(SigningError::Stamp(_)) => ErrorKind::Capacity,
        StorageError::Stamp(SigningError::Signer(_)) | StorageError::InvalidTree(_) => {
            ErrorKind::Consistency
        }
        StorageError::Unsupported(_) => ErrorKind::Unsupported,
        StorageError::Closed | StorageError::Backend(_) => ErrorKind::Storage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiary_primitives::SwarmAddress;

    #[test]
    fn aborted_keeps_the_cause() {
        let err = Error::aborted(
            StorageError::NotFound(SwarmAddress::zero()).into(),
            Some(StorageError::Backend("disk gone".into()).into()),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err.cause(), Error::Storage(StorageError::NotFound(_))));

        let message = err.to_string();
        assert!(message.starts_with("chunk not found"));
        assert!(message.ends_with("(cleanup failed: storage backend: disk gone)"));
    }

    #[test]
    fn classification() {
        assert_eq!(Error::UnsupportedMode.kind(), ErrorKind::Unsupported);
        assert_eq!(
            Error::UnsupportedMode.to_string(),
            "operation not supported in dev mode"
        );
        assert_eq!(
            Error::from(AccessControlError::AccessDenied).kind(),
            ErrorKind::Access
        );
        assert_eq!(
            Error::from(AccessControlError::EmptyUpdate).kind(),
            ErrorKind::Input
        );
        assert_eq!(Error::from(StorageError::Cancelled).kind(), ErrorKind::Cancelled);
        assert_eq!(ErrorKind::NotFound.to_string(), "not-found");
    }
}
