use crate::SwarmAddress;
use alloy_primitives::Address;
use thiserror::Error;

/// Result type for chunk operations
pub(crate) type Result<T> = std::result::Result<T, ChunkError>;

/// Errors specific to chunk operations
#[derive(Error, Debug)]
pub enum ChunkError {
    /// Chunk size is invalid
    #[error("Invalid chunk size: {message} (expected: {expected}, got: {actual})")]
    InvalidSize {
        /// What was being checked
        message: &'static str,
        /// The limit or exact size required
        expected: usize,
        /// The size encountered
        actual: usize,
    },

    /// Chunk format is invalid
    #[error("Invalid chunk format: {0}")]
    InvalidFormat(String),

    /// Chunk address verification failed
    #[error("Chunk address verification failed: expected {expected}, got {actual}")]
    VerificationFailed {
        /// Address the caller asked for
        expected: SwarmAddress,
        /// Address the chunk actually hashes to
        actual: SwarmAddress,
    },

    /// Signature errors from the crypto library
    #[error("Signature error: {0}")]
    Signature(#[from] alloy_primitives::SignatureError),

    /// Signer errors
    #[error("Signer error: {0}")]
    Signer(#[from] alloy_signer::Error),

    /// The signature recovers to someone other than the claimed owner
    #[error("Owner mismatch: claimed {claimed}, signature recovers {recovered}")]
    OwnerMismatch {
        /// Owner supplied by the caller
        claimed: Address,
        /// Owner recovered from the signature
        recovered: Address,
    },
}

impl ChunkError {
    /// Size check failure
    pub const fn invalid_size(message: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidSize {
            message,
            expected,
            actual,
        }
    }

    /// Malformed encoding
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Address mismatch
    pub const fn verification_failed(expected: SwarmAddress, actual: SwarmAddress) -> Self {
        Self::VerificationFailed { expected, actual }
    }
}
