//! Swarm address implementation
//!
//! [`SwarmAddress`] is the 32-byte identifier every chunk, tree root and
//! encrypted reference is known by. The all-zero address is reserved to mean
//! "absent" (for example "no prior history").
//!
//! ```
//! use apiary_primitives::SwarmAddress;
//!
//! let addr: SwarmAddress = "2387e8e7d8a48c2a9339c97c1dc3461a9a7aa07e994c5cb8b38fd7c1b3e6ea48"
//!     .parse()
//!     .unwrap();
//! assert!(!addr.is_zero());
//! assert!(SwarmAddress::zero().is_zero());
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use alloy_primitives::{B256, hex};

use crate::error::{PrimitivesError, Result};

/// A 256-bit address for a chunk in the Swarm network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwarmAddress(pub B256);

impl SwarmAddress {
    /// Creates a new SwarmAddress from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Returns the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Creates a new address from a slice, checking the length
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let address = B256::try_from(slice)?;
        Ok(Self(address))
    }

    /// Checks if this address is zeros
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Create a new zero-filled address
    pub const fn zero() -> Self {
        Self(B256::ZERO)
    }

    /// Full lowercase hex encoding without a `0x` prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for SwarmAddress {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for SwarmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0.as_slice()[..8]))
    }
}

impl Deref for SwarmAddress {
    type Target = B256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<B256> for SwarmAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<[u8; 32]> for SwarmAddress {
    fn from(bytes: [u8; 32]) -> Self {
        Self::new(bytes)
    }
}

impl From<SwarmAddress> for B256 {
    fn from(addr: SwarmAddress) -> Self {
        addr.0
    }
}

impl AsRef<[u8]> for SwarmAddress {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        let hex = "9d453ebb73b2fedaaf44ceddcf7a0aa37f3e3d6453fea5841c31f0ea6d61dc85";
        let addr: SwarmAddress = hex.parse().unwrap();
        assert_eq!(addr.to_hex(), hex);
        assert_eq!(addr.to_string(), "9d453ebb73b2feda");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("zz".parse::<SwarmAddress>().is_err());
        assert!("abcd".parse::<SwarmAddress>().is_err());
    }
}
