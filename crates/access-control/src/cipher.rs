//! Keccak counter-mode stream cipher.
//!
//! Segment `i` of the input (32 bytes each, the last one possibly short) is
//! XORed with `keccak256(keccak256(key ‖ le32(i)))`. Encryption and
//! decryption are the same operation.

use alloy_primitives::{B256, Keccak256, keccak256};
use apiary_primitives::SwarmAddress;

const SEGMENT_SIZE: usize = 32;

/// A stream cipher keyed by 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cipher {
    key: B256,
}

impl Cipher {
    /// Cipher under `key`.
    pub const fn new(key: B256) -> Self {
        Self { key }
    }

    fn segment_key(&self, counter: u32) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(self.key);
        hasher.update(counter.to_le_bytes());
        keccak256(hasher.finalize())
    }

    /// Encrypt or decrypt `data`.
    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        for (counter, segment) in (0u32..).zip(data.chunks(SEGMENT_SIZE)) {
            let key = self.segment_key(counter);
            out.extend(segment.iter().zip(key.iter()).map(|(a, b)| a ^ b));
        }
        out
    }

    /// Encrypt or decrypt a 32-byte reference.
    pub fn reference(&self, reference: &SwarmAddress) -> SwarmAddress {
        let key = self.segment_key(0);
        let mut out = [0u8; SEGMENT_SIZE];
        for (o, (a, b)) in out.iter_mut().zip(reference.iter().zip(key.iter())) {
            *o = a ^ b;
        }
        SwarmAddress::new(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_matches_stream() {
        let cipher = Cipher::new(B256::repeat_byte(0x11));
        let reference = SwarmAddress::new([0xab; 32]);
        let encrypted = cipher.reference(&reference);
        assert_ne!(encrypted, reference);
        assert_eq!(encrypted.as_bytes(), cipher.apply(reference.as_bytes()).as_slice());
        assert_eq!(cipher.reference(&encrypted), reference);
    }

    #[test]
    fn keys_differ() {
        let reference = SwarmAddress::new([1; 32]);
        assert_ne!(
            Cipher::new(B256::repeat_byte(1)).reference(&reference),
            Cipher::new(B256::repeat_byte(2)).reference(&reference)
        );
    }

    proptest! {
        #[test]
        fn apply_is_an_involution(key in any::<[u8; 32]>(), data in proptest::collection::vec(any::<u8>(), 0..200)) {
            let cipher = Cipher::new(B256::from(key));
            let encrypted = cipher.apply(&data);
            prop_assert_eq!(encrypted.len(), data.len());
            prop_assert_eq!(cipher.apply(&encrypted), data);
        }
    }
}
