//! ECDH key derivation between a node and another party.

use alloy_primitives::{B256, Keccak256};
use k256::{PublicKey, SecretKey, ecdh};

const LOOKUP_NONCE: u8 = 0x00;
const DECRYPTION_NONCE: u8 = 0x01;
const REGISTRY_NONCE: u8 = 0x02;

/// The two keys a pair of parties derive for an access list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedKeys {
    /// Where the entry lives in the access list.
    pub lookup: B256,
    /// Key that unwraps the stored access key.
    pub decryption: B256,
}

/// A node's private key, used to derive shared keys with other parties.
#[derive(Debug, Clone)]
pub struct Session {
    key: SecretKey,
}

impl Session {
    /// Session for `key`.
    pub const fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// This node's public key.
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// x-coordinate of the ECDH point shared with `other`.
    fn shared_secret(&self, other: &PublicKey) -> [u8; 32] {
        let shared = ecdh::diffie_hellman(self.key.to_nonzero_scalar(), other.as_affine());
        let mut x = [0u8; 32];
        x.copy_from_slice(shared.raw_secret_bytes());
        x
    }

    fn derive(secret: &[u8; 32], nonce: &[&[u8]]) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(secret);
        for part in nonce {
            hasher.update(part);
        }
        hasher.finalize()
    }

    /// Lookup and decryption keys shared with `other`.
    pub fn keys(&self, other: &PublicKey) -> DerivedKeys {
        let secret = self.shared_secret(other);
        DerivedKeys {
            lookup: Self::derive(&secret, &[&[LOOKUP_NONCE]]),
            decryption: Self::derive(&secret, &[&[DECRYPTION_NONCE]]),
        }
    }

    /// Key for the grantee registry payload sealed under `nonce`.
    ///
    /// Only meaningful with `other` set to this node's own public key.
    pub fn registry_key(&self, other: &PublicKey, nonce: &B256) -> B256 {
        let secret = self.shared_secret(other);
        Self::derive(&secret, &[&[REGISTRY_NONCE], nonce.as_slice()])
    }
}
