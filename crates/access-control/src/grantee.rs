//! The publisher's grantee list.

use alloy_primitives::{B256, hex};
use apiary_primitives::SwarmAddress;
use apiary_storage::{Cancellation, Getter, PipelineOptions, Putter, Splitter};
use k256::PublicKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::{AccessControlError, Cipher, Result, Session};

const KEY_SIZE: usize = 33;
const NONCE_SIZE: usize = 32;

/// Decode a hex-encoded SEC1 public key, compressed or not.
pub fn decode_public_key(encoded: &str) -> Result<PublicKey> {
    let bytes = hex::decode(encoded)
        .map_err(|e| AccessControlError::InvalidPublicKey(format!("{encoded}: {e}")))?;
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| AccessControlError::InvalidPublicKey(encoded.to_string()))
}

/// Hex encoding of the compressed SEC1 form of `key`.
pub fn encode_public_key(key: &PublicKey) -> String {
    hex::encode(key.to_encoded_point(true).as_bytes())
}

/// The set of public keys a publisher has granted access to.
///
/// Keys keep insertion order and appear at most once. The list is stored as
/// `nonce ‖ encrypted(compressed keys)`, sealed with a key derived from the
/// publisher's ECDH secret with itself and the nonce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GranteeList {
    keys: Vec<PublicKey>,
}

impl GranteeList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The grantees, in the order they were added.
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// Whether `key` is on the list.
    pub fn contains(&self, key: &PublicKey) -> bool {
        self.keys.contains(key)
    }

    /// Add keys not already present. Returns the keys that were new.
    pub fn add(&mut self, keys: &[PublicKey]) -> Vec<PublicKey> {
        let mut added = Vec::new();
        for key in keys {
            if !self.contains(key) {
                self.keys.push(*key);
                added.push(*key);
            }
        }
        added
    }

    /// Remove keys that are present; absent keys are ignored.
    pub fn remove(&mut self, keys: &[PublicKey]) {
        self.keys.retain(|key| !keys.contains(key));
    }

    /// Number of grantees.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nobody is granted.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn seal(&self, session: &Session, nonce: B256) -> Vec<u8> {
        let plain: Vec<u8> = self
            .keys
            .iter()
            .flat_map(|key| key.to_encoded_point(true).as_bytes().to_vec())
            .collect();
        let cipher = Cipher::new(session.registry_key(&session.public_key(), &nonce));

        let mut out = Vec::with_capacity(NONCE_SIZE + plain.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend(cipher.apply(&plain));
        out
    }

    fn open(session: &Session, sealed: &[u8]) -> Result<Self> {
        if sealed.len() < NONCE_SIZE {
            return Err(AccessControlError::malformed("grantee list", "missing nonce"));
        }
        let (nonce, body) = sealed.split_at(NONCE_SIZE);
        let cipher = Cipher::new(session.registry_key(&session.public_key(), &B256::from_slice(nonce)));
        let plain = cipher.apply(body);
        if plain.len() % KEY_SIZE != 0 {
            return Err(AccessControlError::malformed(
                "grantee list",
                format!("{} bytes is not a whole number of keys", plain.len()),
            ));
        }
        let keys = plain
            .chunks_exact(KEY_SIZE)
            .map(|bytes| {
                PublicKey::from_sec1_bytes(bytes)
                    .map_err(|_| AccessControlError::malformed("grantee list", "undecodable key"))
            })
            .collect::<Result<_>>()?;
        Ok(Self { keys })
    }

    /// Store the list sealed for the publisher behind `session`.
    pub fn save(
        &self,
        cx: &Cancellation,
        putter: &mut dyn Putter,
        splitter: &dyn Splitter,
        session: &Session,
    ) -> Result<SwarmAddress> {
        let sealed = self.seal(session, B256::random());
        Ok(splitter.split(cx, putter, &sealed, PipelineOptions::default())?)
    }

    /// Load and unseal the list stored under `root`.
    pub fn load(
        cx: &Cancellation,
        getter: &dyn Getter,
        splitter: &dyn Splitter,
        session: &Session,
        root: &SwarmAddress,
    ) -> Result<Self> {
        Self::open(session, &splitter.join(cx, getter, root)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::SecretKey;

    fn key() -> PublicKey {
        SecretKey::from_slice(B256::random().as_slice()).unwrap().public_key()
    }

    fn session() -> Session {
        Session::new(SecretKey::from_slice(B256::random().as_slice()).unwrap())
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let (a, b) = (key(), key());
        let mut list = GranteeList::new();
        assert_eq!(list.add(&[a, b, a]), vec![a, b]);
        assert!(list.add(&[b]).is_empty());

        list.remove(&[a, key()]);
        assert_eq!(list.keys(), &[b]);
    }

    #[test]
    fn sealed_list_opens_only_for_its_publisher() {
        let publisher = session();
        let mut list = GranteeList::new();
        list.add(&[key(), key()]);

        let sealed = list.seal(&publisher, B256::repeat_byte(5));
        assert_eq!(GranteeList::open(&publisher, &sealed).unwrap(), list);

        // Another key derives a different stream, so the points don't decode
        // back to the same list.
        if let Ok(opened) = GranteeList::open(&session(), &sealed) {
            assert_ne!(opened, list);
        }
    }

    #[test]
    fn public_key_hex_round_trip() {
        let original = key();
        let encoded = encode_public_key(&original);
        assert_eq!(encoded.len(), 66);
        assert_eq!(decode_public_key(&encoded).unwrap(), original);

        let uncompressed = hex::encode(original.to_encoded_point(false).as_bytes());
        assert_eq!(decode_public_key(&uncompressed).unwrap(), original);

        assert!(matches!(
            decode_public_key("zz"),
            Err(AccessControlError::InvalidPublicKey(_))
        ));
        assert!(decode_public_key("02ff").is_err());
    }
}
