//! Single-chunk uploads and downloads.

use std::io::Read;

use alloy_primitives::{Address, B256, Signature};
use apiary_primitives::{AnyChunk, ContentChunk, MAX_CHUNK_SIZE, SPAN_SIZE, SingleOwnerChunk, SwarmAddress};
use apiary_storage::Cancellation;
use bytes::Bytes;
use tracing::{debug, error};

use crate::{AccessOptions, Error, Node, Result, UploadOptions, Uploaded};

fn read_all(mut reader: impl Read) -> Result<Bytes> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data.into())
}

impl Node {
    /// Store one chunk given as wire bytes.
    ///
    /// Content-addressed bytes are tried first, then a single-owner
    /// envelope. A non-zero session id in `options` attaches the write to
    /// that deferred session.
    pub fn add_chunk(
        &self,
        cx: &Cancellation,
        options: &UploadOptions,
        reader: impl Read,
    ) -> Result<Uploaded> {
        let data = read_all(reader)?;
        if data.len() < SPAN_SIZE {
            return Err(Error::input("insufficient data length"));
        }
        let chunk = AnyChunk::parse(data)
            .inspect_err(|err| error!(error = %err, "chunk upload: create chunk failed"))?;
        self.store_chunk(cx, options, chunk)
    }

    /// Store a single-owner chunk from its payload and an external signature.
    ///
    /// `reader` yields `span ‖ payload`; the signature must recover `owner`
    /// over `keccak256(id ‖ content address)`.
    pub fn add_single_owner_chunk(
        &self,
        cx: &Cancellation,
        options: &UploadOptions,
        reader: impl Read,
        id: B256,
        owner: Address,
        signature: Signature,
    ) -> Result<Uploaded> {
        let data = read_all(reader)?;
        if data.len() < SPAN_SIZE {
            return Err(Error::input("chunk data too short"));
        }
        if data.len() > SPAN_SIZE + MAX_CHUNK_SIZE {
            return Err(Error::input("chunk data exceeds required length"));
        }
        let inner = ContentChunk::try_from(data)?;
        let soc = SingleOwnerChunk::new_signed(owner, id, signature, inner)
            .inspect_err(|err| error!(error = %err, %id, %owner, "create soc failed"))?;
        self.store_chunk(cx, options, soc.into())
    }

    fn store_chunk(
        &self,
        cx: &Cancellation,
        options: &UploadOptions,
        chunk: AnyChunk,
    ) -> Result<Uploaded> {
        let address = *chunk.address();
        let mut session = self
            .open_session(options)
            .inspect_err(|err| error!(error = %err, "get putter failed"))?;
        let uploaded = session
            .run(|session| {
                session.put(cx, chunk)?;
                let uploaded = self.protect_if(cx, session, address, options)?;
                session.done(cx, address)?;
                Ok(uploaded)
            })
            .inspect_err(|err| error!(error = %err, chunk_address = %address, "chunk upload failed"))?;

        debug!(%address, session = options.session_id(), "chunk uploaded");
        Ok(uploaded)
    }

    /// The chunk under `reference`, resolving it through `access` first.
    pub fn get_chunk(
        &self,
        cx: &Cancellation,
        reference: &SwarmAddress,
        access: &AccessOptions,
    ) -> Result<AnyChunk> {
        let address = self.resolve(cx, reference, access)?;
        Ok(self.getter().get(cx, &address)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, NodeConfig, NodeMode};
    use crate::test_utils::TestNode;
    use alloy_primitives::U256;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use apiary_postage::Stamp;
    use apiary_primitives::{Chunk, Hasher};
    use apiary_storage::{Getter, SessionOpener};

    fn wire(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u64).to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn content_chunk_round_trip() {
        let t = TestNode::new();
        let bytes = wire(&[0x5a; 100]);
        let uploaded = t.node.add_chunk(&t.cx, &t.options(), bytes.as_slice()).unwrap();
        let expected = ContentChunk::new(vec![0x5a; 100]).unwrap();
        assert_eq!(uploaded.reference, *expected.address());

        let chunk = t
            .node
            .get_chunk(&t.cx, &uploaded.reference, &AccessOptions::default())
            .unwrap();
        assert_eq!(chunk.to_bytes().as_ref(), bytes.as_slice());
        assert!(t.store.stamp(&uploaded.reference).is_some());
    }

    #[test]
    fn span_may_differ_from_payload_length() {
        let t = TestNode::new();
        let mut bytes = 200u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1u8; 100]);
        let uploaded = t.node.add_chunk(&t.cx, &t.options(), bytes.as_slice()).unwrap();

        let mut hasher = Hasher::new();
        hasher.set_span(200);
        hasher.update(&[1u8; 100]);
        assert_eq!(uploaded.reference, SwarmAddress::from(hasher.sum()));

        let chunk = t
            .node
            .get_chunk(&t.cx, &uploaded.reference, &AccessOptions::default())
            .unwrap();
        assert!(chunk.as_content().is_some());
        assert_eq!(chunk.to_bytes().as_ref(), bytes.as_slice());
    }

    #[test]
    fn presigned_stamp_pays_for_the_chunk() {
        let t = TestNode::new();
        let bytes = wire(&[0x42; 64]);
        let address = *ContentChunk::new(vec![0x42; 64]).unwrap().address();
        let stamp = t.presigned(&address, &t.owner);

        // The batch is taken from the stamp
        let options = UploadOptions::default().with_stamp(stamp.clone());
        let uploaded = t.node.add_chunk(&t.cx, &options, bytes.as_slice()).unwrap();
        assert_eq!(uploaded.reference, address);
        assert_eq!(
            t.store.stamp(&address).unwrap(),
            Stamp::try_from_slice(&stamp).unwrap()
        );
    }

    #[test]
    fn presigned_stamp_from_another_signer_is_refused() {
        let t = TestNode::new();
        let bytes = wire(&[0x43; 64]);
        let address = *ContentChunk::new(vec![0x43; 64]).unwrap().address();
        let stamp = t.presigned(&address, &PrivateKeySigner::random());

        let options = UploadOptions::default().with_stamp(stamp);
        let err = t.node.add_chunk(&t.cx, &options, bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
        assert!(!t.store.has(&address).unwrap());

        let err = t
            .node
            .add_chunk(&t.cx, &UploadOptions::default().with_stamp([0u8; 10]), bytes.as_slice())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn pinned_chunk() {
        let t = TestNode::with_config(NodeConfig::default().with_pin(true));
        let uploaded = t.node.add_chunk(&t.cx, &t.options(), wire(b"pin").as_slice()).unwrap();
        assert!(t.store.is_pinned(&uploaded.reference));
        assert!(t.store.is_committed(&uploaded.reference));
    }

    #[test]
    fn short_chunk_is_rejected() {
        let t = TestNode::new();
        let err = t.node.add_chunk(&t.cx, &t.options(), [0u8; 7].as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(err.to_string(), "insufficient data length");
    }

    #[test]
    fn session_id_defers_the_write() {
        let t = TestNode::new();
        let session = t.store.new_session().unwrap();
        let options = t.options().with_session(session.id);
        let uploaded = t.node.add_chunk(&t.cx, &options, wire(b"tagged").as_slice()).unwrap();
        let info = t.store.session(session.id).unwrap();
        assert_eq!(info.root, Some(uploaded.reference));
        assert_eq!(info.stored, 1);
    }

    #[test]
    fn dev_mode_accepts_deferred_chunks_only() {
        let t = TestNode::with_config(NodeConfig::default().with_mode(NodeMode::Dev));
        let data = wire(b"dev");
        let err = t.node.add_chunk(&t.cx, &t.options(), data.as_slice()).unwrap_err();
        assert_eq!(err.to_string(), "operation not supported in dev mode");

        let uploaded = t
            .node
            .add_chunk(&t.cx, &t.options().deferred(true), data.as_slice())
            .unwrap();
        assert!(t.store.is_committed(&uploaded.reference));
    }

    #[test]
    fn single_owner_chunk_round_trip() {
        let t = TestNode::new();
        let owner = PrivateKeySigner::random();
        let id = B256::repeat_byte(0x11);
        let inner = ContentChunk::new(b"signed payload".to_vec()).unwrap();
        let mut digest = alloy_primitives::Keccak256::new();
        digest.update(id);
        digest.update(inner.address());
        let signature = owner.sign_message_sync(digest.finalize().as_slice()).unwrap();

        let uploaded = t
            .node
            .add_single_owner_chunk(
                &t.cx,
                &t.options(),
                wire(b"signed payload").as_slice(),
                id,
                owner.address(),
                signature,
            )
            .unwrap();
        assert_eq!(
            uploaded.reference,
            SingleOwnerChunk::calculate_address(&id, &owner.address())
        );

        let chunk = t
            .node
            .get_chunk(&t.cx, &uploaded.reference, &AccessOptions::default())
            .unwrap();
        assert_eq!(chunk.as_single_owner().unwrap().owner().unwrap(), owner.address());

        // Signed by someone else than the claimed owner
        let err = t
            .node
            .add_single_owner_chunk(
                &t.cx,
                &t.options(),
                wire(b"signed payload").as_slice(),
                id,
                Address::repeat_byte(1),
                signature,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn single_owner_chunk_size_limits() {
        let t = TestNode::new();
        let upload = |data: Vec<u8>| {
            t.node
                .add_single_owner_chunk(
                    &t.cx,
                    &t.options(),
                    data.as_slice(),
                    B256::ZERO,
                    Address::ZERO,
                    Signature::new(U256::from(1), U256::from(1), false),
                )
                .unwrap_err()
                .to_string()
        };
        assert_eq!(upload(vec![0; 4]), "chunk data too short");
        assert_eq!(upload(vec![0; 4096 + 9]), "chunk data exceeds required length");
    }
}
