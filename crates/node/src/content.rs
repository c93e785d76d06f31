//! Byte uploads and downloads.

use std::io::Read;

use apiary_primitives::SwarmAddress;
use apiary_storage::Cancellation;
use bytes::Bytes;
use tracing::{debug, error};

use crate::{AccessOptions, Node, Result, UploadOptions, Uploaded};

impl Node {
    /// Split everything `reader` yields into a chunk tree and store it.
    ///
    /// A protected upload returns the encrypted root and the history it was
    /// protected under.
    pub fn add_bytes(
        &self,
        cx: &Cancellation,
        options: &UploadOptions,
        mut reader: impl Read,
    ) -> Result<Uploaded> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let pipeline = self.pipeline(options);

        let mut session = self
            .open_session(options)
            .inspect_err(|err| error!(error = %err, "get putter failed"))?;
        let uploaded = session
            .run(|session| {
                let root = self.splitter().split(cx, session, &data, pipeline)?;
                let uploaded = self.protect_if(cx, session, root, options)?;
                session.done(cx, root)?;
                Ok(uploaded)
            })
            .inspect_err(|err| error!(error = %err, batch = %session.batch(), "bytes upload failed"))?;

        debug!(reference = %uploaded.reference, size = data.len(), "bytes uploaded");
        Ok(uploaded)
    }

    /// Join the tree under `reference`, resolving it through `access` first.
    pub fn get_bytes(
        &self,
        cx: &Cancellation,
        reference: &SwarmAddress,
        access: &AccessOptions,
    ) -> Result<Bytes> {
        let root = self
            .resolve(cx, reference, access)
            .inspect_err(|err| error!(error = %err, %reference, "access control download failed"))?;
        Ok(self.splitter().join(cx, self.getter(), &root)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestNode;
    use crate::{Error, ErrorKind, NodeConfig};
    use apiary_storage::Getter;

    #[test]
    fn bytes_round_trip() {
        let t = TestNode::new();
        let data = vec![7u8; 10_000];
        let uploaded = t.node.add_bytes(&t.cx, &t.options(), data.as_slice()).unwrap();
        assert!(uploaded.history.is_none());
        assert!(t.store.is_committed(&uploaded.reference));
        assert_eq!(t.store.uncommitted(), 0);

        let read = t
            .node
            .get_bytes(&t.cx, &uploaded.reference, &AccessOptions::default())
            .unwrap();
        assert_eq!(read.as_ref(), data.as_slice());
    }

    #[test]
    fn protected_bytes_round_trip() {
        let t = TestNode::new();
        let options = t.options().protected(SwarmAddress::zero());
        let uploaded = t.node.add_bytes(&t.cx, &options, b"secret".as_slice()).unwrap();
        let history = uploaded.history.unwrap();
        assert!(!history.is_zero());
        assert!(t.store.is_committed(&history));

        let access = AccessOptions::new(t.node.public_key(), history);
        let read = t.node.get_bytes(&t.cx, &uploaded.reference, &access).unwrap();
        assert_eq!(read.as_ref(), b"secret");
    }

    #[test]
    fn access_roots_do_not_finalize_the_content() {
        let t = TestNode::new();
        let data = vec![3u8; 9_000];
        let mut session = t.node.open_session(&t.options()).unwrap();
        let root = t
            .node
            .splitter()
            .split(&t.cx, &mut session, &data, Default::default())
            .unwrap();
        let (_, history) = t
            .node
            .protect(&t.cx, &mut session, &root, &SwarmAddress::zero())
            .unwrap();

        assert!(t.store.is_committed(&history));
        assert!(!t.store.is_committed(&root));

        session.cleanup().unwrap();
        assert!(!t.store.has(&root).unwrap());
        assert!(t.store.is_committed(&history));
    }

    #[test]
    fn pinned_uploads() {
        let t = TestNode::new();
        let uploaded = t
            .node
            .add_bytes(&t.cx, &t.options().pinned(true), b"keep".as_slice())
            .unwrap();
        assert!(t.store.is_pinned(&uploaded.reference));

        let unpinned = t.node.add_bytes(&t.cx, &t.options(), b"drop".as_slice()).unwrap();
        assert!(!t.store.is_pinned(&unpinned.reference));

        let t = TestNode::with_config(NodeConfig::default().with_pin(true));
        let uploaded = t.node.add_bytes(&t.cx, &t.options(), b"keep".as_slice()).unwrap();
        assert!(t.store.is_pinned(&uploaded.reference));
    }

    #[test]
    fn encrypted_pipeline_is_unsupported_and_cleaned_up() {
        let t = TestNode::new();
        let options = t.options().with_encryption(true);
        let err = t.node.add_bytes(&t.cx, &options, b"data".as_slice()).unwrap_err();
        assert!(matches!(err, Error::Aborted { .. }));
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(t.store.is_empty());
    }

    #[test]
    fn cancelled_upload_finalizes_nothing() {
        let t = TestNode::new();
        t.cx.cancel();
        let err = t.node.add_bytes(&t.cx, &t.options(), b"data".as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(t.store.is_empty());
    }
}
