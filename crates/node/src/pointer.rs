//! Mutable pointers: feed manifests and their resolution.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, hex};
use apiary_primitives::SwarmAddress;
use apiary_storage::Cancellation;
use tracing::{debug, error};

use crate::{
    FEED_OWNER_KEY, FEED_TOPIC_KEY, FEED_TYPE_KEY, Feed, FeedType, ManifestEntry, MetadataTree,
    Node, ROOT_PATH, Result, UploadOptions, Uploaded,
};

/// The manifest describing the feed of `owner` under `topic`.
pub fn feed_manifest(owner: &Address, topic: &B256) -> MetadataTree {
    let metadata = BTreeMap::from([
        (FEED_OWNER_KEY.to_owned(), hex::encode(owner)),
        (FEED_TOPIC_KEY.to_owned(), hex::encode(topic)),
        (FEED_TYPE_KEY.to_owned(), FeedType::Sequence.to_string()),
    ]);
    let mut tree = MetadataTree::new();
    tree.add(ROOT_PATH, ManifestEntry::new(SwarmAddress::zero(), metadata));
    tree
}

impl Node {
    /// Store a manifest naming the feed of `owner` under `topic`.
    ///
    /// The manifest carries no content; readers resolve it through
    /// [`resolve_pointer`](Self::resolve_pointer).
    pub fn publish_pointer(
        &self,
        cx: &Cancellation,
        options: &UploadOptions,
        owner: Address,
        topic: B256,
    ) -> Result<Uploaded> {
        let pipeline = self.pipeline(options);
        let mut session = self
            .open_session(options)
            .inspect_err(|err| error!(error = %err, "get putter failed"))?;
        let uploaded = session
            .run(|session| {
                let root = feed_manifest(&owner, &topic).save(
                    cx,
                    session,
                    &**self.splitter(),
                    pipeline,
                )?;
                let uploaded = self.protect_if(cx, session, root, options)?;
                session.done(cx, root)?;
                Ok(uploaded)
            })
            .inspect_err(|err| error!(error = %err, %owner, %topic, "feed manifest upload failed"))?;

        debug!(reference = %uploaded.reference, %owner, %topic, "feed manifest stored");
        Ok(uploaded)
    }

    /// Content address of the latest update of the feed at `at` (now when
    /// absent), probing from index `after`.
    ///
    /// `None` when the feed has no update by then.
    pub fn resolve_pointer(
        &self,
        cx: &Cancellation,
        owner: Address,
        topic: B256,
        at: Option<u64>,
        after: u64,
    ) -> Result<Option<SwarmAddress>> {
        let at = at.unwrap_or_else(|| self.now());
        let feed = Feed::new(owner, topic);
        let Some(update) = self
            .feeds()
            .at(cx, self.getter(), &feed, at, after)
            .inspect_err(|err| error!(error = %err, at, "lookup at failed"))?
        else {
            debug!(%owner, %topic, at, "no update found");
            return Ok(None);
        };
        let address = update
            .wrapped_address(cx, self.getter())
            .inspect_err(|err| error!(error = %err, index = update.index, "wrapped chunk cannot be retrieved"))?;
        Ok(Some(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestNode;
    use crate::{AccessOptions, legacy_payload};
    use alloy_signer_local::PrivateKeySigner;
    use apiary_primitives::{Chunk, ContentChunk};

    #[test]
    fn manifest_names_the_feed() {
        let t = TestNode::new();
        let owner = Address::repeat_byte(0x0f);
        let topic = B256::repeat_byte(0xaa);
        let uploaded = t
            .node
            .publish_pointer(&t.cx, &t.options(), owner, topic)
            .unwrap();
        assert!(t.store.is_committed(&uploaded.reference));

        let tree = MetadataTree::load(&t.cx, &t.store, &**t.node.splitter(), &uploaded.reference)
            .unwrap();
        let root = tree.get(ROOT_PATH).unwrap();
        assert!(root.reference.is_zero());
        assert_eq!(root.metadata[FEED_OWNER_KEY], hex::encode(owner));
        assert_eq!(root.metadata[FEED_TOPIC_KEY], hex::encode(topic));
        assert_eq!(root.metadata[FEED_TYPE_KEY], "Sequence");
    }

    #[test]
    fn protected_manifest_resolves_to_plain_root() {
        let t = TestNode::new();
        let owner = Address::repeat_byte(1);
        let topic = B256::repeat_byte(2);
        let options = t.options().protected(SwarmAddress::zero());
        let uploaded = t.node.publish_pointer(&t.cx, &options, owner, topic).unwrap();
        let plain = t
            .node
            .resolve(
                &t.cx,
                &uploaded.reference,
                &AccessOptions::new(t.node.public_key(), uploaded.history.unwrap()),
            )
            .unwrap();
        assert!(t.store.is_committed(&plain));
        let tree = MetadataTree::load(&t.cx, &t.store, &**t.node.splitter(), &plain).unwrap();
        assert_eq!(tree, feed_manifest(&owner, &topic));
    }

    #[test]
    fn resolve_follows_updates() {
        let t = TestNode::new();
        let signer = PrivateKeySigner::random();
        let topic = B256::repeat_byte(3);
        assert_eq!(
            t.node
                .resolve_pointer(&t.cx, signer.address(), topic, None, 0)
                .unwrap(),
            None
        );

        let target = ContentChunk::new(b"pointer target".to_vec()).unwrap();
        let feed = Feed::new(signer.address(), topic);
        let update = feed
            .new_update(0, legacy_payload(500, target.address()), &signer)
            .unwrap();
        let target_wire: bytes::Bytes = target.clone().into();
        t.node
            .add_chunk(&t.cx, &t.options(), target_wire.as_ref())
            .unwrap();
        let inner: bytes::Bytes = update.wrapped().into();
        t.node
            .add_single_owner_chunk(
                &t.cx,
                &t.options(),
                inner.as_ref(),
                update.id(),
                signer.address(),
                *update.signature(),
            )
            .unwrap();

        let resolve = |at| {
            t.node
                .resolve_pointer(&t.cx, signer.address(), topic, Some(at), 0)
                .unwrap()
        };
        assert_eq!(resolve(499), None);
        assert_eq!(resolve(500), Some(*target.address()));
        t.clock.set(1_000);
        assert_eq!(
            t.node
                .resolve_pointer(&t.cx, signer.address(), topic, None, 0)
                .unwrap(),
            Some(*target.address())
        );
    }
}
