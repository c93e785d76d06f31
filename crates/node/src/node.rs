//! The node: identity, collaborators and the session plumbing every
//! operation shares.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, hex};
use alloy_signer_local::PrivateKeySigner;
use apiary_access_control::{Controller, PublicKey, Session};
use apiary_postage::{
    BatchId, BatchStamper, BatchStore, PostageService, PresignedStamper, Stamp, StampError,
    UsableError,
};
use apiary_primitives::SwarmAddress;
use apiary_storage::{
    Cancellation, ChunkStore, ChunkTree, Getter, PipelineOptions, RedundancyLevel, Splitter,
};
use k256::SecretKey;
use tracing::debug;

use crate::session::BoxStamper;
use crate::{Clock, Error, FeedLookup, NodeConfig, NodeMode, Result, SequenceLookup, UploadSession};

/// How an upload is paid for, stored and protected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    batch: String,
    stamp: Option<Vec<u8>>,
    protect: bool,
    history: SwarmAddress,
    encrypt: bool,
    redundancy: Option<RedundancyLevel>,
    deferred: bool,
    pinned: bool,
    session_id: u64,
}

impl UploadOptions {
    /// Upload paid for by the hex-encoded batch `batch`.
    pub fn new(batch: impl Into<String>) -> Self {
        Self {
            batch: batch.into(),
            ..Self::default()
        }
    }

    /// Stamp with a presigned stamp instead of issuing one.
    ///
    /// The batch is then taken from the stamp.
    #[must_use]
    pub fn with_stamp(mut self, stamp: impl Into<Vec<u8>>) -> Self {
        self.stamp = Some(stamp.into());
        self
    }

    /// Encrypt the resulting reference under the access history at
    /// `history`, or a new one if `history` is zero.
    #[must_use]
    pub const fn protected(mut self, history: SwarmAddress) -> Self {
        self.protect = true;
        self.history = history;
        self
    }

    /// Ask for an encrypted chunk pipeline.
    #[must_use]
    pub const fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Override the node's default redundancy level.
    #[must_use]
    pub const fn with_redundancy(mut self, redundancy: RedundancyLevel) -> Self {
        self.redundancy = Some(redundancy);
        self
    }

    /// Store locally and track the upload under a session.
    #[must_use]
    pub const fn deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    /// Pin the finalized roots of this upload.
    ///
    /// Pinned uploads are always deferred. A node configured to pin does so
    /// regardless of this flag.
    #[must_use]
    pub const fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    /// Attach the upload to an existing session; zero means none.
    ///
    /// A non-zero id makes the upload deferred.
    #[must_use]
    pub const fn with_session(mut self, session_id: u64) -> Self {
        self.session_id = session_id;
        self
    }

    /// Whether the reference is protected.
    pub const fn is_protected(&self) -> bool {
        self.protect
    }

    /// The prior history root of a protected upload.
    pub const fn history(&self) -> SwarmAddress {
        self.history
    }

    /// The session the upload attaches to.
    pub const fn session_id(&self) -> u64 {
        self.session_id
    }
}

/// Which access history a reference is read through.
///
/// Without both a publisher and a history a reference is used as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessOptions {
    /// Publisher of the protected reference.
    pub publisher: Option<PublicKey>,
    /// History root the reference was protected under.
    pub history: Option<SwarmAddress>,
    /// Time to resolve at; now when absent.
    pub timestamp: Option<u64>,
}

impl AccessOptions {
    /// Resolve through `publisher`'s history at `history`.
    pub const fn new(publisher: PublicKey, history: SwarmAddress) -> Self {
        Self {
            publisher: Some(publisher),
            history: Some(history),
            timestamp: None,
        }
    }

    /// Resolve at `timestamp` instead of now.
    #[must_use]
    pub const fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Result of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uploaded {
    /// Reference to hand out: encrypted when the upload was protected.
    pub reference: SwarmAddress,
    /// History the reference was protected under.
    pub history: Option<SwarmAddress>,
}

/// A node: one identity over a chunk store and a batch store.
///
/// All operations are synchronous and take a [`Cancellation`] handle. A
/// node holds no per-request state; every operation opens its own
/// [`UploadSession`].
pub struct Node {
    config: NodeConfig,
    signer: PrivateKeySigner,
    store: Arc<dyn ChunkStore>,
    postage: Arc<PostageService>,
    splitter: Arc<dyn Splitter>,
    feeds: Arc<dyn FeedLookup>,
    clock: Arc<dyn Clock>,
    access: Controller,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("config", &self.config)
            .field("address", &self.signer.address())
            .field("store", &self.store)
            .field("splitter", &self.splitter)
            .field("feeds", &self.feeds)
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Node signing as `signer` over `store`, paying from batches in `batches`.
    pub fn new(
        config: NodeConfig,
        signer: PrivateKeySigner,
        store: Arc<dyn ChunkStore>,
        batches: Arc<dyn BatchStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let postage = Arc::new(PostageService::new(
            batches,
            signer.address(),
            config.confirmations(),
        ));
        let splitter: Arc<dyn Splitter> = Arc::new(ChunkTree);
        let session = Session::new(SecretKey::from(signer.credential().as_nonzero_scalar()));
        Self {
            config,
            access: Controller::new(session, Arc::clone(&splitter)),
            signer,
            store,
            postage,
            splitter,
            feeds: Arc::new(SequenceLookup),
            clock,
        }
    }

    /// Replace the splitter content and access control structures are stored with.
    #[must_use]
    pub fn with_splitter(mut self, splitter: Arc<dyn Splitter>) -> Self {
        self.access = Controller::new(self.access.session().clone(), Arc::clone(&splitter));
        self.splitter = splitter;
        self
    }

    /// Replace the feed lookup.
    #[must_use]
    pub fn with_feed_lookup(mut self, feeds: Arc<dyn FeedLookup>) -> Self {
        self.feeds = feeds;
        self
    }

    /// The node's configuration.
    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Overlay-independent account address of the node.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Public key other nodes grant access to.
    pub fn public_key(&self) -> PublicKey {
        self.access.session().public_key()
    }

    /// The postage service batches are issued from.
    pub const fn postage(&self) -> &Arc<PostageService> {
        &self.postage
    }

    pub(crate) fn getter(&self) -> &dyn Getter {
        &*self.store
    }

    pub(crate) const fn splitter(&self) -> &Arc<dyn Splitter> {
        &self.splitter
    }

    pub(crate) const fn feeds(&self) -> &Arc<dyn FeedLookup> {
        &self.feeds
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.now()
    }

    pub(crate) const fn access(&self) -> &Controller {
        &self.access
    }

    pub(crate) fn pipeline(&self, options: &UploadOptions) -> PipelineOptions {
        PipelineOptions {
            encrypt: options.encrypt,
            redundancy: options.redundancy.unwrap_or(self.config.redundancy()),
        }
    }

    /// Open the session an upload writes through.
    pub(crate) fn open_session(&self, options: &UploadOptions) -> Result<UploadSession> {
        let pin = options.pinned || self.config.pin();
        let deferred = options.deferred || options.session_id != 0 || pin;
        if self.config.mode() == NodeMode::Dev && !deferred {
            return Err(Error::UnsupportedMode);
        }

        let (stamper, postage): (BoxStamper, Option<Arc<PostageService>>) = match &options.stamp {
            Some(encoded) => {
                let stamp = Stamp::try_from_slice(encoded)?;
                let batch = self
                    .postage
                    .store()
                    .get(&stamp.batch())
                    .map_err(UsableError::from)?
                    .ok_or(StampError::BatchNotFound(stamp.batch()))?;
                (Box::new(PresignedStamper::new(stamp, batch.owner())), None)
            }
            None => {
                let id = parse_batch(&options.batch)?;
                self.postage.usable_batch(&id)?;
                let issuer = self.postage.stamp_issuer(&id)?;
                (
                    Box::new(BatchStamper::new(issuer, self.signer.clone())),
                    Some(Arc::clone(&self.postage)),
                )
            }
        };

        let inner = if deferred {
            let session = match options.session_id {
                0 => self.store.new_session()?,
                id => self.store.session(id)?,
            };
            debug!(session = session.id, pin, "deferred upload");
            self.store.upload(pin, session.id)?
        } else {
            self.store.direct_upload()?
        };
        Ok(UploadSession::new(inner, stamper, postage))
    }

    /// Encrypt `reference` under the history of a protected upload and
    /// finalize any roots that creates.
    pub(crate) fn protect(
        &self,
        cx: &Cancellation,
        session: &mut UploadSession,
        reference: &SwarmAddress,
        history: &SwarmAddress,
    ) -> Result<(SwarmAddress, SwarmAddress)> {
        let protected = self.access.upload_handler(
            cx,
            self.getter(),
            session,
            reference,
            &self.public_key(),
            history,
            self.now(),
        )?;
        if protected.history != *history {
            session.done(cx, protected.access_list)?;
            session.done(cx, protected.history)?;
        }
        Ok((protected.encrypted, protected.history))
    }

    /// Protect `reference` when `options` ask for it.
    pub(crate) fn protect_if(
        &self,
        cx: &Cancellation,
        session: &mut UploadSession,
        reference: SwarmAddress,
        options: &UploadOptions,
    ) -> Result<Uploaded> {
        if !options.protect {
            return Ok(Uploaded {
                reference,
                history: None,
            });
        }
        let (reference, history) = self.protect(cx, session, &reference, &options.history)?;
        Ok(Uploaded {
            reference,
            history: Some(history),
        })
    }

    /// The plain reference behind a possibly protected one.
    pub(crate) fn resolve(
        &self,
        cx: &Cancellation,
        reference: &SwarmAddress,
        access: &AccessOptions,
    ) -> Result<SwarmAddress> {
        let (Some(publisher), Some(history)) = (&access.publisher, &access.history) else {
            return Ok(*reference);
        };
        let timestamp = access.timestamp.unwrap_or_else(|| self.now());
        Ok(self
            .access
            .download_handler(cx, self.getter(), reference, publisher, history, timestamp)?)
    }
}

/// Decode a hex batch id.
///
/// # Errors
///
/// [`Error::Input`] when `batch` is empty, [`Error::InvalidBatch`] when it
/// is not a 32-byte hex string.
pub fn parse_batch(batch: &str) -> Result<BatchId> {
    if batch.is_empty() {
        return Err(Error::input("batch is not set"));
    }
    let bytes = hex::decode(batch).map_err(|err| Error::InvalidBatch(err.to_string()))?;
    BatchId::try_from(bytes.as_slice()).map_err(|_| {
        Error::InvalidBatch(format!("expected 32 bytes, got {}", bytes.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, ManualClock};
    use alloy_primitives::B256;
    use apiary_postage::{Batch, ChainState, MemoryBatchStore};
    use apiary_storage::MemoryStore;

    fn node(config: NodeConfig) -> (Node, BatchId) {
        let signer = PrivateKeySigner::random();
        let batches = Arc::new(MemoryBatchStore::new(ChainState::new(100, 0)));
        let batch = Batch::new(B256::repeat_byte(5), 1, Some(1), signer.address(), 20, 16, true);
        batches.put(batch.clone()).unwrap();
        let node = Node::new(
            config,
            signer,
            Arc::new(MemoryStore::new()),
            batches,
            Arc::new(ManualClock::new(1_000)),
        );
        node.postage().add(&batch);
        (node, batch.id())
    }

    #[test]
    fn batch_parsing() {
        assert_eq!(parse_batch("").unwrap_err().kind(), ErrorKind::Input);
        assert_eq!(parse_batch("zz").unwrap_err().kind(), ErrorKind::Capacity);
        assert_eq!(parse_batch("abcd").unwrap_err().kind(), ErrorKind::Capacity);

        let id = B256::repeat_byte(0xab);
        assert_eq!(parse_batch(&hex::encode(id)).unwrap(), id);
    }

    #[test]
    fn dev_mode_needs_deferred_uploads() {
        let (node, batch) = node(NodeConfig::default().with_mode(NodeMode::Dev));
        let options = UploadOptions::new(hex::encode(batch));
        assert!(matches!(node.open_session(&options), Err(Error::UnsupportedMode)));
        assert!(node.open_session(&options.deferred(true)).is_ok());
    }

    #[test]
    fn unknown_session_is_not_found() {
        let (node, batch) = node(NodeConfig::default());
        let options = UploadOptions::new(hex::encode(batch)).with_session(42);
        assert_eq!(
            node.open_session(&options).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn unknown_batch_is_capacity() {
        let (node, _) = node(NodeConfig::default());
        let options = UploadOptions::new(hex::encode(B256::repeat_byte(9)));
        assert_eq!(
            node.open_session(&options).unwrap_err().kind(),
            ErrorKind::Capacity
        );
    }

    #[test]
    fn unprotected_reads_pass_through() {
        let (node, _) = node(NodeConfig::default());
        let reference = SwarmAddress::new([3; 32]);
        let cx = Cancellation::new();
        assert_eq!(node.resolve(&cx, &reference, &AccessOptions::default()).unwrap(), reference);

        let only_publisher = AccessOptions {
            publisher: Some(node.public_key()),
            ..AccessOptions::default()
        };
        assert_eq!(node.resolve(&cx, &reference, &only_publisher).unwrap(), reference);
    }

    #[test]
    fn pipeline_defaults_to_configured_redundancy() {
        let (node, batch) = node(NodeConfig::default().with_redundancy(RedundancyLevel::Medium));
        let options = UploadOptions::new(hex::encode(batch));
        assert_eq!(node.pipeline(&options).redundancy, RedundancyLevel::Medium);
        let options = options.with_redundancy(RedundancyLevel::Insane);
        assert_eq!(node.pipeline(&options).redundancy, RedundancyLevel::Insane);
    }
}
