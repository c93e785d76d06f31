//! Upload sessions: stamp every chunk, then hand it to the store.

use std::fmt;
use std::sync::Arc;

use apiary_postage::{BatchId, PostageService, SigningError, Stamper};
use apiary_primitives::{AnyChunk, SwarmAddress};
use apiary_storage::{Cancellation, Putter, PutterSession, StampedChunk, StorageError};
use tracing::{debug, warn};

use crate::{Error, Result};

pub(crate) type BoxStamper = Box<dyn Stamper<Error = SigningError> + Send>;

/// A write transaction whose chunks are paid for by one batch.
///
/// Every chunk put through the session is stamped before it reaches the
/// store. Each root the operation produces must be finalized with
/// [`done`](Self::done); anything not finalized is discarded by
/// [`cleanup`](Self::cleanup) or when the session is dropped.
pub struct UploadSession {
    inner: Box<dyn PutterSession>,
    stamper: BoxStamper,
    postage: Option<Arc<PostageService>>,
    batch: BatchId,
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("batch", &self.batch)
            .field("issued", &self.postage.is_some())
            .finish_non_exhaustive()
    }
}

impl UploadSession {
    /// Session over `inner`, stamping with `stamper`.
    ///
    /// With `postage` set, the batch's issuer state is saved back to the
    /// service each time a root is finalized.
    pub(crate) fn new(
        inner: Box<dyn PutterSession>,
        stamper: BoxStamper,
        postage: Option<Arc<PostageService>>,
    ) -> Self {
        let batch = stamper.batch_id();
        Self {
            inner,
            stamper,
            postage,
            batch,
        }
    }

    /// The batch paying for this session.
    pub const fn batch(&self) -> BatchId {
        self.batch
    }

    /// Stamp `chunk` and write it.
    pub fn put(&mut self, cx: &Cancellation, chunk: AnyChunk) -> apiary_storage::Result<()> {
        cx.check()?;
        let stamp = self.stamper.stamp(chunk.address())?;
        self.inner.put(cx, StampedChunk::new(chunk, stamp))
    }

    /// Finalize the tree under `root`.
    pub fn done(&mut self, cx: &Cancellation, root: SwarmAddress) -> apiary_storage::Result<()> {
        cx.check()?;
        self.inner.done(cx, root)?;
        if let Some(postage) = &self.postage {
            postage
                .save(&self.batch)
                .map_err(|err| StorageError::Stamp(err.into()))?;
        }
        debug!(%root, batch = %self.batch, "root finalized");
        Ok(())
    }

    /// Discard everything not finalized.
    pub fn cleanup(&mut self) -> apiary_storage::Result<()> {
        self.inner.cleanup()
    }

    /// Run `write` against the session, cleaning up if it fails.
    ///
    /// A failure is returned as [`Error::Aborted`] carrying the write error
    /// and, if cleanup failed too, the cleanup error.
    pub fn run<T>(&mut self, write: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        write(self).map_err(|cause| {
            let cleanup = self.cleanup().err().map(Error::from);
            if let Some(err) = &cleanup {
                warn!(batch = %self.batch, error = %err, "session cleanup failed");
            }
            Error::aborted(cause, cleanup)
        })
    }
}

impl Putter for UploadSession {
    fn put(&mut self, cx: &Cancellation, chunk: AnyChunk) -> apiary_storage::Result<()> {
        Self::put(self, cx, chunk)
    }
}
