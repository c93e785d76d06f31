//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Result, StorageError};

/// A cancellation flag shared between a caller and the work it started.
///
/// Clones observe the same flag. Work checks it between steps and stops with
/// [`StorageError::Cancelled`] once it is raised.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// A fresh, unraised flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fail with [`StorageError::Cancelled`] if the flag has been raised.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let cx = Cancellation::new();
        let observer = cx.clone();
        assert!(observer.check().is_ok());

        cx.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(StorageError::Cancelled)));
    }
}
