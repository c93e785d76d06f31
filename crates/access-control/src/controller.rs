//! Upload, download and grantee update flows.

use std::sync::Arc;

use alloy_primitives::B256;
use apiary_primitives::SwarmAddress;
use apiary_storage::{Cancellation, Getter, Putter, Splitter};
use k256::PublicKey;
use tracing::debug;

use crate::{AccessControlError, AccessList, Cipher, GranteeList, History, Result, Session};

/// Roots produced by protecting a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protected {
    /// Access list in force for the reference.
    pub access_list: SwarmAddress,
    /// History the access list belongs to.
    pub history: SwarmAddress,
    /// The encrypted reference.
    pub encrypted: SwarmAddress,
}

/// Roots produced by a grantee update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GranteeUpdate {
    /// The stored grantee list.
    pub registry: SwarmAddress,
    /// The grantee list root encrypted for the publisher.
    pub encrypted_registry: SwarmAddress,
    /// The extended history.
    pub history: SwarmAddress,
    /// The new access list.
    pub access_list: SwarmAddress,
}

/// Access control flows for the node owning `session`.
///
/// Handlers only read through the [`Getter`] and write through the
/// [`Putter`] they are given; finalizing the roots they return is up to the
/// caller.
#[derive(Debug, Clone)]
pub struct Controller {
    session: Session,
    splitter: Arc<dyn Splitter>,
}

impl Controller {
    /// Controller acting as the owner of `session`.
    pub fn new(session: Session, splitter: Arc<dyn Splitter>) -> Self {
        Self { session, splitter }
    }

    /// The session keys act with.
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn wrap_for(&self, list: &mut AccessList, grantee: &PublicKey, access_key: &B256) {
        let keys = self.session.keys(grantee);
        let wrapped = Cipher::new(keys.decryption).reference(&SwarmAddress(*access_key));
        list.put(keys.lookup, wrapped.0);
    }

    fn access_key(&self, list: &AccessList, publisher: &PublicKey) -> Result<B256> {
        let keys = self.session.keys(publisher);
        let wrapped = list
            .get(&keys.lookup)
            .ok_or(AccessControlError::AccessDenied)?;
        Ok(Cipher::new(keys.decryption).reference(&SwarmAddress(*wrapped)).0)
    }

    /// A fresh access list holding a new random access key for the publisher.
    fn fresh_access_list(&self, publisher: &PublicKey) -> (AccessList, B256) {
        let access_key = B256::random();
        let mut list = AccessList::new();
        self.wrap_for(&mut list, publisher, &access_key);
        (list, access_key)
    }

    fn load_current(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
        history: &History,
        publisher: &PublicKey,
        now: u64,
    ) -> Result<(SwarmAddress, AccessList, B256)> {
        let entry = history.lookup(now).ok_or(AccessControlError::AccessDenied)?;
        let list = AccessList::load(cx, getter, &*self.splitter, &entry.access_list)?;
        let access_key = self.access_key(&list, publisher)?;
        Ok((entry.access_list, list, access_key))
    }

    fn publisher_cipher(&self, publisher: &PublicKey) -> Cipher {
        Cipher::new(self.session.keys(publisher).decryption)
    }

    /// Encrypt `reference` for the publisher's grantees.
    ///
    /// With a zero `history_root` a new access list and history are created
    /// at `now`. Otherwise the access list in force at `now` is reused and
    /// the returned history equals `history_root`.
    #[allow(clippy::too_many_arguments)]
    pub fn upload_handler(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
        putter: &mut dyn Putter,
        reference: &SwarmAddress,
        publisher: &PublicKey,
        history_root: &SwarmAddress,
        now: u64,
    ) -> Result<Protected> {
        let (access_list, history, access_key) = if history_root.is_zero() {
            let (list, access_key) = self.fresh_access_list(publisher);
            let access_list = list.save(cx, putter, &*self.splitter)?;

            let mut history = History::new();
            history.add(access_list, now);
            let history_root = history.save(cx, putter, &*self.splitter)?;
            debug!(%access_list, history = %history_root, "created access history");
            (access_list, history_root, access_key)
        } else {
            let history = History::load(cx, getter, &*self.splitter, history_root)?;
            let (access_list, _, access_key) =
                self.load_current(cx, getter, &history, publisher, now)?;
            (access_list, *history_root, access_key)
        };

        Ok(Protected {
            access_list,
            history,
            encrypted: Cipher::new(access_key).reference(reference),
        })
    }

    /// Decrypt `encrypted` using the access list in force at `timestamp`.
    ///
    /// # Errors
    ///
    /// [`AccessControlError::AccessDenied`] if the history has no entry at
    /// `timestamp` or its access list has nothing for this node.
    pub fn download_handler(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
        encrypted: &SwarmAddress,
        publisher: &PublicKey,
        history_root: &SwarmAddress,
        timestamp: u64,
    ) -> Result<SwarmAddress> {
        let history = History::load(cx, getter, &*self.splitter, history_root)?;
        let (_, _, access_key) = self.load_current(cx, getter, &history, publisher, timestamp)?;
        Ok(Cipher::new(access_key).reference(encrypted))
    }

    /// Add and revoke grantees, appending a new access list to the history.
    ///
    /// A zero `encrypted_registry` starts an empty grantee list. Additions
    /// wrap the current access key for the new grantees only; any revocation
    /// rotates the access key for the publisher and every remaining grantee.
    /// The publisher always has access and is never stored as a grantee.
    #[allow(clippy::too_many_arguments)]
    pub fn update_handler(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
        putter: &mut dyn Putter,
        encrypted_registry: &SwarmAddress,
        history_root: &SwarmAddress,
        publisher: &PublicKey,
        add: &[PublicKey],
        revoke: &[PublicKey],
        now: u64,
    ) -> Result<GranteeUpdate> {
        if add.is_empty() && revoke.is_empty() {
            return Err(AccessControlError::EmptyUpdate);
        }

        let mut grantees = if encrypted_registry.is_zero() {
            GranteeList::new()
        } else {
            self.get_grantees(cx, getter, publisher, encrypted_registry)?
        };
        let additions: Vec<PublicKey> = add.iter().filter(|key| *key != publisher).copied().collect();
        let added = grantees.add(&additions);
        grantees.remove(revoke);

        let mut history = if history_root.is_zero() {
            History::new()
        } else {
            History::load(cx, getter, &*self.splitter, history_root)?
        };

        let rotate = history_root.is_zero() || !revoke.is_empty();
        let (mut list, access_key, recipients) = if rotate {
            let (list, access_key) = self.fresh_access_list(publisher);
            (list, access_key, grantees.keys().to_vec())
        } else {
            let (_, list, access_key) = self.load_current(cx, getter, &history, publisher, now)?;
            (list, access_key, added)
        };
        for grantee in &recipients {
            self.wrap_for(&mut list, grantee, &access_key);
        }

        let access_list = list.save(cx, putter, &*self.splitter)?;
        history.add(access_list, now);
        let history = history.save(cx, putter, &*self.splitter)?;
        let registry = grantees.save(cx, putter, &*self.splitter, &self.session)?;
        let encrypted_registry = self.publisher_cipher(publisher).reference(&registry);

        debug!(
            grantees = grantees.len(),
            wrapped = recipients.len(),
            rotated = rotate,
            %history,
            "updated grantees"
        );
        Ok(GranteeUpdate {
            registry,
            encrypted_registry,
            history,
            access_list,
        })
    }

    /// Load the grantee list behind an encrypted registry root.
    pub fn get_grantees(
        &self,
        cx: &Cancellation,
        getter: &dyn Getter,
        publisher: &PublicKey,
        encrypted_registry: &SwarmAddress,
    ) -> Result<GranteeList> {
        let registry = self.publisher_cipher(publisher).reference(encrypted_registry);
        GranteeList::load(cx, getter, &*self.splitter, &self.session, &registry)
    }
}
