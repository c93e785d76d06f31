//! Grantee registry operations.

use apiary_access_control::{AccessControlError, PublicKey, decode_public_key, encode_public_key};
use apiary_primitives::SwarmAddress;
use apiary_storage::Cancellation;
use tracing::{debug, error};

use crate::{Error, Node, Result, UploadOptions};

/// Roots handed back after changing a grantee registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GranteesUpdated {
    /// The new registry root, encrypted for the publisher.
    pub registry: SwarmAddress,
    /// The extended access history.
    pub history: SwarmAddress,
}

fn parse_keys(keys: &[String]) -> Result<Vec<PublicKey>> {
    keys.iter()
        .map(|key| decode_public_key(key).map_err(Error::from))
        .collect()
}

impl Node {
    /// Hex-encoded compressed public keys of everyone in the registry.
    pub fn list_grantees(&self, cx: &Cancellation, registry: &SwarmAddress) -> Result<Vec<String>> {
        let grantees = self
            .access()
            .get_grantees(cx, self.getter(), &self.public_key(), registry)
            .inspect_err(|err| error!(error = %err, %registry, "could not get grantees"))?;
        Ok(grantees.keys().iter().map(encode_public_key).collect())
    }

    /// Add and revoke grantees of the registry at `registry` (zero for a new
    /// one) and extend the history at `history` (zero for a new one).
    ///
    /// Only the batch and session settings of `options` apply.
    pub fn update_grantees(
        &self,
        cx: &Cancellation,
        options: &UploadOptions,
        registry: &SwarmAddress,
        history: &SwarmAddress,
        add: &[String],
        revoke: &[String],
    ) -> Result<GranteesUpdated> {
        if add.is_empty() && revoke.is_empty() {
            error!("nothing to add or revoke");
            return Err(AccessControlError::EmptyUpdate.into());
        }
        let add = parse_keys(add).inspect_err(|err| error!(error = %err, "add list key parse failed"))?;
        let revoke =
            parse_keys(revoke).inspect_err(|err| error!(error = %err, "revoke list key parse failed"))?;

        let mut session = self
            .open_session(options)
            .inspect_err(|err| error!(error = %err, "get putter failed"))?;
        let updated = session
            .run(|session| {
                let update = self.access().update_handler(
                    cx,
                    self.getter(),
                    session,
                    registry,
                    history,
                    &self.public_key(),
                    &add,
                    &revoke,
                    self.now(),
                )?;
                session.done(cx, update.access_list)?;
                session.done(cx, update.history)?;
                session.done(cx, update.registry)?;
                Ok(GranteesUpdated {
                    registry: update.encrypted_registry,
                    history: update.history,
                })
            })
            .inspect_err(|err| error!(error = %err, "failed to update grantee list"))?;

        debug!(
            added = add.len(),
            revoked = revoke.len(),
            registry = %updated.registry,
            history = %updated.history,
            "grantees updated"
        );
        Ok(updated)
    }

    /// Start a registry holding `initial`, extending the history at `history`.
    pub fn create_grantees(
        &self,
        cx: &Cancellation,
        options: &UploadOptions,
        history: &SwarmAddress,
        initial: &[String],
    ) -> Result<GranteesUpdated> {
        if initial.is_empty() {
            error!("nothing to create");
            return Err(Error::input("nothing to create"));
        }
        self.update_grantees(cx, options, &SwarmAddress::zero(), history, initial, &[])
    }
}
