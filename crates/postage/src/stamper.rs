//! Stampers: produce signed stamps for chunk addresses.
//!
//! Stamps are signed with EIP-191 personal message signing over the digest
//! prehash, via [`SignerSync::sign_message_sync`].

use alloy_primitives::Address;
use alloy_signer::SignerSync;
use apiary_primitives::SwarmAddress;

use crate::{BatchId, SigningError, Stamp, StampError, StampIssuer, current_timestamp};

/// Something that can stamp chunks for one batch.
pub trait Stamper {
    /// The error type returned when stamping fails.
    type Error: From<StampError>;

    /// Produce a stamp for the chunk at `address`.
    fn stamp(&mut self, address: &SwarmAddress) -> Result<Stamp, Self::Error>;

    /// Returns the batch ID that stamps are issued for.
    fn batch_id(&self) -> BatchId;
}

/// A stamper that combines an issuer (for bucket tracking) with a signer.
#[derive(Debug, Clone)]
pub struct BatchStamper<I, S> {
    issuer: I,
    signer: S,
}

impl<I, S> BatchStamper<I, S> {
    /// Creates a new batch stamper with the given issuer and signer.
    pub const fn new(issuer: I, signer: S) -> Self {
        Self { issuer, signer }
    }

    /// Returns a reference to the issuer.
    pub const fn issuer(&self) -> &I {
        &self.issuer
    }
}

impl<I, S> Stamper for BatchStamper<I, S>
where
    I: StampIssuer,
    S: SignerSync,
{
    type Error = SigningError;

    fn stamp(&mut self, address: &SwarmAddress) -> Result<Stamp, Self::Error> {
        let digest = self.issuer.prepare_stamp(address, current_timestamp())?;
        let sig = self.signer.sign_message_sync(digest.to_prehash().as_slice())?;

        Ok(Stamp::with_index(
            digest.batch_id,
            digest.index,
            digest.timestamp,
            sig.as_bytes(),
        ))
    }

    fn batch_id(&self) -> BatchId {
        self.issuer.batch_id()
    }
}

/// A stamper that hands out a stamp signed elsewhere.
///
/// Every use checks that the stamp's signature recovers the batch owner for
/// the address being stamped.
#[derive(Debug, Clone)]
pub struct PresignedStamper {
    stamp: Stamp,
    owner: Address,
}

impl PresignedStamper {
    /// Wrap a presigned stamp for a batch owned by `owner`.
    pub const fn new(stamp: Stamp, owner: Address) -> Self {
        Self { stamp, owner }
    }
}

impl Stamper for PresignedStamper {
    type Error = SigningError;

    fn stamp(&mut self, address: &SwarmAddress) -> Result<Stamp, Self::Error> {
        let actual = self.stamp.recover_owner(*address)?;
        if actual != self.owner {
            return Err(StampError::OwnerMismatch {
                expected: self.owner,
                actual,
            }
            .into());
        }
        Ok(self.stamp.clone())
    }

    fn batch_id(&self) -> BatchId {
        self.stamp.batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Batch, MemoryIssuer};
    use alloy_primitives::B256;
    use alloy_signer_local::PrivateKeySigner;

    fn setup() -> (Batch, PrivateKeySigner) {
        let signer = PrivateKeySigner::random();
        let batch = Batch::new(B256::repeat_byte(3), 100, Some(0), signer.address(), 20, 16, true);
        (batch, signer)
    }

    #[test]
    fn batch_stamper_produces_valid_stamps() {
        let (batch, signer) = setup();
        let mut stamper = BatchStamper::new(MemoryIssuer::from_batch(&batch), signer);

        let address = SwarmAddress::new([0x42; 32]);
        let stamp = stamper.stamp(&address).unwrap();

        assert_eq!(stamper.batch_id(), batch.id());
        assert_eq!(stamp.validate(address, &batch), Ok(()));
        assert_eq!(stamper.issuer().stamps_issued(), 1);
    }

    #[test]
    fn presigned_stamper_checks_owner() {
        let (batch, signer) = setup();
        let address = SwarmAddress::new([0x42; 32]);
        let stamp = BatchStamper::new(MemoryIssuer::from_batch(&batch), signer)
            .stamp(&address)
            .unwrap();

        let mut good = PresignedStamper::new(stamp.clone(), batch.owner());
        assert_eq!(good.stamp(&address).unwrap(), stamp);

        // Signed for another address, so recovery yields a different key
        assert!(good.stamp(&SwarmAddress::new([0x43; 32])).is_err());

        let mut wrong_owner = PresignedStamper::new(stamp, Address::ZERO);
        assert!(matches!(
            wrong_owner.stamp(&address),
            Err(SigningError::Stamp(StampError::OwnerMismatch { .. }))
        ));
    }
}
