use alloc::vec::Vec;

use p224::SecretKey;

use crate::{error::DerivationError, protocol::AdvertisementKey};

/// An implementation of the AirTag's key rotation scheme.
mod airtag;
/// How many keys a beacon rotated through during a time window.
pub mod rotation;

pub use airtag::{AirtagKeyDerivation, KeySchedule};
pub use rotation::{rotation_window, Cadence, RotationWindow};

/// One rotation window's key pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisementKeyPair {
    /// Position in the key schedule.
    pub index: u64,
    pub private_key: SecretKey,
    pub public_key: AdvertisementKey,
}

/// Derives the advertisement keys of a rotating accessory from its long-term secrets.
pub trait KeyDerivation {
    /// Return `count` key pairs starting at schedule index `offset`.
    ///
    /// `master_private_key` is the accessory's long-term P-224 scalar, `shared_secret` the
    /// symmetric seed of one rotation cadence.
    fn derive_keys(
        &self,
        master_private_key: &[u8],
        shared_secret: &[u8],
        count: u64,
        offset: u64,
    ) -> Result<Vec<AdvertisementKeyPair>, DerivationError>;
}
