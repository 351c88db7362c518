use alloc::vec::Vec;

use num_bigint::BigUint;
use p224::{
    elliptic_curve::{bigint::Encoding, Curve},
    NistP224, SecretKey,
};
use sha2_pre::Sha256;

use crate::{accessory::AdvertisementKeyPair, error::DerivationError, protocol::AdvertisementKey};

use super::KeyDerivation;

pub type SymmetricKey = [u8; 32];

const SCALAR_LEN: usize = 28;

/// The key schedule of a single rotation cadence, positioned at some index.
///
/// Index 0 is the master key itself; every call to [`KeySchedule::rotate`] moves one
/// index forward.
pub struct KeySchedule {
    master_private_key: BigUint,
    index: u64,
    current_private_key: SecretKey,
    current_symmetric_key: SymmetricKey,
}

impl KeySchedule {
    /// Start a schedule at index 0.
    ///
    /// `master_private_key` may be longer than a P-224 scalar, in which case only its
    /// last 28 bytes are used.
    pub fn new(master_private_key: &[u8], shared_secret: &[u8]) -> Result<Self, DerivationError> {
        let current_symmetric_key: SymmetricKey =
            shared_secret
                .try_into()
                .map_err(|_| DerivationError::InvalidSecretLength {
                    expected: 32,
                    actual: shared_secret.len(),
                })?;

        let master_private_key =
            &master_private_key[master_private_key.len().saturating_sub(SCALAR_LEN)..];
        let current_private_key =
            SecretKey::from_slice(master_private_key).map_err(|_| DerivationError::InvalidMasterKey)?;

        Ok(Self {
            master_private_key: BigUint::from_bytes_be(master_private_key),
            index: 0,
            current_private_key,
            current_symmetric_key,
        })
    }

    /// Position of the schedule.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Advance by one rotation.
    pub fn rotate(&mut self) -> Result<(), DerivationError> {
        let index = self.index + 1;

        // equation 1
        let mut new_symmetric_key = [0u8; 32];
        ansi_x963_kdf::derive_key_into::<Sha256>(
            &self.current_symmetric_key,
            b"update",
            &mut new_symmetric_key,
        )
        .map_err(|_| DerivationError::Kdf)?;

        // equation 2
        let mut uv = [0u8; 72];
        ansi_x963_kdf::derive_key_into::<Sha256>(&new_symmetric_key, b"diversify", &mut uv)
            .map_err(|_| DerivationError::Kdf)?;

        let (u, v) = uv.split_at(36);

        // https://github.com/positive-security/find-you/blob/ab7a3a9/OpenHaystack/OpenHaystack/BoringSSL/BoringSSL.m#L194
        let order = &BigUint::from_bytes_be(&NistP224::ORDER.to_be_bytes());
        let order_minus_one = &(order - BigUint::from(1u8));
        let u_i = (BigUint::from_bytes_be(u) % order_minus_one) + BigUint::from(1u8);
        let v_i = (BigUint::from_bytes_be(v) % order_minus_one) + BigUint::from(1u8);

        // equation 3
        let d_i = (&self.master_private_key * u_i) + v_i;
        let d_i = (d_i % order).to_bytes_be();

        let mut scalar = [0u8; SCALAR_LEN];
        scalar[SCALAR_LEN - d_i.len()..].copy_from_slice(&d_i);
        let new_private_key =
            SecretKey::from_slice(&scalar).map_err(|_| DerivationError::InvalidDerivedKey { index })?;

        self.index = index;
        self.current_private_key = new_private_key;
        self.current_symmetric_key = new_symmetric_key;

        Ok(())
    }

    /// Rotate forward until the schedule sits at `index`.
    ///
    /// Seeking backwards is a no-op.
    pub fn seek(&mut self, index: u64) -> Result<(), DerivationError> {
        while self.index < index {
            self.rotate()?;
        }

        Ok(())
    }

    /// The key pair at the current index.
    pub fn current(&self) -> AdvertisementKeyPair {
        AdvertisementKeyPair {
            index: self.index,
            private_key: self.current_private_key.clone(),
            public_key: AdvertisementKey::from(&self.current_private_key),
        }
    }
}

impl Iterator for KeySchedule {
    type Item = Result<AdvertisementKeyPair, DerivationError>;

    /// Rotate, then yield the new key pair. The master key at index 0 is never yielded.
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.rotate().map(|()| self.current()))
    }
}

/// The key derivation used by AirTags and by accessories that imitate them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirtagKeyDerivation;

impl KeyDerivation for AirtagKeyDerivation {
    fn derive_keys(
        &self,
        master_private_key: &[u8],
        shared_secret: &[u8],
        count: u64,
        offset: u64,
    ) -> Result<Vec<AdvertisementKeyPair>, DerivationError> {
        let mut schedule = KeySchedule::new(master_private_key, shared_secret)?;
        schedule.seek(offset)?;

        let mut keys = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
        for i in 0..count {
            if i > 0 {
                schedule.rotate()?;
            }
            keys.push(schedule.current());
        }

        tracing::trace!(offset, count, "derived advertisement keys");

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
    use const_decoder::{decode, Decoder};
    use p224::elliptic_curve::sec1::ToEncodedPoint;

    use super::*;

    const MASTER_KEY: [u8; 28] = decode!(
        Decoder::Base64,
        b"KioqKioqKioqKioqKioqKioqKioqKioqKioqKg=="
    );
    const ZERO_SECRET: [u8; 32] = [0u8; 32];

    // expected values from https://github.com/malmeloo/FindMy.py
    const FIRST_KEYS: [[u8; 28]; 4] = [
        decode!(Decoder::Base64, b"77HRu4h48OgZIPO+eV9FOE8nPRZqpXT/FGbBAA=="),
        decode!(Decoder::Base64, b"uoIdNzCdygG33VdHW9Sq6bnXqpuiT71qBZHuGA=="),
        decode!(Decoder::Base64, b"qfsoe/hOu0Kbtkpbfs4dSnPmuGFZfHno1nNnRw=="),
        decode!(Decoder::Base64, b"mR9Q7KjvRPUt56j6vZFwgtOHV1+tT6hOcBbjEA=="),
    ];

    fn random_secrets() -> (SecretKey, SymmetricKey) {
        use rand::RngCore;

        let master = SecretKey::random(&mut rand::rngs::OsRng);
        let mut symmetric = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut symmetric);

        (master, symmetric)
    }

    #[test]
    fn test_ephemeral_keys_not_same_as_master_ones() {
        let (master, symmetric) = random_secrets();
        let mut schedule = KeySchedule::new(&master.to_bytes(), &symmetric).unwrap();
        schedule.rotate().unwrap();

        assert_ne!(schedule.current().private_key, master);
        assert_ne!(schedule.current_symmetric_key, symmetric);
    }

    #[test]
    fn test_public_key_matches_current_private_key() {
        let (master, symmetric) = random_secrets();
        let mut schedule = KeySchedule::new(&master.to_bytes(), &symmetric).unwrap();
        schedule.rotate().unwrap();
        let pair = schedule.current();

        let point = pair.private_key.public_key().to_encoded_point(true);
        let without_sign_byte = &point.as_bytes()[1..];

        assert_eq!(without_sign_byte, pair.public_key.0.as_slice());
    }

    #[test]
    fn test_key_rotation_matches_that_of_apple_airtags() {
        let mut schedule = KeySchedule::new(&MASTER_KEY, &ZERO_SECRET).unwrap();

        for expected in FIRST_KEYS {
            schedule.rotate().unwrap();
            assert_eq!(schedule.current().public_key.0, expected);
        }
        assert_eq!(schedule.index(), 4);
    }

    #[test]
    fn test_iterator_doesnt_include_master_key() {
        let (master, symmetric) = random_secrets();
        let mut schedule = KeySchedule::new(&master.to_bytes(), &symmetric).unwrap();

        let first = schedule.next().unwrap().unwrap();
        assert_eq!(first.index, 1);
        assert_ne!(first.private_key, master);
    }

    #[test]
    fn test_derive_keys_uses_offset_as_start_index() {
        let keys = AirtagKeyDerivation
            .derive_keys(&MASTER_KEY, &ZERO_SECRET, 3, 2)
            .unwrap();

        assert_eq!(
            keys.iter().map(|k| k.index).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert_eq!(keys[0].public_key.0, FIRST_KEYS[1]);
        assert_eq!(keys[2].public_key.0, FIRST_KEYS[3]);
    }

    #[test]
    fn test_derive_keys_is_deterministic() {
        let first = AirtagKeyDerivation
            .derive_keys(&MASTER_KEY, &ZERO_SECRET, 5, 1)
            .unwrap();
        let second = AirtagKeyDerivation
            .derive_keys(&MASTER_KEY, &ZERO_SECRET, 5, 1)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_long_master_key_uses_trailing_scalar() {
        let mut long_key = vec![0xEE; 57 - 28];
        long_key.extend_from_slice(&MASTER_KEY);

        let keys = AirtagKeyDerivation
            .derive_keys(&long_key, &ZERO_SECRET, 1, 1)
            .unwrap();

        assert_eq!(b64.encode(keys[0].public_key.0), b64.encode(FIRST_KEYS[0]));
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        assert_eq!(
            AirtagKeyDerivation
                .derive_keys(&MASTER_KEY, &[0u8; 16], 1, 0)
                .unwrap_err(),
            DerivationError::InvalidSecretLength {
                expected: 32,
                actual: 16
            }
        );
        assert_eq!(
            AirtagKeyDerivation
                .derive_keys(&[0u8; 28], &ZERO_SECRET, 1, 0)
                .unwrap_err(),
            DerivationError::InvalidMasterKey
        );
    }

    #[test]
    fn test_zero_count_yields_nothing() {
        let keys = AirtagKeyDerivation
            .derive_keys(&MASTER_KEY, &ZERO_SECRET, 0, 7)
            .unwrap();

        assert!(keys.is_empty());
    }
}
