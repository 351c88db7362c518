use alloc::{string::String, vec::Vec};

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use chrono::{DateTime, Utc};
use sha2_pre::{Digest, Sha256};

use crate::{
    accessory::{rotation_window, AdvertisementKeyPair, Cadence, KeyDerivation},
    error::DerivationError,
};

use super::{KeyInfo, SubKey, SubKeyType};

/// Schedule index of the first key a beacon broadcasts after pairing, relative to
/// the rotation count.
const SCHEDULE_BIAS: u64 = 2;

/// The decrypted contents of a beacon record.
#[derive(Clone, PartialEq, Eq)]
pub struct BeaconRecord {
    /// The master private key. May carry the public point in front of the scalar.
    pub private_key: Vec<u8>,
    pub public_key: Vec<u8>,
    /// Seed of the primary (15 minute) key schedule.
    pub shared_secret: Vec<u8>,
    /// Seed of the secondary (24 hour) key schedule.
    pub secondary_shared_secret: Vec<u8>,
    pub pairing_date: DateTime<Utc>,
    pub model: String,
    pub identifier: String,
    pub stable_identifier: Vec<String>,
}

impl core::fmt::Debug for BeaconRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BeaconRecord")
            .field("public_key", &hex::encode(&self.public_key))
            .field("pairing_date", &self.pairing_date)
            .field("model", &self.model)
            .field("identifier", &self.identifier)
            .field("stable_identifier", &self.stable_identifier)
            .finish_non_exhaustive()
    }
}

/// A beacon with rotating keys, e.g. an AirTag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicKey {
    record: BeaconRecord,
}

impl DynamicKey {
    pub fn new(record: BeaconRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &BeaconRecord {
        &self.record
    }

    /// Base64 of the first 8 bytes of the SHA-256 of the beacon's public key.
    pub fn id(&self) -> String {
        let digest = Sha256::digest(&self.record.public_key);

        b64.encode(&digest[..8])
    }

    pub fn key_info(&self) -> KeyInfo {
        KeyInfo {
            model: self.record.model.clone(),
            pairing_date: Some(self.record.pairing_date),
            identifier: self.record.identifier.clone(),
            stable_identifier: self
                .record
                .stable_identifier
                .first()
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Derive the primary and secondary keys broadcast between `lost_at` and `to`.
    ///
    /// Either schedule failing fails the whole call.
    pub fn sub_keys_with(
        &self,
        to: DateTime<Utc>,
        lost_at: DateTime<Utc>,
        derivation: &impl KeyDerivation,
    ) -> Result<Vec<SubKey>, DerivationError> {
        let pairing_date = self.record.pairing_date;
        let primary = rotation_window(lost_at, to, pairing_date, Cadence::PRIMARY);
        let secondary = rotation_window(lost_at, to, pairing_date, Cadence::SECONDARY);

        tracing::debug!(
            key = %self.id(),
            primary_count = primary.count,
            primary_offset = primary.offset,
            secondary_count = secondary.count,
            secondary_offset = secondary.offset,
            "computed rotation windows"
        );

        let primary_keys = derivation.derive_keys(
            &self.record.private_key,
            &self.record.shared_secret,
            primary.count,
            primary.offset.saturating_add(SCHEDULE_BIAS),
        )?;
        let secondary_keys = derivation.derive_keys(
            &self.record.private_key,
            &self.record.secondary_shared_secret,
            secondary.count,
            secondary.offset.saturating_add(SCHEDULE_BIAS),
        )?;

        let id = self.id();
        let sub_keys = primary_keys
            .into_iter()
            .map(|pair| (pair, SubKeyType::Primary))
            .chain(
                secondary_keys
                    .into_iter()
                    .map(|pair| (pair, SubKeyType::Secondary)),
            )
            .map(|(pair, kind)| {
                let index = pair.index;
                let sub_key = to_sub_key(pair, kind, &id);
                tracing::debug!(?kind, index, hash = %sub_key.id(), "adding sub-key");
                sub_key
            })
            .collect();

        Ok(sub_keys)
    }
}

fn to_sub_key(pair: AdvertisementKeyPair, kind: SubKeyType, main_key_id: &str) -> SubKey {
    SubKey {
        hashed_adv_key: pair.public_key.hash(),
        adv_key: pair.public_key,
        private_key: pair.private_key,
        kind,
        main_key_id: main_key_id.into(),
    }
}
