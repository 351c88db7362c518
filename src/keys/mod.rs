use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::fmt;

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use chrono::{DateTime, Utc};
use p224::SecretKey;

use crate::{
    accessory::{AirtagKeyDerivation, KeyDerivation},
    error::DerivationError,
    protocol::AdvertisementKey,
};

mod dynamic_key;
#[cfg(feature = "std")]
mod loader;
mod record;
mod static_key;

pub use dynamic_key::{BeaconRecord, DynamicKey};
#[cfg(feature = "std")]
pub use loader::{load_keys, load_keys_with};
#[cfg(feature = "std")]
pub use record::PlistRecordCodec;
pub use record::BeaconRecordCodec;
pub use static_key::StaticKey;

/// Which of a beacon's key schedules a sub-key belongs to.
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubKeyType {
    /// Rotates every 15 minutes.
    Primary,
    /// Rotates every 24 hours.
    Secondary,
}

/// How a [`MainKey`] was provisioned.
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// A single fixed key pair.
    Static,
    /// A rotating key schedule unwrapped from a beacon record.
    Dynamic,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        })
    }
}

/// Descriptive metadata of a beacon. Empty for static keys.
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[cfg_attr(feature = "std", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInfo {
    pub model: String,
    pub pairing_date: Option<DateTime<Utc>>,
    pub identifier: String,
    pub stable_identifier: String,
}

/// The key pair of one rotation window.
#[derive(Debug, Clone, PartialEq)]
pub struct SubKey {
    pub adv_key: AdvertisementKey,
    /// SHA-256 of [`Self::adv_key`]; the identifier reports are filed under.
    pub hashed_adv_key: [u8; 32],
    pub private_key: SecretKey,
    pub kind: SubKeyType,
    /// [`MainKey::id`] of the beacon this key was derived from.
    pub main_key_id: String,
}

impl SubKey {
    /// The base64 hash the report server knows this key by.
    pub fn id(&self) -> String {
        b64.encode(self.hashed_adv_key)
    }
}

/// The long-term identity of one physical beacon.
#[derive(Debug, Clone, PartialEq)]
pub enum MainKey {
    Static(StaticKey),
    Dynamic(DynamicKey),
}

impl MainKey {
    pub fn id(&self) -> String {
        match self {
            Self::Static(key) => key.id().into(),
            Self::Dynamic(key) => key.id(),
        }
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            Self::Static(_) => KeyKind::Static,
            Self::Dynamic(_) => KeyKind::Dynamic,
        }
    }

    pub fn key_info(&self) -> KeyInfo {
        match self {
            Self::Static(_) => KeyInfo::default(),
            Self::Dynamic(key) => key.key_info(),
        }
    }

    /// The sub-keys a beacon lost at `lost_at` may have broadcast up to `to`.
    ///
    /// Static keys ignore the time arguments. Dynamic keys anchor the window at
    /// `lost_at` and ignore `from`.
    pub fn sub_keys(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        lost_at: DateTime<Utc>,
    ) -> Result<Vec<SubKey>, DerivationError> {
        self.sub_keys_with(from, to, lost_at, &AirtagKeyDerivation)
    }

    /// Like [`Self::sub_keys`], with a different key derivation.
    pub fn sub_keys_with(
        &self,
        _from: DateTime<Utc>,
        to: DateTime<Utc>,
        lost_at: DateTime<Utc>,
        derivation: &impl KeyDerivation,
    ) -> Result<Vec<SubKey>, DerivationError> {
        match self {
            Self::Static(key) => Ok(vec![key.sub_key()]),
            Self::Dynamic(key) => key.sub_keys_with(to, lost_at, derivation),
        }
    }
}

impl From<StaticKey> for MainKey {
    fn from(value: StaticKey) -> Self {
        Self::Static(value)
    }
}

impl From<DynamicKey> for MainKey {
    fn from(value: DynamicKey) -> Self {
        Self::Dynamic(value)
    }
}

/// Loaded beacons indexed by [`MainKey::id`].
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: BTreeMap<String, MainKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, returning the key it replaced if one had the same id.
    pub fn insert(&mut self, key: MainKey) -> Option<MainKey> {
        self.keys.insert(key.id(), key)
    }

    pub fn get(&self, id: &str) -> Option<&MainKey> {
        self.keys.get(id)
    }

    /// Resolve the beacon a sub-key was derived from.
    pub fn owner(&self, sub_key: &SubKey) -> Option<&MainKey> {
        self.get(&sub_key.main_key_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MainKey> {
        self.keys.values()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<MainKey> for Keyring {
    fn from_iter<T: IntoIterator<Item = MainKey>>(iter: T) -> Self {
        let mut keyring = Self::new();
        for key in iter {
            keyring.insert(key);
        }

        keyring
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::DateTime;
    use const_decoder::{decode, Decoder};

    use super::BeaconRecord;

    /// A static key whose private key is the bytes 1 to 28.
    pub const STATIC_KEY_FILE: &str = "Private key: AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHA==
Advertisement key: Ynt8Czovt6R4rFZw6ZcxlKX9oLwHkbB1Bqc93Q==
Hashed adv key: /vOKuaTt4YQhx94Ge/rHR9KDiKnuhcZ7CrxlJFsRUzg=
";

    /// A beacon paired at 2024-01-01T00:00:00Z with all-zero primary and all-one
    /// secondary secrets.
    pub fn sample_record() -> BeaconRecord {
        BeaconRecord {
            private_key: decode!(
                Decoder::Base64,
                b"KioqKioqKioqKioqKioqKioqKioqKioqKioqKg=="
            )
            .to_vec(),
            public_key: decode!(
                Decoder::Base64,
                b"BAqk0Cz1v5af7b9XiUh8Jiaqlfq5RMkYVENPtSUl5iME+bmK6/Et/H2Sa9hz8/tBkg0sPcOwCgbG"
            )
            .to_vec(),
            shared_secret: vec![0x00; 32],
            secondary_shared_secret: vec![0x01; 32],
            pairing_date: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .into(),
            model: "AirTag1,1".into(),
            identifier: "5E9E2B2C-0000-4000-8000-000000000001".into(),
            stable_identifier: vec!["stable-1".into(), "stable-2".into()],
        }
    }
}
