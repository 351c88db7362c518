use alloc::{string::String, vec::Vec};
use core::str::FromStr;

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use p224::SecretKey;

use crate::{error::KeyFileError, protocol::AdvertisementKey};

use super::{SubKey, SubKeyType};

const PRIVATE_KEY: &str = "Private key";
const ADVERTISEMENT_KEY: &str = "Advertisement key";
const HASHED_ADV_KEY: &str = "Hashed adv key";

/// Length of the id taken from the start of the hashed advertisement key.
const ID_LEN: usize = 7;

/// A beacon that broadcasts one fixed key, e.g. an OpenHaystack tag.
///
/// Parsed from the text format
///
/// ```text
/// Private key: <base64>
/// Advertisement key: <base64>
/// Hashed adv key: <base64>
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StaticKey {
    private_key: SecretKey,
    adv_key: AdvertisementKey,
    hashed_adv_key: [u8; 32],
    id: String,
}

impl StaticKey {
    /// The first seven characters of the base64 hashed advertisement key.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn advertisement_key(&self) -> &AdvertisementKey {
        &self.adv_key
    }

    /// The only sub-key of a static key. Its type carries no meaning.
    pub fn sub_key(&self) -> SubKey {
        SubKey {
            adv_key: self.adv_key,
            hashed_adv_key: self.hashed_adv_key,
            private_key: self.private_key.clone(),
            kind: SubKeyType::Secondary,
            main_key_id: self.id.clone(),
        }
    }
}

impl FromStr for StaticKey {
    type Err = KeyFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut private_key = None;
        let mut adv_key = None;
        let mut hashed_adv_key = None;

        for line in s.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match name.trim() {
                PRIVATE_KEY => private_key = Some(value),
                ADVERTISEMENT_KEY => adv_key = Some(value),
                HASHED_ADV_KEY => hashed_adv_key = Some(value),
                _ => {}
            }
        }

        let private_key = private_key.ok_or(KeyFileError::MissingField(PRIVATE_KEY))?;
        let adv_key = adv_key.ok_or(KeyFileError::MissingField(ADVERTISEMENT_KEY))?;
        let hashed_adv_key_b64 =
            hashed_adv_key.ok_or(KeyFileError::MissingField(HASHED_ADV_KEY))?;

        let private_key = SecretKey::from_slice(&decode_field(PRIVATE_KEY, private_key)?)
            .map_err(|_| KeyFileError::InvalidPrivateKey)?;
        let adv_key_bytes = decode_field(ADVERTISEMENT_KEY, adv_key)?;
        let adv_key = AdvertisementKey::try_from(adv_key_bytes.as_slice()).map_err(|_| {
            KeyFileError::InvalidLength {
                field: ADVERTISEMENT_KEY,
                expected: 28,
                actual: adv_key_bytes.len(),
            }
        })?;
        let hashed_adv_key: [u8; 32] = decode_exact(HASHED_ADV_KEY, hashed_adv_key_b64)?;

        if adv_key.hash() != hashed_adv_key {
            tracing::warn!(
                hashed_adv_key = hashed_adv_key_b64,
                "hashed advertisement key does not match the advertisement key"
            );
        }

        Ok(Self {
            private_key,
            adv_key,
            hashed_adv_key,
            id: hashed_adv_key_b64.chars().take(ID_LEN).collect(),
        })
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, KeyFileError> {
    b64.decode(value)
        .map_err(|error| KeyFileError::Base64 { field, error })
}

fn decode_exact<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], KeyFileError> {
    let bytes = decode_field(field, value)?;

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyFileError::InvalidLength {
            field,
            expected: N,
            actual: bytes.len(),
        })
}
