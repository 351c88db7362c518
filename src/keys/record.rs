use crate::error::KeyFileError;

use super::BeaconRecord;

/// Unwraps the encrypted on-disk form of a [`BeaconRecord`].
pub trait BeaconRecordCodec {
    /// Decrypt and parse `data` with `key`.
    fn decode(&self, data: &[u8], key: &[u8]) -> Result<BeaconRecord, KeyFileError>;
}

#[cfg(feature = "std")]
pub use self::plist_codec::PlistRecordCodec;

#[cfg(all(test, feature = "std"))]
pub(crate) use self::plist_codec::seal_record;

#[cfg(feature = "std")]
mod plist_codec {
    use std::{
        io::Cursor,
        string::{String, ToString},
        time::SystemTime,
        vec::Vec,
    };

    use aes_gcm::{
        aead::{AeadMutInPlace, KeyInit},
        Aes256Gcm, Nonce, Tag,
    };
    use chrono::{DateTime, Utc};
    use plist::{Dictionary, Value};

    use super::{BeaconRecord, BeaconRecordCodec, KeyFileError};

    const NONCE_LEN: usize = 12;
    const TAG_LEN: usize = 16;

    /// Beacon records as stored by the owner's devices: a binary plist array of
    /// `[nonce, tag, ciphertext]` whose plaintext, under AES-256-GCM, is another
    /// plist holding the key material.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PlistRecordCodec;

    impl BeaconRecordCodec for PlistRecordCodec {
        fn decode(&self, data: &[u8], key: &[u8]) -> Result<BeaconRecord, KeyFileError> {
            let plaintext = decrypt(data, key)?;
            let value = Value::from_reader(Cursor::new(plaintext))
                .map_err(|e| KeyFileError::Record(format!("invalid plaintext plist: {e}")))?;
            let dict = value
                .as_dictionary()
                .ok_or_else(|| KeyFileError::Record("plaintext is not a dictionary".into()))?;

            Ok(BeaconRecord {
                private_key: key_data(dict, "privateKey")?,
                public_key: key_data(dict, "publicKey")?,
                shared_secret: key_data(dict, "sharedSecret")?,
                secondary_shared_secret: key_data(dict, "secondarySharedSecret")?,
                pairing_date: dict
                    .get("pairingDate")
                    .and_then(Value::as_date)
                    .map(|date| DateTime::<Utc>::from(SystemTime::from(date)))
                    .ok_or(KeyFileError::MissingField("pairingDate"))?,
                model: string(dict, "model"),
                identifier: string(dict, "identifier"),
                stable_identifier: match dict.get("stableIdentifier") {
                    Some(Value::Array(values)) => values
                        .iter()
                        .filter_map(Value::as_string)
                        .map(String::from)
                        .collect(),
                    Some(Value::String(value)) => vec![value.clone()],
                    _ => Vec::new(),
                },
            })
        }
    }

    fn decrypt(data: &[u8], key: &[u8]) -> Result<Vec<u8>, KeyFileError> {
        let container = Value::from_reader(Cursor::new(data))
            .map_err(|e| KeyFileError::Record(format!("invalid container plist: {e}")))?;
        let parts = container
            .as_array()
            .ok_or_else(|| KeyFileError::Record("container is not an array".into()))?;

        let [nonce, tag, ciphertext] = match parts.as_slice() {
            [nonce, tag, ciphertext, ..] => [nonce, tag, ciphertext].map(Value::as_data),
            _ => return Err(KeyFileError::Record("container has fewer than 3 items".into())),
        };
        let (Some(nonce), Some(tag), Some(ciphertext)) = (nonce, tag, ciphertext) else {
            return Err(KeyFileError::Record("container items are not data".into()));
        };

        if nonce.len() != NONCE_LEN {
            return Err(KeyFileError::InvalidLength {
                field: "nonce",
                expected: NONCE_LEN,
                actual: nonce.len(),
            });
        }
        if tag.len() != TAG_LEN {
            return Err(KeyFileError::InvalidLength {
                field: "tag",
                expected: TAG_LEN,
                actual: tag.len(),
            });
        }

        let mut cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KeyFileError::InvalidLength {
            field: "record key",
            expected: 32,
            actual: key.len(),
        })?;

        let mut plaintext = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                &[],
                &mut plaintext,
                Tag::from_slice(tag),
            )
            .map_err(|_| KeyFileError::Record("unable to decrypt record".to_string()))?;

        Ok(plaintext)
    }

    fn key_data(dict: &Dictionary, field: &'static str) -> Result<Vec<u8>, KeyFileError> {
        dict.get(field)
            .and_then(Value::as_dictionary)
            .and_then(|d| d.get("key"))
            .and_then(Value::as_dictionary)
            .and_then(|d| d.get("data"))
            .and_then(Value::as_data)
            .map(<[u8]>::to_vec)
            .ok_or(KeyFileError::MissingField(field))
    }

    fn string(dict: &Dictionary, field: &str) -> String {
        dict.get(field)
            .and_then(Value::as_string)
            .map(String::from)
            .unwrap_or_default()
    }

    /// Encrypt `record` the way [`PlistRecordCodec`] expects it.
    #[cfg(test)]
    pub(crate) fn seal_record(record: &BeaconRecord, key: &[u8; 32], nonce: [u8; NONCE_LEN]) -> Vec<u8> {
        fn key_entry(data: &[u8]) -> Value {
            let mut inner = Dictionary::new();
            inner.insert("data".into(), Value::Data(data.to_vec()));
            let mut outer = Dictionary::new();
            outer.insert("key".into(), Value::Dictionary(inner));
            Value::Dictionary(outer)
        }

        let mut dict = Dictionary::new();
        dict.insert("privateKey".into(), key_entry(&record.private_key));
        dict.insert("publicKey".into(), key_entry(&record.public_key));
        dict.insert("sharedSecret".into(), key_entry(&record.shared_secret));
        dict.insert(
            "secondarySharedSecret".into(),
            key_entry(&record.secondary_shared_secret),
        );
        dict.insert(
            "pairingDate".into(),
            Value::Date(SystemTime::from(record.pairing_date).into()),
        );
        dict.insert("model".into(), Value::String(record.model.clone()));
        dict.insert("identifier".into(), Value::String(record.identifier.clone()));
        dict.insert(
            "stableIdentifier".into(),
            Value::Array(
                record
                    .stable_identifier
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );

        let mut plaintext = Vec::new();
        Value::Dictionary(dict)
            .to_writer_binary(&mut plaintext)
            .unwrap();

        let mut cipher = Aes256Gcm::new_from_slice(key).unwrap();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), &[], &mut plaintext)
            .unwrap();

        let container = Value::Array(vec![
            Value::Data(nonce.to_vec()),
            Value::Data(tag.to_vec()),
            Value::Data(plaintext),
        ]);
        let mut output = Vec::new();
        container.to_writer_binary(&mut output).unwrap();

        output
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::keys::{fixtures::sample_record, DynamicKey};

        const RECORD_KEY: [u8; 32] = [0x5A; 32];

        #[test]
        fn test_decode_sealed_record() {
            let record = sample_record();
            let sealed = seal_record(&record, &RECORD_KEY, [7; 12]);

            let decoded = PlistRecordCodec.decode(&sealed, &RECORD_KEY).unwrap();

            assert_eq!(decoded, record);
            assert_eq!(DynamicKey::new(decoded).id(), "g4BWLXblyk8=");
        }

        #[test]
        fn test_wrong_key_is_rejected() {
            let sealed = seal_record(&sample_record(), &RECORD_KEY, [7; 12]);

            assert!(matches!(
                PlistRecordCodec.decode(&sealed, &[0x00; 32]),
                Err(KeyFileError::Record(_))
            ));
            assert!(matches!(
                PlistRecordCodec.decode(&sealed, &[0x5A; 16]),
                Err(KeyFileError::InvalidLength {
                    field: "record key",
                    ..
                })
            ));
        }

        #[test]
        fn test_garbage_is_rejected() {
            assert!(matches!(
                PlistRecordCodec.decode(b"definitely not a plist", &RECORD_KEY),
                Err(KeyFileError::Record(_))
            ));
        }

        #[test]
        fn test_missing_field_is_reported() {
            let mut plaintext = Vec::new();
            Value::Dictionary(Dictionary::new())
                .to_writer_binary(&mut plaintext)
                .unwrap();

            let nonce = [1u8; 12];
            let mut cipher = Aes256Gcm::new_from_slice(&RECORD_KEY).unwrap();
            let tag = cipher
                .encrypt_in_place_detached(Nonce::from_slice(&nonce), &[], &mut plaintext)
                .unwrap();
            let mut sealed = Vec::new();
            Value::Array(vec![
                Value::Data(nonce.to_vec()),
                Value::Data(tag.to_vec()),
                Value::Data(plaintext),
            ])
            .to_writer_binary(&mut sealed)
            .unwrap();

            assert!(matches!(
                PlistRecordCodec.decode(&sealed, &RECORD_KEY),
                Err(KeyFileError::MissingField("privateKey"))
            ));
        }
    }
}
