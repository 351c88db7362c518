use aes_gcm::{
    aead::{AeadMutInPlace, KeyInit},
    Key,
};
use p224::{
    elliptic_curve::{ecdh, sec1::ToEncodedPoint},
    SecretKey,
};
use sha2_pre::Sha256;

use crate::{
    error::ReportError,
    keys::SubKey,
    protocol::{Aes, EncryptedReportPayload, Location, NormalizedPayload, Report, TagData},
};

/// The device that owns an accessory and can read the reports filed against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerDevice();

impl OwnerDevice {
    /// Recover the location sealed in `encrypted_report` with the accessory key
    /// it was sealed to.
    pub fn decrypt_report(
        &self,
        accessory_private_key: &SecretKey,
        encrypted_report: &EncryptedReportPayload,
    ) -> Result<Location, ReportError> {
        let finder_public_key = &encrypted_report.finder_public_key;

        // fixed-width X coordinate
        let shared_secret = ecdh::diffie_hellman(
            accessory_private_key.to_nonzero_scalar(),
            finder_public_key.as_affine(),
        );

        let mut symmetric_key = [0u8; 32];
        let finder_public_key_point = finder_public_key.to_encoded_point(false);
        let entropy = finder_public_key_point.as_bytes();

        ansi_x963_kdf::derive_key_into::<Sha256>(
            shared_secret.raw_secret_bytes(),
            entropy,
            &mut symmetric_key,
        )
        .map_err(|_| ReportError::Crypto)?;

        let (encryption_key, iv) = symmetric_key.split_at(16);

        let key = Key::<Aes>::from_slice(encryption_key);
        let mut cipher = Aes::new(key);

        let mut decrypted_location = encrypted_report.encrypted_location.clone();
        cipher
            .decrypt_in_place_detached(
                iv.into(),
                &[],
                &mut decrypted_location,
                (&encrypted_report.tag).into(),
            )
            .map_err(|_| ReportError::Crypto)?;

        Location::from_bytes(&decrypted_location)
    }
}

/// Decode a fetched report with the sub-key whose hash it was filed under.
pub fn decode(report: &Report, sub_key: &SubKey) -> Result<TagData, ReportError> {
    let payload = NormalizedPayload::from_base64(&report.payload)?;
    let time = payload.timestamp()?;
    let encrypted_report = EncryptedReportPayload::parse(&payload)?;

    let location = OwnerDevice().decrypt_report(&sub_key.private_key, &encrypted_report)?;
    let tag_data = TagData::new(time, &location);

    tracing::trace!(report = %report.id, %tag_data, "decoded report");

    Ok(tag_data)
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use core::str::FromStr;

    use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
    use chrono::DateTime;
    use const_decoder::{decode, Decoder};

    use crate::{
        finder::FinderDevice,
        keys::{fixtures::STATIC_KEY_FILE, StaticKey},
        protocol::{AdvertisementKey, Coordinate, ReportData},
    };

    use super::*;

    // Synthetic vectors sealed to the static fixture key at 2024-05-01T12:00:00Z;
    // no captured report is available.
    const V1_PAYLOAD: &str = "K+JmQAADBAVJxNgJG0+p/XvYLxCZR6ev1KT1vG9vcGbHqYnhOwFhJNkBy0ahY//LPDsAToISe8RwWQ0E/Y85odv0J2ml+YYwEdecLFJ2NLxLEpiPI7I/9gg=";
    const V2_PAYLOAD: &str = "K+JmQAMEBUnE2AkbT6n9e9gvEJlHp6/UpPW8b29wZsepieE7AWEk2QHLRqFj/8s8OwBOghJ7xHBZDQT9jzmh2/QnaaX5hjAR15wsUnY0vEsSmI8jsj/2CA==";
    /// Sealed from an 8-byte plaintext.
    const SHORT_PAYLOAD: &str = "K+JmQAMEBUnE2AkbT6n9e9gvEJlHp6/UpPW8b29wZsepieE7AWEk2QHLRqFj/8s8OwBOghJ7xHBZDQT9jzmh2/QnaaX5ht1gUOKGP9miBFLPimSDobs=";

    /// Sealed with ephemeral scalar 162, whose shared X coordinate with the
    /// static fixture key starts with a zero byte.
    const LEADING_ZERO_SHARED_X: [u8; 89] = decode!(
        Decoder::Base64,
        b"K+JmQAADBJ0fsgOVi9m9ymejWAqZW4cLnvwqnptvx9gyTTkn8rr11AVGWnWlqnssT+2AtlAhs3jSz6G3ALgeh0/kHZAKCuZVCd2Ey0RLh1H1atBITvCWdPA="
    );

    fn static_sub_key() -> SubKey {
        StaticKey::from_str(STATIC_KEY_FILE).unwrap().sub_key()
    }

    fn report(payload: &str) -> Report {
        Report {
            id: static_sub_key().id(),
            date_published: 1_714_564_860_000,
            payload: String::from(payload),
            description: String::from("found"),
            status_code: 0,
        }
    }

    fn expected() -> TagData {
        TagData {
            time: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .into(),
            lat: 47.3769,
            lng: -122.4194,
            confidence: 42,
            status: 0x25,
        }
    }

    #[test]
    fn test_decode_known_v1_report() {
        assert_eq!(
            decode(&report(V1_PAYLOAD), &static_sub_key()).unwrap(),
            expected()
        );
    }

    #[test]
    fn test_decode_known_v2_report() {
        assert_eq!(
            decode(&report(V2_PAYLOAD), &static_sub_key()).unwrap(),
            expected()
        );
    }

    #[test]
    fn test_decode_is_deterministic() {
        let sub_key = static_sub_key();
        let report = report(V1_PAYLOAD);

        assert_eq!(
            decode(&report, &sub_key).unwrap(),
            decode(&report, &sub_key).unwrap()
        );
    }

    #[test]
    fn test_short_plaintext_is_a_payload_error() {
        assert!(matches!(
            decode(&report(SHORT_PAYLOAD), &static_sub_key()),
            Err(ReportError::Payload(_))
        ));
    }

    #[test]
    fn test_shared_secret_keeps_leading_zero_byte() {
        let sub_key = static_sub_key();
        let shared_secret = ecdh::diffie_hellman(
            sub_key.private_key.to_nonzero_scalar(),
            EncryptedReportPayload::parse(
                &NormalizedPayload::normalize(LEADING_ZERO_SHARED_X.to_vec()).unwrap(),
            )
            .unwrap()
            .finder_public_key
            .as_affine(),
        );
        assert_eq!(shared_secret.raw_secret_bytes()[0], 0);

        let tag_data = decode(&report(&b64.encode(LEADING_ZERO_SHARED_X)), &sub_key).unwrap();

        assert_eq!(tag_data, expected());
    }

    #[test]
    fn test_point_off_curve_is_a_curve_error() {
        let mut payload = b64.decode(V1_PAYLOAD).unwrap();
        payload[62] ^= 0x01;

        assert_eq!(
            decode(&report(&b64.encode(payload)), &static_sub_key()),
            Err(ReportError::Curve)
        );
    }

    #[test]
    fn test_wrong_key_is_a_crypto_error() {
        let mut sub_key = static_sub_key();
        sub_key.private_key = SecretKey::random(&mut rand::rngs::OsRng);

        assert_eq!(
            decode(&report(V1_PAYLOAD), &sub_key),
            Err(ReportError::Crypto)
        );
    }

    #[test]
    fn test_malformed_payloads() {
        for payload in ["@@@@", "AAAA", "AAECAwQFBgcICQ=="] {
            assert!(matches!(
                decode(&report(payload), &static_sub_key()),
                Err(ReportError::Payload(_))
            ));
        }
    }

    #[test]
    fn test_decrypt_encrypted_report() {
        let location = Location {
            latitude: Coordinate(37.0),
            longitude: Coordinate(73.0),
            confidence: 5,
            status: 0,
        };

        let accessory_secret_key = SecretKey::random(&mut rand::rngs::OsRng);
        let accessory_public_key = AdvertisementKey::from(&accessory_secret_key);

        let encrypted_report = FinderDevice()
            .encrypt_report(
                &mut rand::rngs::OsRng,
                &accessory_public_key,
                &ReportData {
                    timestamp: DateTime::from_timestamp(1_000_000_000, 0).unwrap(),
                    confidence: 1,
                    location: location.clone(),
                },
            )
            .unwrap();

        let decrypted = OwnerDevice()
            .decrypt_report(&accessory_secret_key, &encrypted_report)
            .unwrap();

        assert_eq!(decrypted, location);
    }

    #[test]
    fn test_core_types_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<OwnerDevice>();
        assert_send_sync::<SubKey>();
        assert_send_sync::<Report>();
        assert_send_sync::<TagData>();
    }
}
