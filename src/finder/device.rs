use alloc::vec::Vec;

use aes_gcm::{
    aead::{AeadMutInPlace, KeyInit},
    Key,
};
use chrono::{DateTime, Utc};
use p224::elliptic_curve::{ecdh, sec1::ToEncodedPoint};
use rand_core::CryptoRngCore;
use sha2_pre::Sha256;

use crate::{
    error::ReportError,
    protocol::{
        AdvertisementKey, Aes, EncryptedReportPayload, ReportData, CORE_DATA_EPOCH_OFFSET,
    },
};

/// A device that picks up an accessory's advertisement and files a report for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinderDevice();

impl FinderDevice {
    /// Seal the location of `report` to `accessory_public_key`.
    pub fn encrypt_report(
        &self,
        csprng: &mut impl CryptoRngCore,
        accessory_public_key: &AdvertisementKey,
        report: &ReportData,
    ) -> Result<EncryptedReportPayload, ReportError> {
        let seconds = seconds_since_reference(report.timestamp)?;

        let mut sealed = self.seal(csprng, accessory_public_key, &report.location.to_bytes())?;
        sealed.seconds = seconds;
        sealed.confidence = report.confidence;

        Ok(sealed)
    }

    /// Seal arbitrary plaintext. Timestamp and confidence are left zero.
    pub fn seal(
        &self,
        csprng: &mut impl CryptoRngCore,
        accessory_public_key: &AdvertisementKey,
        plaintext: &[u8],
    ) -> Result<EncryptedReportPayload, ReportError> {
        // (1) Generate a new ephemeral key
        let finder_secret = ecdh::EphemeralSecret::random(csprng);
        let finder_public_key = finder_secret.public_key();

        // (2) Perform ECDH using the ephemeral private key and the advertised public key
        let advertised_public_key = accessory_public_key
            .to_public_key()
            .ok_or(ReportError::Curve)?;
        let shared_secret = finder_secret.diffie_hellman(&advertised_public_key);

        // (3) Derive a symmetric key with ANSI X.963 KDF on the shared secret
        let mut symmetric_key = [0u8; 32];
        let finder_public_key_point = finder_public_key.to_encoded_point(false);
        let entropy = finder_public_key_point.as_bytes();

        ansi_x963_kdf::derive_key_into::<Sha256>(
            shared_secret.raw_secret_bytes().as_slice(),
            entropy,
            &mut symmetric_key,
        )
        .map_err(|_| ReportError::Crypto)?;

        // (4) Use the first 16 bytes as the encryption key e′.
        // (5) Use the last 16 bytes as an initialization vector (IV).
        let (encryption_key, iv) = symmetric_key.split_at(16);

        // (6) Encrypt the location report under e′ and the IV with AES-GCM.
        let key = Key::<Aes>::from_slice(encryption_key);
        let mut cipher = Aes::new(key);

        let mut encrypted_location = Vec::from(plaintext);
        let tag = cipher
            .encrypt_in_place_detached(iv.into(), &[], &mut encrypted_location)
            .map_err(|_| ReportError::Crypto)?;

        Ok(EncryptedReportPayload {
            seconds: 0,
            confidence: 0,
            finder_public_key,
            encrypted_location,
            tag: tag.into(),
        })
    }
}

fn seconds_since_reference(timestamp: DateTime<Utc>) -> Result<u32, ReportError> {
    u32::try_from(timestamp.timestamp() - CORE_DATA_EPOCH_OFFSET).map_err(|_| {
        ReportError::Payload(format!(
            "{timestamp} cannot be represented in a report timestamp"
        ))
    })
}
