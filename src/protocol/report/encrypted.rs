use core::fmt::Debug;

use alloc::vec::Vec;

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use chrono::{DateTime, Utc};
use p224::{elliptic_curve::sec1::ToEncodedPoint, PublicKey};

use crate::{error::ReportError, protocol::AdvertisementKey};

use super::{NormalizedPayload, CORE_DATA_EPOCH_OFFSET};

pub struct EncryptedReportPayload {
    /// Seconds since the 2001-01-01 reference epoch.
    pub seconds: u32,
    pub confidence: u8,
    /// Finder device's ephemeral public key from the keypair that was used during the location encryption process.
    pub finder_public_key: PublicKey,
    pub encrypted_location: Vec<u8>,
    pub tag: [u8; 16],
}

impl EncryptedReportPayload {
    /// The absolute time encoded in [`Self::seconds`].
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.seconds) + CORE_DATA_EPOCH_OFFSET, 0)
    }

    /// Serialize into the 89-byte layout that carries the reserved byte.
    pub fn serialize(&self) -> Vec<u8> {
        let point = self.finder_public_key.to_encoded_point(false);

        let mut output = Vec::with_capacity(NormalizedPayload::V1_LEN);
        output.extend_from_slice(&self.seconds.to_be_bytes());
        output.push(0x00);
        output.push(self.confidence);
        output.extend_from_slice(point.as_bytes());
        output.extend_from_slice(&self.encrypted_location);
        output.extend_from_slice(&self.tag);

        output
    }

    /// Serialize into the 88-byte layout without the reserved byte.
    pub fn serialize_compact(&self) -> Vec<u8> {
        let mut output = self.serialize();
        output.remove(4);

        output
    }

    /// Split a normalized payload into its fields, validating the ephemeral key.
    pub fn parse(data: &NormalizedPayload) -> Result<Self, ReportError> {
        let finder_public_key =
            PublicKey::from_sec1_bytes(data.ephemeral_key()).map_err(|_| ReportError::Curve)?;

        Ok(Self {
            seconds: data.seconds(),
            confidence: data.confidence(),
            finder_public_key,
            encrypted_location: data.encrypted_location().to_vec(),
            tag: data.tag(),
        })
    }
}

impl Debug for EncryptedReportPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EncryptedReportPayload")
            .field("seconds", &self.seconds)
            .field("confidence", &self.confidence)
            .field(
                "finder_public_key",
                &b64.encode(AdvertisementKey::from(&self.finder_public_key).0),
            )
            .field(
                "encrypted_location",
                &hex::encode_upper(&self.encrypted_location),
            )
            .field("tag", &hex::encode_upper(self.tag))
            .finish()
    }
}
