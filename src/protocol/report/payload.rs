use alloc::{string::ToString, vec::Vec};

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use chrono::{DateTime, Utc};

use crate::error::ReportError;

use super::CORE_DATA_EPOCH_OFFSET;

/// Wire-format generation of a report payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVersion {
    /// 89 bytes, carrying a reserved byte between the timestamp and the confidence.
    V1,
    /// Any other length: the reserved byte is omitted.
    V2,
}

/// A decoded payload rearranged into the V1 layout.
///
/// | bytes     | field                                      |
/// |-----------|--------------------------------------------|
/// | `0..4`    | seconds since 2001-01-01, big endian       |
/// | `4`       | reserved (zero for V2 payloads)            |
/// | `5`       | confidence                                 |
/// | `6..63`   | finder's ephemeral key, uncompressed SEC1  |
/// | `63..n-16`| encrypted location                         |
/// | `n-16..n` | AES-GCM tag                                |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPayload {
    version: PayloadVersion,
    bytes: Vec<u8>,
}

impl NormalizedPayload {
    /// Length of a V1 payload.
    pub const V1_LEN: usize = 89;
    /// Offset of the ephemeral key.
    pub const EPHEMERAL_KEY_START: usize = 6;
    /// Length of an uncompressed P-224 point.
    pub const EPHEMERAL_KEY_LEN: usize = 57;
    /// Length of the AES-GCM tag.
    pub const TAG_LEN: usize = 16;
    /// Shortest normalized payload that still holds a key and a tag.
    pub const MIN_LEN: usize = Self::EPHEMERAL_KEY_START + Self::EPHEMERAL_KEY_LEN + Self::TAG_LEN;

    /// Decode a base64 payload as it comes from the report server.
    pub fn from_base64(payload: &str) -> Result<Self, ReportError> {
        let raw = b64
            .decode(payload)
            .map_err(|e| ReportError::Payload(e.to_string()))?;

        Self::normalize(raw)
    }

    /// Bring a raw payload into the V1 layout.
    pub fn normalize(mut raw: Vec<u8>) -> Result<Self, ReportError> {
        let version = if raw.len() == Self::V1_LEN {
            PayloadVersion::V1
        } else {
            if raw.len() < 4 {
                return Err(ReportError::Payload(format!(
                    "payload of {} bytes has no timestamp",
                    raw.len()
                )));
            }
            raw.insert(4, 0x00);
            PayloadVersion::V2
        };

        tracing::trace!(
            ?version,
            payload_start = %hex::encode(&raw[..raw.len().min(10)]),
            "normalized payload"
        );

        if raw.len() < Self::MIN_LEN {
            return Err(ReportError::Payload(format!(
                "payload of {} bytes is shorter than {} bytes",
                raw.len(),
                Self::MIN_LEN
            )));
        }

        Ok(Self {
            version,
            bytes: raw,
        })
    }

    /// Which layout the payload arrived in.
    pub fn version(&self) -> PayloadVersion {
        self.version
    }

    /// The normalized bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Seconds since the 2001-01-01 reference epoch at which the finder saw the beacon.
    pub fn seconds(&self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    /// The absolute time at which the finder saw the beacon.
    pub fn timestamp(&self) -> Result<DateTime<Utc>, ReportError> {
        DateTime::from_timestamp(i64::from(self.seconds()) + CORE_DATA_EPOCH_OFFSET, 0)
            .ok_or_else(|| ReportError::Payload("timestamp out of range".to_string()))
    }

    /// The unencrypted confidence byte of the header.
    pub fn confidence(&self) -> u8 {
        self.bytes[5]
    }

    /// The finder's ephemeral public key as an uncompressed SEC1 point.
    pub fn ephemeral_key(&self) -> &[u8] {
        &self.bytes
            [Self::EPHEMERAL_KEY_START..Self::EPHEMERAL_KEY_START + Self::EPHEMERAL_KEY_LEN]
    }

    /// The encrypted location, without the tag.
    pub fn encrypted_location(&self) -> &[u8] {
        &self.bytes[Self::EPHEMERAL_KEY_START + Self::EPHEMERAL_KEY_LEN
            ..self.bytes.len() - Self::TAG_LEN]
    }

    /// The AES-GCM tag.
    pub fn tag(&self) -> [u8; 16] {
        let mut tag = [0u8; 16];
        tag.copy_from_slice(&self.bytes[self.bytes.len() - Self::TAG_LEN..]);

        tag
    }
}
