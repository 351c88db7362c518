mod data;
mod encrypted;
mod location;
mod payload;

use alloc::string::String;
use chrono::{DateTime, Utc};

pub use data::{ReportData, TagData};
pub use encrypted::EncryptedReportPayload;
pub use location::{Coordinate, Location};
pub use payload::{NormalizedPayload, PayloadVersion};

/// Seconds between the Unix epoch and the 2001-01-01 reference epoch that report
/// timestamps count from.
pub const CORE_DATA_EPOCH_OFFSET: i64 = 978_307_200;

/// A report as returned by the report server. The payload is still base64 and encrypted.
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Base64 SHA-256 hash of the advertisement key the report was filed against.
    pub id: String,
    /// When the server received the report, in milliseconds since the Unix epoch.
    pub date_published: i64,
    /// Base64-encoded encrypted payload.
    pub payload: String,
    /// Free-text description supplied by the server.
    #[cfg_attr(feature = "std", serde(default))]
    pub description: String,
    /// Server-defined status code.
    #[cfg_attr(feature = "std", serde(default))]
    pub status_code: i64,
}

impl Report {
    /// [`Self::date_published`] as a date, if it is representable.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.date_published)
    }
}
