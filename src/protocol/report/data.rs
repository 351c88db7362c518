use core::fmt;

use chrono::{DateTime, Utc};

use super::{Coordinate, Location};

/// What a finder knows when it files a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportData {
    pub timestamp: DateTime<Utc>,
    /// Unencrypted confidence byte of the payload header.
    pub confidence: u8,
    pub location: Location,
}

/// A decrypted report: where the beacon was seen, and when.
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TagData {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    pub confidence: u8,
    pub status: u8,
}

impl TagData {
    pub fn new(time: DateTime<Utc>, location: &Location) -> Self {
        Self {
            time,
            lat: location.latitude.0,
            lng: location.longitude.0,
            confidence: location.confidence,
            status: location.status,
        }
    }

    /// The coordinates and flags without the timestamp.
    pub fn location(&self) -> Location {
        Location {
            latitude: Coordinate(self.lat),
            longitude: Coordinate(self.lng),
            confidence: self.confidence,
            status: self.status,
        }
    }
}

impl fmt::Display for TagData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://maps.google.com/?q={:.6},{:.6}\tconf={},status={}",
            self.lat, self.lng, self.confidence, self.status
        )
    }
}
