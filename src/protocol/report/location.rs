use crate::error::ReportError;

/// The location information included in offline finding reports.
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[derive(PartialEq, Debug, Clone)]
pub struct Location {
    /// Latitude geographical coordinate.
    pub latitude: Coordinate,
    /// Longitude geographical coordinate.
    pub longitude: Coordinate,
    /// Confidence in the coordinates, as reported by the finder.
    pub confidence: u8,
    /// Byte encoding the status of the accessory, as included in the BLE advertisement.
    pub status: u8,
}

/// A geographical coordinate in degrees.
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Coordinate(pub f64);

impl Coordinate {
    const SCALE: f64 = 10_000_000.0;

    /// Serialize the coordinate into the canonical 4-byte representation.
    fn to_bytes(self) -> [u8; 4] {
        let scaled = self.0 * Self::SCALE;
        // round half away from zero; `f64::round` needs std
        let int = (if scaled < 0.0 { scaled - 0.5 } else { scaled + 0.5 }) as i32;
        int.to_be_bytes()
    }

    /// Deserialize a coordinate from the canonical 4-byte representation.
    fn from_bytes(bytes: [u8; 4]) -> Self {
        let int = i32::from_be_bytes(bytes);
        Self(f64::from(int) / Self::SCALE)
    }
}

impl Location {
    /// Length of the canonical representation.
    pub const LEN: usize = 10;

    /// Serialize the location into the canonical 10-byte representation.
    pub fn to_bytes(&self) -> [u8; 10] {
        let mut output = [0; 10];

        output[0..4].copy_from_slice(&self.latitude.to_bytes());
        output[4..8].copy_from_slice(&self.longitude.to_bytes());
        output[8] = self.confidence;
        output[9] = self.status;

        output
    }

    /// Deserialize a location from decrypted report bytes. Bytes past the tenth are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReportError> {
        if bytes.len() < Self::LEN {
            return Err(ReportError::Payload(format!(
                "decrypted location of {} bytes is shorter than {} bytes",
                bytes.len(),
                Self::LEN
            )));
        }

        Ok(Self {
            latitude: Coordinate::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            longitude: Coordinate::from_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            confidence: bytes[8],
            status: bytes[9],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_roundtrip() {
        let coord = Coordinate(-122.4194);
        let bytes = coord.to_bytes();

        assert_eq!(coord, Coordinate::from_bytes(bytes));
    }

    #[test]
    fn test_signed_big_endian_decoding() {
        let mut bytes = [0u8; 10];
        bytes[0..4].copy_from_slice(&473_769_000i32.to_be_bytes());
        bytes[4..8].copy_from_slice(&(-1_224_194_000i32).to_be_bytes());
        bytes[8] = 42;
        bytes[9] = 0x25;

        let location = Location::from_bytes(&bytes).unwrap();

        assert_eq!(location.latitude, Coordinate(47.3769));
        assert_eq!(location.longitude, Coordinate(-122.4194));
        assert_eq!(location.confidence, 42);
        assert_eq!(location.status, 0x25);
        assert_eq!(location.to_bytes(), bytes);
    }

    #[test]
    fn test_short_location_is_rejected() {
        assert!(matches!(
            Location::from_bytes(&[0u8; 9]),
            Err(ReportError::Payload(_))
        ));
    }
}
