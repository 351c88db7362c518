use p224::{
    elliptic_curve::sec1::{Tag, ToEncodedPoint},
    PublicKey, SecretKey,
};
use sha2_pre::{Digest, Sha256};

/// The key a beacon broadcasts: the 28-byte X coordinate of a P-224 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdvertisementKey(pub [u8; 28]);

impl AdvertisementKey {
    /// SHA-256 of the key bytes, which is how the report servers index reports.
    pub fn hash(&self) -> [u8; 32] {
        let digest = Sha256::digest(self.0);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);

        hash
    }

    /// Reconstruct a P-224 public key from the X coordinate.
    ///
    /// The sign of Y is not broadcast; either choice yields the same ECDH X coordinate.
    pub fn to_public_key(&self) -> Option<PublicKey> {
        let mut data = [0u8; 29];
        data[0] = Tag::CompressedEvenY.into();
        data[1..29].copy_from_slice(&self.0);

        PublicKey::from_sec1_bytes(&data).ok()
    }
}

impl From<&PublicKey> for AdvertisementKey {
    fn from(value: &PublicKey) -> Self {
        let point = value.to_encoded_point(false);
        let mut key = [0u8; 28];
        // uncompressed SEC1: 0x04 || X || Y
        key.copy_from_slice(&point.as_bytes()[1..29]);

        Self(key)
    }
}

impl From<&SecretKey> for AdvertisementKey {
    fn from(value: &SecretKey) -> Self {
        Self::from(&value.public_key())
    }
}

impl From<AdvertisementKey> for [u8; 28] {
    fn from(value: AdvertisementKey) -> Self {
        value.0
    }
}

impl TryFrom<&[u8]> for AdvertisementKey {
    type Error = core::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into()?))
    }
}
