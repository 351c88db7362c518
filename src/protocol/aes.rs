use aes_gcm::{aead::consts::U16, aes::Aes128, AesGcm};

/// AES as used in the encryption and decryption of location reports: AES-128 in GCM mode
/// with a 16-byte nonce.
pub type Aes = AesGcm<Aes128, U16>;
