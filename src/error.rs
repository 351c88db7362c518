use alloc::string::String;

/// Failure to derive the sub-keys of a beacon.
///
/// Fatal for the beacon it concerns; a multi-beacon query records it and moves
/// on to the next beacon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationError {
    /// A shared secret did not have the length the key schedule expects.
    #[error("invalid shared secret length: expected {expected}, got {actual}")]
    InvalidSecretLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// The master private key is not a valid P-224 scalar.
    #[error("invalid master private key")]
    InvalidMasterKey,
    /// A derived private scalar was zero or otherwise unusable.
    #[error("derived an invalid private key at index {index}")]
    InvalidDerivedKey {
        /// Key schedule index that produced the scalar.
        index: u64,
    },
    /// The ANSI X9.63 key derivation function rejected its input.
    #[error("key derivation function failed")]
    Kdf,
}

/// Failure to decode a single report.
///
/// Never fatal for a batch: the report is skipped and the failure surfaced to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// The payload is not valid base64, is too short, or decrypted to too few bytes.
    #[error("malformed payload: {0}")]
    Payload(String),
    /// The ephemeral public key in the payload is not a point on P-224.
    #[error("invalid ephemeral public key")]
    Curve,
    /// The payload failed authentication under the sub-key.
    #[error("unable to decrypt payload")]
    Crypto,
}

/// Failure to load a key from its on-disk representation.
#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    /// A required line or field was missing or misspelled.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field was not valid base64.
    #[error("field `{field}` is not valid base64: {error}")]
    Base64 {
        /// Name of the offending field.
        field: &'static str,
        /// Underlying decoder error.
        error: base64::DecodeError,
    },
    /// A field decoded to the wrong number of bytes.
    #[error("field `{field}` has invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Name of the offending field.
        field: &'static str,
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// The private key is not a valid P-224 scalar.
    #[error("invalid private key")]
    InvalidPrivateKey,
    /// The encrypted beacon record could not be decrypted or parsed.
    #[error("invalid beacon record: {0}")]
    Record(String),
    /// A `.record` file was found but no record key was supplied.
    #[error("beacon record {0} requires a record key")]
    MissingRecordKey(String),
    /// Reading a key file failed.
    #[cfg(feature = "std")]
    #[error("unable to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Loading a named key file failed.
    #[error("failed to load {name}: {source}")]
    File {
        /// File name.
        name: String,
        /// What went wrong.
        source: alloc::boxed::Box<KeyFileError>,
    },
}
