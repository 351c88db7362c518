use std::{path::PathBuf, string::String};

/// Failure to talk to the anisette or report servers.
///
/// No call is retried; the caller decides whether to try again.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent, or its response not read or parsed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with something other than 200 OK.
    #[error("unexpected status code {status}: {body}")]
    Status {
        /// Status of the response.
        status: reqwest::StatusCode,
        /// Response body, as far as it could be read.
        body: String,
    },
    /// A value could not be used as an HTTP header.
    #[error("invalid value for header {name}")]
    InvalidHeader {
        /// Name of the header.
        name: &'static str,
        /// Underlying error.
        source: reqwest::header::InvalidHeaderValue,
    },
}

/// Failure to load the report server credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credentials file could not be read.
    #[error("unable to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The credentials file is not the expected JSON.
    #[error("invalid credentials in {path}: {source}")]
    Json {
        /// Path of the file.
        path: PathBuf,
        /// Underlying parser error.
        source: serde_json::Error,
    },
}
