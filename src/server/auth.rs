use std::{fmt, fs, path::Path, string::String};

use serde::{Deserialize, Serialize};

use super::AuthError;

/// Credentials for the report server: the account's DSID and its search-party token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auth {
    pub dsid: String,
    pub search_party_token: String,
}

impl Auth {
    /// Read credentials from a JSON file such as
    /// `{"dsid": "...", "searchPartyToken": "..."}`.
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let contents = fs::read(path).map_err(|source| AuthError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_slice(&contents).map_err(|source| AuthError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("dsid", &self.dsid)
            .field("search_party_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        fs::write(&path, r#"{"dsid": "1234567890", "searchPartyToken": "AQAAAABl"}"#).unwrap();

        let auth = Auth::from_file(&path).unwrap();

        assert_eq!(auth.dsid, "1234567890");
        assert_eq!(auth.search_party_token, "AQAAAABl");
        assert!(!format!("{auth:?}").contains("AQAAAABl"));
    }

    #[test]
    fn test_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        fs::write(&path, r#"{"dsid": "1234567890"}"#).unwrap();

        assert!(matches!(
            Auth::from_file(&path),
            Err(AuthError::Json { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Auth::from_file(&dir.path().join("auth.json")),
            Err(AuthError::Io { .. })
        ));
    }
}
