use std::{boxed::Box, fs, path::Path, string::String, vec::Vec};

use crate::error::KeyFileError;

use super::{BeaconRecordCodec, DynamicKey, MainKey, PlistRecordCodec, StaticKey};

const STATIC_EXTENSION: &str = "keys";
const RECORD_EXTENSION: &str = "record";

/// Load every key in `dir`: `*.keys` files as static keys and `*.record` files as
/// dynamic keys, decrypted with `record_key`. Anything else is skipped.
///
/// Files are visited in name order. The first file that fails to load aborts the
/// whole load.
pub fn load_keys(dir: &Path, record_key: Option<&[u8]>) -> Result<Vec<MainKey>, KeyFileError> {
    load_keys_with(dir, record_key, &PlistRecordCodec)
}

/// Like [`load_keys`], with a different record codec.
pub fn load_keys_with(
    dir: &Path,
    record_key: Option<&[u8]>,
    codec: &impl BeaconRecordCodec,
) -> Result<Vec<MainKey>, KeyFileError> {
    let io_error = |source| KeyFileError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir)
        .map_err(io_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut keys = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let key = match path.extension().and_then(|ext| ext.to_str()) {
            Some(STATIC_EXTENSION) => load_static(&path),
            Some(RECORD_EXTENSION) => load_dynamic(&path, &name, record_key, codec),
            _ => {
                tracing::trace!(file = %name, "skipping file");
                continue;
            }
        }
        .map_err(|source| KeyFileError::File {
            name: name.clone(),
            source: Box::new(source),
        })?;

        tracing::debug!(file = %name, id = %key.id(), kind = %key.kind(), "loaded key");
        keys.push(key);
    }

    Ok(keys)
}

fn read(path: &Path) -> Result<Vec<u8>, KeyFileError> {
    fs::read(path).map_err(|source| KeyFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_static(path: &Path) -> Result<MainKey, KeyFileError> {
    let contents = read(path)?;
    let contents = String::from_utf8_lossy(&contents);

    Ok(contents.parse::<StaticKey>()?.into())
}

fn load_dynamic(
    path: &Path,
    name: &str,
    record_key: Option<&[u8]>,
    codec: &impl BeaconRecordCodec,
) -> Result<MainKey, KeyFileError> {
    let record_key = record_key.ok_or_else(|| KeyFileError::MissingRecordKey(name.into()))?;
    let record = codec.decode(&read(path)?, record_key)?;

    Ok(DynamicKey::new(record).into())
}
