use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Counters for anomalies that were tolerated while reading persisted state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Files that existed but could not be read or parsed
    pub corrupt_files: u32,
    /// Records dropped individually (e.g. history entries with a bad timestamp)
    pub dropped_records: u32,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.corrupt_files == 0 && self.dropped_records == 0
    }
}

/// Outcome of a fail-open read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    Missing,
    Corrupt,
}

/// Read a JSON file, falling back to `T::default()` when it is missing or
/// malformed. Corrupt reads are logged and counted, never propagated.
pub fn read_json_or_default<T>(path: &Path, diagnostics: &mut Diagnostics) -> (T, LoadStatus)
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found, starting empty", path.display());
            return (T::default(), LoadStatus::Missing);
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Unreadable state file, treating as empty"
            );
            diagnostics.corrupt_files += 1;
            return (T::default(), LoadStatus::Corrupt);
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => (value, LoadStatus::Loaded),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Malformed state file, treating as empty"
            );
            diagnostics.corrupt_files += 1;
            (T::default(), LoadStatus::Corrupt)
        }
    }
}

/// Serialize `value` to `<path>.tmp` and rename it over `path`, so readers
/// only ever see a complete file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let tmp = temp_path(path);
    fs::write(&tmp, json).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Wrote {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
