use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::source::RawObservation;

/// Reads a scraped batch dropped on disk as a JSON array
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means nothing was scraped this cycle
    pub fn read(&self) -> Result<Vec<RawObservation>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No observation batch at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read observations from {}", self.path.display())
                })
            }
        };

        let records: Vec<RawObservation> = serde_json::from_str(&text).with_context(|| {
            format!("Failed to parse observations in {}", self.path.display())
        })?;

        info!("Read {} observations from {}", records.len(), self.path.display());
        Ok(records)
    }
}
