use std::path::PathBuf;

use thiserror::Error;

/// Failures writing persisted state. These abort a run: the on-disk state
/// would otherwise be unspecified.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encode error for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures computing a single aggregation window
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Window {label} has an empty lookback ({hours}h)")]
    InvalidWindow { label: String, hours: u64 },

    #[error("Window {label} has a zero observation cap")]
    ZeroCap { label: String },

    #[error("Window {label} reaches past the representable time range ({hours}h)")]
    OutOfRange { label: String, hours: u64 },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
