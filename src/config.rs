use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::pipeline::{PipelineSettings, TimeWindow};
use crate::source::{FileSource, HttpSource, ObservationSource};
use crate::store::history::RETENTION_DAYS;

pub const DEFAULT_SOURCE_LABEL: &str = "HSGuru Top 100 + HSReplay player names";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding every persisted JSON artifact
    pub data_dir: PathBuf,

    /// Cap on observations aggregated per window
    pub max_decks_per_period: usize,

    pub windows: Vec<TimeWindow>,

    /// Days of history kept on disk
    pub retention_days: i64,

    /// Age after which a leftover run lock is ignored
    pub lock_stale_secs: u64,

    /// Seconds between cycles, 0 runs a single cycle
    pub run_interval_secs: u64,

    pub observation_source_url: Option<String>,

    pub observation_source_file: PathBuf,

    pub source_label: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| ".".to_string()));

        Ok(Config {
            max_decks_per_period: lookup("MAX_DECKS_PER_PERIOD")
                .unwrap_or_else(|| "1200".to_string())
                .parse()
                .context("MAX_DECKS_PER_PERIOD must be a valid number")?,

            windows: TimeWindow::parse_list(
                &lookup("META_WINDOWS").unwrap_or_else(|| "24h,7d,30d".to_string()),
            )
            .context("META_WINDOWS must be a comma-separated list like 24h,7d,30d")?,

            retention_days: lookup("RETENTION_DAYS")
                .map(|v| v.parse())
                .transpose()
                .context("RETENTION_DAYS must be a valid number")?
                .unwrap_or(RETENTION_DAYS),

            lock_stale_secs: lookup("LOCK_STALE_SECS")
                .unwrap_or_else(|| "7200".to_string())
                .parse()
                .context("LOCK_STALE_SECS must be a valid number")?,

            run_interval_secs: lookup("RUN_INTERVAL_SECS")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .context("RUN_INTERVAL_SECS must be a valid number")?,

            observation_source_url: lookup("OBSERVATION_SOURCE_URL").filter(|u| !u.trim().is_empty()),

            observation_source_file: lookup("OBSERVATION_SOURCE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("observations.json")),

            source_label: lookup("SNAPSHOT_SOURCE_LABEL")
                .unwrap_or_else(|| DEFAULT_SOURCE_LABEL.to_string()),

            data_dir,
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            data_dir: self.data_dir.clone(),
            windows: self.windows.clone(),
            max_decks_per_period: self.max_decks_per_period,
            retention_days: self.retention_days,
            source_label: self.source_label.clone(),
        }
    }

    /// HTTP feed when a URL is configured, the batch file otherwise
    pub fn observation_source(&self) -> ObservationSource {
        match &self.observation_source_url {
            Some(url) => ObservationSource::Http(HttpSource::new(url)),
            None => ObservationSource::File(FileSource::new(self.observation_source_file.clone())),
        }
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }
}
