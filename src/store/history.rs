use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::models::{DeckObservation, HistoricalEntry};
use crate::store::json_file::{read_json_or_default, write_json_atomic, Diagnostics};

pub const HISTORY_FILE: &str = "historical_data.json";

/// Default retention of the historical log
pub const RETENTION_DAYS: i64 = 30;

/// Upper bound on a configured retention
const MAX_RETENTION_DAYS: i64 = 365 * 100;

/// `now - hours`, None when it falls outside the representable range
pub fn window_cutoff(hours: u64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let hours = i64::try_from(hours).ok()?;
    now.checked_sub_signed(Duration::try_hours(hours)?)
}

/// On-disk layout; entries are kept as raw JSON so a single bad record does
/// not discard the rest of the log.
#[derive(Debug, Default, Deserialize)]
struct RawLog {
    #[serde(default)]
    entries: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct LogRef<'a> {
    entries: &'a [HistoricalEntry],
}

/// Time-bounded journal of scrape batches, retained entries in append order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalLog {
    pub entries: Vec<HistoricalEntry>,
}

impl HistoricalLog {
    /// Observations from entries newer than `now - hours`, flattened in
    /// append order and truncated at `cap`. The result is a prefix of the
    /// window, so it is biased toward its oldest entries. A lookback past the
    /// representable range covers the whole log.
    pub fn window_slice(&self, hours: u64, cap: usize, now: DateTime<Utc>) -> Vec<DeckObservation> {
        let cutoff = window_cutoff(hours, now).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut decks = Vec::new();

        for entry in self.entries.iter().filter(|e| e.timestamp > cutoff) {
            for deck in &entry.decks {
                if decks.len() >= cap {
                    return decks;
                }
                decks.push(deck.clone());
            }
        }

        decks
    }

    pub fn total_observations(&self) -> usize {
        self.entries.iter().map(|e| e.decks.len()).sum()
    }
}

/// File-backed store for the historical log
pub struct HistoryStore {
    path: PathBuf,
    retention: Duration,
}

impl HistoryStore {
    pub fn new(data_dir: &Path, retention_days: i64) -> Self {
        Self {
            path: data_dir.join(HISTORY_FILE),
            retention: Duration::days(retention_days.clamp(0, MAX_RETENTION_DAYS)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load entries inside the retention window relative to `now`.
    ///
    /// A missing or malformed file yields an empty log; entries whose
    /// timestamp cannot be parsed are dropped and counted.
    pub fn load(&self, now: DateTime<Utc>, diagnostics: &mut Diagnostics) -> HistoricalLog {
        let (raw, _status): (RawLog, _) = read_json_or_default(&self.path, diagnostics);
        let cutoff = now
            .checked_sub_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let stored = raw.entries.len();

        let mut entries = Vec::with_capacity(stored);
        for value in raw.entries {
            match serde_json::from_value::<HistoricalEntry>(value) {
                Ok(entry) if entry.timestamp > cutoff => entries.push(entry),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Dropping unreadable historical entry");
                    diagnostics.dropped_records += 1;
                }
            }
        }

        debug!(
            "Historical log: {} of {} stored entries within {} days",
            entries.len(),
            stored,
            self.retention.num_days()
        );

        HistoricalLog { entries }
    }

    /// Append a batch stamped `now` and write the retained log back atomically
    pub fn append(
        &self,
        decks: Vec<DeckObservation>,
        now: DateTime<Utc>,
        diagnostics: &mut Diagnostics,
    ) -> StoreResult<HistoricalLog> {
        let mut log = self.load(now, diagnostics);
        log.entries.push(HistoricalEntry {
            timestamp: now,
            decks,
        });

        write_json_atomic(&self.path, &LogRef {
            entries: &log.entries,
        })?;

        info!("Historical log updated: {} entries", log.entries.len());
        Ok(log)
    }
}
