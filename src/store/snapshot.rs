use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::models::MetaSnapshot;
use crate::store::json_file::{read_json_or_default, write_json_atomic, Diagnostics, LoadStatus};

pub const SNAPSHOT_FILE: &str = "top_decks.json";

pub const NO_NEW_RESULTS_MESSAGE: &str =
    "Data was refreshed but no new recent decks were found in the top 100";

/// Writes the aggregated snapshot consumed by the front end
pub struct SnapshotPublisher {
    path: PathBuf,
}

impl SnapshotPublisher {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SNAPSHOT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last published snapshot, None when missing or unreadable
    pub fn load_previous(&self, diagnostics: &mut Diagnostics) -> Option<MetaSnapshot> {
        let (snapshot, status): (Option<MetaSnapshot>, _) =
            read_json_or_default(&self.path, diagnostics);

        if status == LoadStatus::Loaded {
            snapshot
        } else {
            None
        }
    }

    pub fn publish(&self, snapshot: &MetaSnapshot) -> StoreResult<()> {
        write_json_atomic(&self.path, snapshot)?;
        info!(
            "Published snapshot: {} decks, {} windows",
            snapshot.total_decks,
            snapshot.meta_score.len()
        );
        Ok(())
    }

    /// Flag the existing snapshot as refreshed without new observations.
    ///
    /// Returns false when there is no previous snapshot to update.
    pub fn mark_no_new_results(
        &self,
        now: DateTime<Utc>,
        diagnostics: &mut Diagnostics,
    ) -> StoreResult<bool> {
        let Some(mut snapshot) = self.load_previous(diagnostics) else {
            warn!("No previous snapshot to flag as unchanged");
            return Ok(false);
        };

        snapshot.last_update = now;
        snapshot.no_new_results = true;
        snapshot.no_new_results_message = Some(NO_NEW_RESULTS_MESSAGE.to_string());

        write_json_atomic(&self.path, &snapshot)?;
        info!("Snapshot flagged: no new results");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn snapshot(now: DateTime<Utc>) -> MetaSnapshot {
        MetaSnapshot {
            last_update: now,
            source: "test".to_string(),
            total_decks: 0,
            known_players: 0,
            decks: Vec::new(),
            no_new_results: false,
            no_new_results_message: None,
            meta_snapshot: BTreeMap::new(),
            meta_score: BTreeMap::new(),
        }
    }

    #[test]
    fn test_load_previous_missing() {
        let dir = TempDir::new().unwrap();
        let publisher = SnapshotPublisher::new(dir.path());
        let mut diag = Diagnostics::default();

        assert!(publisher.load_previous(&mut diag).is_none());
        assert!(diag.is_clean());
    }

    #[test]
    fn test_publish_then_load() {
        let dir = TempDir::new().unwrap();
        let publisher = SnapshotPublisher::new(dir.path());
        let snap = snapshot(Utc::now());

        publisher.publish(&snap).unwrap();

        let mut diag = Diagnostics::default();
        assert_eq!(publisher.load_previous(&mut diag), Some(snap));
    }

    #[test]
    fn test_no_new_results_message_omitted_when_unset() {
        let value = serde_json::to_value(snapshot(Utc::now())).unwrap();
        assert_eq!(value["noNewResults"], false);
        assert!(value.get("noNewResultsMessage").is_none());
        assert!(value["metaSnapshot"].is_object());
    }

    #[test]
    fn test_mark_no_new_results() {
        let dir = TempDir::new().unwrap();
        let publisher = SnapshotPublisher::new(dir.path());
        let mut diag = Diagnostics::default();

        assert!(!publisher.mark_no_new_results(Utc::now(), &mut diag).unwrap());

        let earlier = Utc::now() - chrono::Duration::hours(1);
        publisher.publish(&snapshot(earlier)).unwrap();

        let now = Utc::now();
        assert!(publisher.mark_no_new_results(now, &mut diag).unwrap());

        let flagged = publisher.load_previous(&mut diag).unwrap();
        assert!(flagged.no_new_results);
        assert_eq!(flagged.last_update, now);
        assert_eq!(
            flagged.no_new_results_message.as_deref(),
            Some(NO_NEW_RESULTS_MESSAGE)
        );
    }
}
