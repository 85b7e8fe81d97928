pub mod aggregator;
pub mod dedup;
pub mod freshness;
pub mod sample_cache;
pub mod window;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::matching::MasterRegistry;
use crate::models::{ArchetypeSampleCache, DeckObservation, MetaSnapshot, WindowStats};
use crate::store::{Diagnostics, HistoricalLog, HistoryStore, SampleCacheStore, SnapshotPublisher};

pub use aggregator::{aggregate, compute_window};
pub use dedup::dedupe;
pub use window::TimeWindow;

/// Settings shared by every run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub data_dir: PathBuf,
    pub windows: Vec<TimeWindow>,
    /// Cap on observations aggregated per window
    pub max_decks_per_period: usize,
    pub retention_days: i64,
    /// Free-text provenance written into the snapshot
    pub source_label: String,
}

/// What a run produced, for logging and tests
#[derive(Debug, Clone)]
pub struct RunReport {
    pub decks: usize,
    pub known_players: usize,
    pub new_players: Vec<String>,
    pub history_entries: usize,
    /// Windows in configured order
    pub windows: Vec<(TimeWindow, WindowStats)>,
    /// Windows that fell back to a previous or empty value
    pub failed_windows: Vec<String>,
    pub samples_updated: bool,
    pub diagnostics: Diagnostics,
}

/// Dedupe -> registry -> history -> samples -> windows -> snapshot
pub struct Pipeline {
    settings: PipelineSettings,
    history: HistoryStore,
    samples: SampleCacheStore,
    publisher: SnapshotPublisher,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        let history = HistoryStore::new(&settings.data_dir, settings.retention_days);
        let samples = SampleCacheStore::new(&settings.data_dir);
        let publisher = SnapshotPublisher::new(&settings.data_dir);

        Self {
            settings,
            history,
            samples,
            publisher,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    /// Process one scrape batch and publish a fresh snapshot.
    ///
    /// Only persistence write failures are returned as errors.
    pub fn run(&self, batch: Vec<DeckObservation>, now: DateTime<Utc>) -> StoreResult<RunReport> {
        let mut diagnostics = Diagnostics::default();
        let previous = self.publisher.load_previous(&mut diagnostics);

        let raw_count = batch.len();
        let mut decks = dedupe(batch);
        info!("{} observations, {} after dedupe", raw_count, decks.len());

        let mut registry = MasterRegistry::load(&self.settings.data_dir, &mut diagnostics);
        for deck in decks.iter_mut() {
            registry.resolve(deck);
        }
        let new_players = registry.merge(&decks);
        if !new_players.is_empty() {
            registry.save()?;
        }

        let log = self.history.append(decks.clone(), now, &mut diagnostics)?;

        let mut cache = self.samples.load(&mut diagnostics);
        let mut samples_updated = sample_cache::update_from_observations(&mut cache, &decks, now);

        let (windows, failed_windows) = self.compute_windows(&log, &cache, previous.as_ref(), now);

        samples_updated |=
            sample_cache::update_from_windows(&mut cache, windows.iter().map(|(_, s)| s), now);
        if samples_updated {
            self.samples.save(&cache)?;
        }

        let known_players = decks.iter().filter(|d| d.in_master_list).count();
        let snapshot = self.build_snapshot(decks, known_players, &windows, now);
        self.publisher.publish(&snapshot)?;

        if !diagnostics.is_clean() {
            warn!(
                corrupt_files = diagnostics.corrupt_files,
                dropped_records = diagnostics.dropped_records,
                "Run tolerated unreadable persisted state"
            );
        }

        Ok(RunReport {
            decks: snapshot.total_decks,
            known_players,
            new_players,
            history_entries: log.entries.len(),
            windows,
            failed_windows,
            samples_updated,
            diagnostics,
        })
    }

    /// Recompute every window from the stored history without a new batch.
    ///
    /// The previously published deck list is kept as-is.
    pub fn rebuild(&self, now: DateTime<Utc>) -> StoreResult<RunReport> {
        let mut diagnostics = Diagnostics::default();
        let previous = self.publisher.load_previous(&mut diagnostics);
        let log = self.history.load(now, &mut diagnostics);

        let mut cache = self.samples.load(&mut diagnostics);
        let (windows, failed_windows) = self.compute_windows(&log, &cache, previous.as_ref(), now);

        let samples_updated =
            sample_cache::update_from_windows(&mut cache, windows.iter().map(|(_, s)| s), now);
        if samples_updated {
            self.samples.save(&cache)?;
        }

        let decks = previous.map(|p| p.decks).unwrap_or_default();
        let known_players = decks.iter().filter(|d| d.in_master_list).count();
        let snapshot = self.build_snapshot(decks, known_players, &windows, now);
        self.publisher.publish(&snapshot)?;

        Ok(RunReport {
            decks: snapshot.total_decks,
            known_players,
            new_players: Vec::new(),
            history_entries: log.entries.len(),
            windows,
            failed_windows,
            samples_updated,
            diagnostics,
        })
    }

    /// Each window is computed on its own; a failing window reuses the
    /// previously published value, or an empty one.
    fn compute_windows(
        &self,
        log: &HistoricalLog,
        cache: &ArchetypeSampleCache,
        previous: Option<&MetaSnapshot>,
        now: DateTime<Utc>,
    ) -> (Vec<(TimeWindow, WindowStats)>, Vec<String>) {
        let mut windows = Vec::with_capacity(self.settings.windows.len());
        let mut failed = Vec::new();

        for window in &self.settings.windows {
            let stats = match compute_window(
                log,
                window,
                self.settings.max_decks_per_period,
                cache,
                now,
            ) {
                Ok(stats) => {
                    info!(
                        "{}: {} decks, {} archetypes",
                        window,
                        stats.meta_score.total_decks_analyzed,
                        stats.meta_score.archetypes.len()
                    );
                    stats
                }
                Err(e) => {
                    warn!(window = %window, error = %e, "Window aggregation failed, keeping previous value");
                    failed.push(window.key.clone());
                    previous
                        .and_then(|p| p.window(&window.key))
                        .unwrap_or_else(|| WindowStats::empty(&window.period(), now))
                }
            };
            windows.push((window.clone(), stats));
        }

        (windows, failed)
    }

    fn build_snapshot(
        &self,
        decks: Vec<DeckObservation>,
        known_players: usize,
        windows: &[(TimeWindow, WindowStats)],
        now: DateTime<Utc>,
    ) -> MetaSnapshot {
        let mut meta_snapshot = BTreeMap::new();
        let mut meta_score = BTreeMap::new();
        for (window, stats) in windows {
            meta_snapshot.insert(window.key.clone(), stats.snapshot.clone());
            meta_score.insert(window.key.clone(), stats.meta_score.clone());
        }

        MetaSnapshot {
            last_update: now,
            source: self.settings.source_label.clone(),
            total_decks: decks.len(),
            known_players,
            decks,
            no_new_results: false,
            no_new_results_message: None,
            meta_snapshot,
            meta_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::player_registry::MASTER_LIST_FILE;
    use crate::models::Tier;
    use crate::store::history::HISTORY_FILE;
    use crate::store::json_file::write_json_atomic;
    use crate::store::samples::SAMPLE_CACHE_FILE;
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn settings(dir: &Path, windows: Vec<TimeWindow>) -> PipelineSettings {
        PipelineSettings {
            data_dir: dir.to_path_buf(),
            windows,
            max_decks_per_period: 1200,
            retention_days: 30,
            source_label: "test feed".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn obs(rank: u32, player: Option<&str>, archetype: &str, code: &str) -> DeckObservation {
        DeckObservation::new(Some(rank), player, archetype, Some(code), "1 hour ago")
    }

    fn batch() -> Vec<DeckObservation> {
        vec![
            obs(9, Some("c#3"), "Combo Mage", "M3"),
            obs(1, Some("a#1"), "Combo Mage", "M1"),
            obs(1, Some("A#1"), "Combo Mage", "M1"),
            obs(5, Some("b#2"), "Combo Mage", "M2"),
            obs(20, Some("d#4"), "Aggro Paladin", "P1"),
            obs(30, None, "Big Druid", "D1"),
        ]
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = TempDir::new().unwrap();
        write_json_atomic(&dir.path().join(MASTER_LIST_FILE), &vec!["D#4"]).unwrap();
        let pipeline = Pipeline::new(settings(dir.path(), TimeWindow::defaults()));

        let report = pipeline.run(batch(), now()).unwrap();

        assert_eq!(report.decks, 5);
        assert_eq!(report.known_players, 1);
        assert_eq!(report.new_players, vec!["a#1", "b#2", "c#3"]);
        assert_eq!(report.history_entries, 1);
        assert!(report.failed_windows.is_empty());
        assert!(report.samples_updated);
        assert!(report.diagnostics.is_clean());

        let published = pipeline.publisher().load_previous(&mut Diagnostics::default()).unwrap();
        assert_eq!(published.total_decks, 5);
        assert_eq!(published.source, "test feed");
        assert_eq!(published.decks[0].rank, Some(1));
        assert_eq!(published.decks[3].battle_tag.as_deref(), Some("D#4"));
        assert_eq!(published.meta_score.len(), 3);

        let day = &published.meta_score["24h"];
        assert_eq!(day.total_decks_analyzed, 5);
        assert_eq!(day.archetypes[0].name, "Combo Mage");
        // First observation of the batch supplies the sample
        assert_eq!(day.archetypes[0].sample_deck_code.as_deref(), Some("M1"));
        assert_eq!(published.meta_snapshot["7d"].most_played_class, "Mage");

        let registry: Vec<String> =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MASTER_LIST_FILE)).unwrap())
                .unwrap();
        assert_eq!(registry, vec!["D#4", "a#1", "b#2", "c#3"]);
        assert!(dir.path().join(HISTORY_FILE).exists());
        assert!(dir.path().join(SAMPLE_CACHE_FILE).exists());
    }

    #[test]
    fn test_runs_accumulate_history() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(settings(dir.path(), TimeWindow::defaults()));

        pipeline.run(batch(), now() - chrono::Duration::days(2)).unwrap();
        let report = pipeline.run(batch(), now()).unwrap();

        assert_eq!(report.history_entries, 2);
        let (_, day) = &report.windows[0];
        let (_, week) = &report.windows[1];
        assert_eq!(day.meta_score.total_decks_analyzed, 5);
        assert_eq!(week.meta_score.total_decks_analyzed, 10);
    }

    #[test]
    fn test_second_identical_run_leaves_samples_untouched() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(settings(dir.path(), TimeWindow::defaults()));

        pipeline.run(batch(), now()).unwrap();
        let report = pipeline.run(batch(), now()).unwrap();

        assert!(!report.samples_updated);
    }

    #[test]
    fn test_failed_window_falls_back_to_previous() {
        let dir = TempDir::new().unwrap();
        let healthy = vec![TimeWindow::hours("24h", 24)];
        Pipeline::new(settings(dir.path(), healthy)).run(batch(), now()).unwrap();

        // Same key, now invalid: the previous 24h stats are reused
        let broken = vec![TimeWindow::hours("24h", 0), TimeWindow::hours("7d", 168)];
        let report = Pipeline::new(settings(dir.path(), broken))
            .run(batch(), now())
            .unwrap();

        assert_eq!(report.failed_windows, vec!["24h"]);
        let (_, day) = &report.windows[0];
        let (_, week) = &report.windows[1];
        assert_eq!(day.meta_score.total_decks_analyzed, 5);
        assert_eq!(week.meta_score.total_decks_analyzed, 10);
    }

    #[test]
    fn test_failed_window_without_previous_is_empty() {
        let dir = TempDir::new().unwrap();
        let windows = vec![TimeWindow::hours("0h", 0)];

        let report = Pipeline::new(settings(dir.path(), windows))
            .run(batch(), now())
            .unwrap();

        let (_, stats) = &report.windows[0];
        assert_eq!(stats.meta_score.total_decks_analyzed, 0);
        assert!(stats.meta_score.archetypes.is_empty());
    }

    #[test]
    fn test_out_of_range_window_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let windows = vec![
            TimeWindow::hours("24h", 24),
            "9999999999h".parse::<TimeWindow>().unwrap(),
        ];

        let report = Pipeline::new(settings(dir.path(), windows))
            .run(batch(), now())
            .unwrap();

        assert_eq!(report.failed_windows, vec!["9999999999h"]);
        let (_, day) = &report.windows[0];
        let (_, huge) = &report.windows[1];
        assert_eq!(day.meta_score.total_decks_analyzed, 5);
        assert_eq!(huge.meta_score.total_decks_analyzed, 0);
    }

    #[test]
    fn test_corrupt_history_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(HISTORY_FILE), "garbage").unwrap();
        let pipeline = Pipeline::new(settings(dir.path(), TimeWindow::defaults()));

        let report = pipeline.run(batch(), now()).unwrap();

        // One corrupt read while appending
        assert_eq!(report.diagnostics.corrupt_files, 1);
        assert_eq!(report.history_entries, 1);
    }

    #[test]
    fn test_empty_batch_keeps_schema() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(settings(dir.path(), TimeWindow::defaults()));

        let report = pipeline.run(Vec::new(), now()).unwrap();

        assert_eq!(report.decks, 0);
        for (_, stats) in &report.windows {
            assert_eq!(stats.meta_score.total_decks_analyzed, 0);
            assert!(stats.snapshot.top_archetypes.is_empty());
        }
    }

    #[test]
    fn test_rebuild_recomputes_from_history() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(settings(dir.path(), TimeWindow::defaults()));
        pipeline.run(batch(), now()).unwrap();

        // A day later the 24h window is empty but the 7d window still has the batch
        let report = pipeline.rebuild(now() + chrono::Duration::days(1)).unwrap();

        assert_eq!(report.decks, 5);
        let (_, day) = &report.windows[0];
        let (_, week) = &report.windows[1];
        assert_eq!(day.meta_score.total_decks_analyzed, 0);
        assert_eq!(week.meta_score.total_decks_analyzed, 5);
        assert_eq!(week.meta_score.archetypes[0].tier, Tier::S);
    }
}
