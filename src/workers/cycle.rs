use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time;
use tracing::{error, info, warn};

use crate::pipeline::{Pipeline, RunReport};
use crate::source::ObservationSource;
use crate::store::{Diagnostics, RunLock};

/// Result of one scheduled cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Another run holds the lock
    Skipped,
    /// Nothing fetched, the existing snapshot was flagged
    NoNewResults,
    Published(RunReport),
}

/// Worker that fetches a batch and republishes the meta snapshot
pub struct CycleWorker {
    source: ObservationSource,
    pipeline: Pipeline,
    lock_stale_after: Duration,
    run_interval: Duration,
}

impl CycleWorker {
    pub fn new(
        source: ObservationSource,
        pipeline: Pipeline,
        lock_stale_after: Duration,
        run_interval_secs: u64,
    ) -> Self {
        Self {
            source,
            pipeline,
            lock_stale_after,
            run_interval: Duration::from_secs(run_interval_secs.max(1)),
        }
    }

    /// Run the worker loop
    pub async fn run(&self) {
        info!(
            "Cycle worker started (interval: {:?}, source: {})",
            self.run_interval,
            self.source.describe()
        );

        let mut interval = time::interval(self.run_interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                error!("Cycle failed: {:#}", e);
                warn!("Will retry on next interval");
            }
        }
    }

    /// Perform a single fetch-aggregate-publish cycle
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let data_dir = &self.pipeline.settings().data_dir;
        let Some(_lock) = RunLock::acquire(data_dir, self.lock_stale_after) else {
            info!("Another run is in progress, skipping");
            return Ok(CycleOutcome::Skipped);
        };

        let batch = self.source.fetch().await?;
        let now = Utc::now();

        if batch.is_empty() {
            info!("No observations fetched");
            let mut diagnostics = Diagnostics::default();
            self.pipeline
                .publisher()
                .mark_no_new_results(now, &mut diagnostics)?;
            return Ok(CycleOutcome::NoNewResults);
        }

        let report = self.pipeline.run(batch, now)?;
        log_summary(&report);

        Ok(CycleOutcome::Published(report))
    }
}

fn log_summary(report: &RunReport) {
    info!(
        decks = report.decks,
        known_players = report.known_players,
        new_players = report.new_players.len(),
        history_entries = report.history_entries,
        "Cycle complete"
    );

    let Some((window, stats)) = report.windows.first() else {
        return;
    };

    for (i, archetype) in stats.meta_score.archetypes.iter().take(3).enumerate() {
        info!(
            "{} #{}: {} (score {}, tier {}, {}%)",
            window.key,
            i + 1,
            archetype.name,
            archetype.meta_score,
            archetype.tier.as_str(),
            archetype.percentage
        );
    }
}
