use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hs_meta_radar::config::Config;
use hs_meta_radar::pipeline::Pipeline;
use hs_meta_radar::workers::{CycleOutcome, CycleWorker};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hs_meta_radar=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hs-meta-radar");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded (data dir: {}, windows: {})",
        config.data_dir.display(),
        config.windows.len()
    );

    let worker = CycleWorker::new(
        config.observation_source(),
        Pipeline::new(config.pipeline_settings()),
        config.lock_stale_after(),
        config.run_interval_secs,
    );

    if config.run_interval_secs == 0 {
        match worker.run_once().await? {
            CycleOutcome::Skipped => info!("Skipped: lock held by another run"),
            CycleOutcome::NoNewResults => info!("Snapshot flagged with no new results"),
            CycleOutcome::Published(report) => {
                info!("Published {} decks across {} windows", report.decks, report.windows.len())
            }
        }
        return Ok(());
    }

    let handle = tokio::spawn(async move {
        worker.run().await;
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        result = handle => {
            error!("Cycle worker exited unexpectedly: {:?}", result);
        }
    }

    info!("Shutting down hs-meta-radar");
    Ok(())
}
