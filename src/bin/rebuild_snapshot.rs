use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hs_meta_radar::config::Config;
use hs_meta_radar::pipeline::Pipeline;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rebuild_snapshot=info,hs_meta_radar=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("Rebuilding snapshot from history in {}", config.data_dir.display());

    let pipeline = Pipeline::new(config.pipeline_settings());
    let report = pipeline.rebuild(Utc::now())?;

    for (window, stats) in &report.windows {
        info!(
            "{}: {} decks analyzed, {} archetypes",
            window.key,
            stats.meta_score.total_decks_analyzed,
            stats.meta_score.archetypes.len()
        );
    }

    if !report.failed_windows.is_empty() {
        warn!("Windows kept from previous snapshot: {:?}", report.failed_windows);
    }

    info!(
        "Rebuilt {} from {} history entries",
        pipeline.publisher().path().display(),
        report.history_entries
    );
    Ok(())
}
