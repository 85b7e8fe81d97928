use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::StoreResult;
use crate::models::ArchetypeSampleCache;
use crate::store::json_file::{read_json_or_default, write_json_atomic, Diagnostics};

pub const SAMPLE_CACHE_FILE: &str = "archetype_latest.json";

/// File-backed archetype sample cache (`archetype_latest.json`)
pub struct SampleCacheStore {
    path: PathBuf,
}

impl SampleCacheStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SAMPLE_CACHE_FILE),
        }
    }

    pub fn load(&self, diagnostics: &mut Diagnostics) -> ArchetypeSampleCache {
        let (cache, _status): (ArchetypeSampleCache, _) =
            read_json_or_default(&self.path, diagnostics);
        cache
    }

    pub fn save(&self, cache: &ArchetypeSampleCache) -> StoreResult<()> {
        write_json_atomic(&self.path, cache)?;
        info!("Archetype sample cache saved ({} archetypes)", cache.len());
        Ok(())
    }
}
