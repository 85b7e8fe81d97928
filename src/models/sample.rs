use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recently seen representative deck for an archetype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleEntry {
    pub code: String,
    pub updated_at: DateTime<Utc>,
    /// Ladder rank of the observation that supplied the code, if any
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Archetype name -> sample deck
pub type ArchetypeSampleCache = BTreeMap<String, SampleEntry>;
