use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::DeckObservation;

/// Percentage rounded to one decimal place.
///
/// Serialized as a string ("40.0") because the published snapshot has always
/// carried fixed-point strings; plain numbers are accepted when reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    /// `part / max(total, 1) * 100`, rounded to one decimal
    pub fn of(part: usize, total: usize) -> Self {
        let total = total.max(1) as f64;
        Self::round1(part as f64 / total * 100.0)
    }

    pub fn round1(value: f64) -> Self {
        Percent((value * 10.0).round() / 10.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Percent::round1(n)),
            Repr::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Percent::round1)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Meta Score bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    S,
    A,
    B,
    C,
}

impl Tier {
    /// Non-overlapping thresholds, evaluated high to low
    pub fn from_score(score: i64) -> Self {
        if score >= 75 {
            Tier::S
        } else if score >= 60 {
            Tier::A
        } else if score >= 45 {
            Tier::B
        } else {
            Tier::C
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
        }
    }
}

/// Per-window ranking row for one archetype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeScore {
    pub name: String,
    pub count: usize,
    pub percentage: Percent,
    pub unique_players: usize,
    pub avg_rank: i64,
    pub meta_score: i64,
    pub tier: Tier,
    pub sample_deck_code: Option<String>,
}

/// Row of the by-count "snapshot" list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopArchetype {
    pub name: String,
    pub count: usize,
    pub percentage: Percent,
}

/// Class distribution and most played archetypes for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub class_distribution: BTreeMap<String, usize>,
    pub class_percentages: BTreeMap<String, Percent>,
    pub top_archetypes: Vec<TopArchetype>,
    pub most_played_class: String,
    pub total_decks_analyzed: usize,
    pub period: String,
}

/// Weight description published alongside the scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Methodology {
    pub frequency: String,
    pub diversity: String,
    pub ranking: String,
}

impl Default for Methodology {
    fn default() -> Self {
        Self {
            frequency: "40% - Appearances in the period".to_string(),
            diversity: "30% - Unique players using it".to_string(),
            ranking: "30% - Average ladder rank of its players".to_string(),
        }
    }
}

/// Authoritative Meta Score ranking for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaScoreReport {
    pub archetypes: Vec<ArchetypeScore>,
    pub total_decks_analyzed: usize,
    pub period: String,
    pub last_calculated: DateTime<Utc>,
    #[serde(default)]
    pub methodology: Methodology,
}

/// Both views computed for a window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub snapshot: WindowSnapshot,
    pub meta_score: MetaScoreReport,
}

impl WindowStats {
    /// Well-formed result for a window with nothing to report
    pub fn empty(period: &str, now: DateTime<Utc>) -> Self {
        Self {
            snapshot: WindowSnapshot {
                class_distribution: BTreeMap::new(),
                class_percentages: BTreeMap::new(),
                top_archetypes: Vec::new(),
                most_played_class: "Unknown".to_string(),
                total_decks_analyzed: 0,
                period: period.to_string(),
            },
            meta_score: MetaScoreReport {
                archetypes: Vec::new(),
                total_decks_analyzed: 0,
                period: period.to_string(),
                last_calculated: now,
                methodology: Methodology::default(),
            },
        }
    }
}

/// Published artifact consumed by the front end (`top_decks.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaSnapshot {
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    pub total_decks: usize,
    #[serde(default)]
    pub known_players: usize,
    #[serde(default)]
    pub decks: Vec<DeckObservation>,
    #[serde(default)]
    pub no_new_results: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_new_results_message: Option<String>,
    #[serde(default)]
    pub meta_snapshot: BTreeMap<String, WindowSnapshot>,
    #[serde(default)]
    pub meta_score: BTreeMap<String, MetaScoreReport>,
}

impl MetaSnapshot {
    /// Previously published stats for a window, if both views are present
    pub fn window(&self, key: &str) -> Option<WindowStats> {
        let snapshot = self.meta_snapshot.get(key)?.clone();
        let meta_score = self.meta_score.get(key)?.clone();
        Some(WindowStats {
            snapshot,
            meta_score,
        })
    }
}
