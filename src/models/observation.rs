use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sighting of a player's deck on the legend ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckObservation {
    /// Ladder position at observation time (missing in some legacy records)
    #[serde(default)]
    pub rank: Option<u32>,

    /// BattleTag, bare name, or the "Legend #<rank>" placeholder
    #[serde(rename = "name", default)]
    pub player: String,

    /// Whether the player matched an entry of the master list
    #[serde(default)]
    pub in_master_list: bool,

    /// Matching BattleTag from the master list
    #[serde(default)]
    pub battle_tag: Option<String>,

    /// Archetype name and deck code
    #[serde(default)]
    pub deck: DeckInfo,

    /// Display-only "time ago" label
    #[serde(rename = "lastSeen", default)]
    pub freshness: String,
}

/// Archetype label and (optional) deck code of an observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckInfo {
    /// Archetype name, last word is conventionally the class
    #[serde(default)]
    pub name: String,

    /// Encoded deck list
    #[serde(default)]
    pub code: Option<String>,
}

impl DeckObservation {
    /// Build an observation, synthesizing the placeholder identifier when
    /// no player name could be resolved
    pub fn new(
        rank: Option<u32>,
        player: Option<&str>,
        archetype: &str,
        code: Option<&str>,
        freshness: &str,
    ) -> Self {
        let player = match player.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => placeholder_for(rank),
        };

        Self {
            rank,
            player,
            in_master_list: false,
            battle_tag: None,
            deck: DeckInfo {
                name: archetype.to_string(),
                code: code
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            },
            freshness: freshness.to_string(),
        }
    }

    /// True when the identifier is a resolved name rather than a placeholder
    pub fn has_identity(&self) -> bool {
        !self.player.trim().is_empty() && !is_placeholder(&self.player)
    }

    /// Normalized identity, or None for placeholders
    pub fn identity(&self) -> Option<String> {
        if self.has_identity() {
            Some(normalize(&self.player))
        } else {
            None
        }
    }

    pub fn archetype(&self) -> &str {
        &self.deck.name
    }

    pub fn deck_code(&self) -> Option<&str> {
        self.deck.code.as_deref()
    }
}

/// Placeholder identifier used when the ladder entry has no resolvable name
pub fn placeholder_for(rank: Option<u32>) -> String {
    match rank {
        Some(rank) => format!("Legend #{}", rank),
        None => "Legend #?".to_string(),
    }
}

/// True for identifiers of the form "Legend #<rank>"
pub fn is_placeholder(name: &str) -> bool {
    match name.trim().strip_prefix("Legend #") {
        Some("?") => true,
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Lower-case and trim a player identifier for comparison
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One scrape batch in the historical log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub decks: Vec<DeckObservation>,
}
