use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StoreResult;
use crate::models::{normalize, DeckObservation};
use crate::store::json_file::{read_json_or_default, write_json_atomic, Diagnostics};

pub const MASTER_LIST_FILE: &str = "master_list.json";

/// Known BattleTags.
///
/// Tagged identifiers match a stored tag case-insensitively; bare names
/// match on the name portion of a stored tag.
pub struct MasterRegistry {
    path: PathBuf,
    /// Stored BattleTags, original casing
    players: Vec<String>,
    /// Lower-cased full tag -> stored BattleTag
    by_tag: HashMap<String, String>,
    /// Lower-cased name portion -> first stored BattleTag with that name
    by_name: HashMap<String, String>,
}

impl MasterRegistry {
    /// Create an empty registry persisted at `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            players: Vec::new(),
            by_tag: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Load `master_list.json` from the data directory, empty if missing or malformed
    pub fn load(data_dir: &Path, diagnostics: &mut Diagnostics) -> Self {
        let path = data_dir.join(MASTER_LIST_FILE);
        let (players, _status): (Vec<String>, _) = read_json_or_default(&path, diagnostics);

        let mut registry = Self::new(path);
        for player in players {
            registry.insert(player);
        }

        info!("Loaded {} known players", registry.players.len());
        registry
    }

    fn insert(&mut self, player: String) {
        self.by_tag
            .entry(normalize(&player))
            .or_insert_with(|| player.clone());
        self.by_name
            .entry(name_key(&player))
            .or_insert_with(|| player.clone());
        self.players.push(player);
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Stored BattleTag matching `player`, if any
    pub fn lookup(&self, player: &str) -> Option<&str> {
        let found = if player.contains('#') {
            self.by_tag.get(&normalize(player))
        } else {
            self.by_name.get(&name_key(player))
        };
        found.map(String::as_str)
    }

    /// Fill `inMasterList` / `battleTag` on an observation
    pub fn resolve(&self, observation: &mut DeckObservation) {
        let found = if observation.has_identity() {
            self.lookup(&observation.player).map(str::to_string)
        } else {
            None
        };

        observation.in_master_list = found.is_some();
        observation.battle_tag = found;
    }

    /// Add tagged identifiers from `batch` that are not yet known.
    ///
    /// Returns the newly added players in first-seen order; the stored list
    /// is kept sorted and free of exact duplicates.
    pub fn merge(&mut self, batch: &[DeckObservation]) -> Vec<String> {
        let mut added: Vec<String> = Vec::new();

        for observation in batch {
            let player = observation.player.trim();
            if !observation.has_identity() || !player.contains('#') {
                continue;
            }
            let key = normalize(player);
            if self.by_tag.contains_key(&key) || added.iter().any(|p| normalize(p) == key) {
                continue;
            }

            debug!("New player: {}", player);
            added.push(player.to_string());
        }

        if added.is_empty() {
            return added;
        }

        let mut players = std::mem::take(&mut self.players);
        players.extend(added.iter().cloned());
        players.sort();
        players.dedup();

        self.by_tag.clear();
        self.by_name.clear();
        for player in players {
            self.insert(player);
        }

        info!("Added {} new players to master list", added.len());
        added
    }

    /// Write the sorted list back atomically
    pub fn save(&self) -> StoreResult<()> {
        write_json_atomic(&self.path, &self.players)
    }
}

/// Lower-cased portion before the '#'
fn name_key(player: &str) -> String {
    player
        .split('#')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn obs(rank: u32, player: Option<&str>) -> DeckObservation {
        DeckObservation::new(Some(rank), player, "Combo Mage", Some("AAE"), "")
    }

    fn registry(players: &[&str]) -> MasterRegistry {
        let mut registry = MasterRegistry::new(PathBuf::from(MASTER_LIST_FILE));
        for p in players {
            registry.insert(p.to_string());
        }
        registry
    }

    #[test]
    fn test_lookup_is_case_insensitive_on_name() {
        let registry = registry(&["Xixo#1234"]);

        assert_eq!(registry.lookup("xixo"), Some("Xixo#1234"));
        assert_eq!(registry.lookup("XIXO#1234"), Some("Xixo#1234"));
        assert_eq!(registry.lookup("Xixo#9999"), None);
        assert_eq!(registry.lookup("Other"), None);
    }

    #[test]
    fn test_resolve_sets_master_list_fields() {
        let registry = registry(&["Xixo#1234"]);

        let mut known = obs(1, Some("xixo"));
        registry.resolve(&mut known);
        assert!(known.in_master_list);
        assert_eq!(known.battle_tag.as_deref(), Some("Xixo#1234"));

        let mut placeholder = obs(2, None);
        registry.resolve(&mut placeholder);
        assert!(!placeholder.in_master_list);
        assert_eq!(placeholder.battle_tag, None);
    }

    #[test]
    fn test_merge_adds_only_new_tagged_players() {
        let mut registry = registry(&["Zeta#1", "Alpha#2"]);
        let batch = vec![
            obs(1, Some("Beta#3")),
            obs(2, Some("beta#3")),
            obs(3, Some("alpha#77")),
            obs(4, Some("NoTag")),
            obs(5, None),
            obs(6, Some("Beta#3")),
        ];

        let added = registry.merge(&batch);

        assert_eq!(added, vec!["Beta#3".to_string(), "alpha#77".to_string()]);
        assert_eq!(
            registry.players(),
            &[
                "Alpha#2".to_string(),
                "Beta#3".to_string(),
                "Zeta#1".to_string(),
                "alpha#77".to_string()
            ]
        );
    }

    #[test]
    fn test_same_name_with_other_digits_is_a_different_player() {
        let mut registry = registry(&["Foo#1111"]);

        let mut other = obs(1, Some("Foo#2222"));
        registry.resolve(&mut other);
        assert!(!other.in_master_list);
        assert_eq!(other.battle_tag, None);

        let added = registry.merge(&[other]);
        assert_eq!(added, vec!["Foo#2222".to_string()]);
        assert_eq!(registry.players(), &["Foo#1111".to_string(), "Foo#2222".to_string()]);

        let mut known = obs(2, Some("foo#1111"));
        registry.resolve(&mut known);
        assert_eq!(known.battle_tag.as_deref(), Some("Foo#1111"));
        assert!(registry.merge(&[known]).is_empty());
    }

    #[test]
    fn test_merge_deduplicates_exact_strings() {
        let mut registry = registry(&["Dup#1", "Dup#1"]);
        registry.merge(&[obs(1, Some("New#5"))]);

        assert_eq!(registry.players(), &["Dup#1".to_string(), "New#5".to_string()]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut diag = Diagnostics::default();

        let mut registry = MasterRegistry::load(dir.path(), &mut diag);
        assert!(registry.is_empty());

        registry.merge(&[obs(1, Some("Bob#42")), obs(2, Some("Ann#7"))]);
        registry.save().unwrap();

        let reloaded = MasterRegistry::load(dir.path(), &mut diag);
        assert_eq!(reloaded.players(), &["Ann#7".to_string(), "Bob#42".to_string()]);
        assert!(diag.is_clean());
    }
}
