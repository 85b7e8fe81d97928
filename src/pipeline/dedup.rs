use std::collections::HashSet;

use crate::models::{normalize, DeckObservation};

/// Dedup key: rank, deck code and normalized identity ("unknown" for placeholders)
type DedupKey = (Option<u32>, Option<String>, String);

fn dedup_key(observation: &DeckObservation) -> DedupKey {
    let identity = if observation.has_identity() {
        normalize(&observation.player)
    } else {
        "unknown".to_string()
    };

    (observation.rank, observation.deck.code.clone(), identity)
}

/// Collapse repeated observations of one scrape batch.
///
/// First occurrence of a key wins. The result is sorted ascending by rank
/// (stable; records without a rank go last).
pub fn dedupe(batch: Vec<DeckObservation>) -> Vec<DeckObservation> {
    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(batch.len());
    let mut unique: Vec<DeckObservation> = batch
        .into_iter()
        .filter(|observation| seen.insert(dedup_key(observation)))
        .collect();

    unique.sort_by_key(|observation| (observation.rank.is_none(), observation.rank));
    unique
}
