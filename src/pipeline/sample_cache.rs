use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{ArchetypeSampleCache, DeckObservation, SampleEntry, WindowStats};
use crate::pipeline::freshness::parse_freshness;

/// Refresh samples from raw observations.
///
/// An archetype without an entry takes the observation's code; an existing
/// entry is replaced only when the observation's freshness label places it
/// strictly after the entry's `updatedAt`. Returns true if anything changed.
pub fn update_from_observations(
    cache: &mut ArchetypeSampleCache,
    decks: &[DeckObservation],
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;

    for deck in decks {
        let name = deck.archetype();
        let Some(code) = deck.deck_code() else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let replace = match cache.get(name) {
            None => true,
            Some(existing) => parse_freshness(&deck.freshness, now)
                .map(|seen| seen > existing.updated_at)
                .unwrap_or(false),
        };

        if replace {
            debug!("Sample for {} from rank {:?}", name, deck.rank);
            cache.insert(
                name.to_string(),
                SampleEntry {
                    code: code.to_string(),
                    updated_at: now,
                    rank: deck.rank,
                },
            );
            changed = true;
        }
    }

    changed
}

/// Record every sample code published by the aggregated windows that
/// differs from the cached one. Returns true if anything changed.
pub fn update_from_windows<'a, I>(
    cache: &mut ArchetypeSampleCache,
    windows: I,
    now: DateTime<Utc>,
) -> bool
where
    I: IntoIterator<Item = &'a WindowStats>,
{
    let mut changed = false;

    for stats in windows {
        for archetype in &stats.meta_score.archetypes {
            let Some(code) = archetype.sample_deck_code.as_deref() else {
                continue;
            };
            if archetype.name.is_empty() {
                continue;
            }

            let differs = cache
                .get(&archetype.name)
                .map(|existing| existing.code != code)
                .unwrap_or(true);

            if differs {
                cache.insert(
                    archetype.name.clone(),
                    SampleEntry {
                        code: code.to_string(),
                        updated_at: now,
                        rank: None,
                    },
                );
                changed = true;
            }
        }
    }

    changed
}
