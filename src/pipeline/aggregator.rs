use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::AggregateError;
use crate::models::{
    ArchetypeSampleCache, ArchetypeScore, DeckObservation, MetaScoreReport, Methodology, Percent,
    Tier, TopArchetype, WindowSnapshot, WindowStats,
};
use crate::pipeline::window::TimeWindow;
use crate::store::{window_cutoff, HistoricalLog};

/// Weights of the Meta Score components
pub const FREQUENCY_WEIGHT: f64 = 0.4;
pub const DIVERSITY_WEIGHT: f64 = 0.3;
pub const RANK_WEIGHT: f64 = 0.3;

/// Average rank assumed when an archetype has no numeric ranks
pub const DEFAULT_AVG_RANK: f64 = 100.0;

/// Size of the by-count snapshot list
pub const TOP_ARCHETYPES: usize = 5;

const UNKNOWN_DECK: &str = "Unknown Deck";
const UNKNOWN_CLASS: &str = "Unknown";

/// Running totals for one archetype
#[derive(Debug)]
struct ArchetypeTally {
    name: String,
    count: usize,
    ranks: Vec<u32>,
    players: HashSet<String>,
}

/// Mean of the numeric ranks, `DEFAULT_AVG_RANK` when there are none
pub fn average_rank(ranks: &[u32]) -> f64 {
    if ranks.is_empty() {
        return DEFAULT_AVG_RANK;
    }
    ranks.iter().map(|&r| r as f64).sum::<f64>() / ranks.len() as f64
}

/// Unrounded Meta Score: 40% frequency, 30% player diversity, 30% rank.
///
/// The rank component goes negative for average ranks above 100.
pub fn meta_score(count: usize, total: usize, unique_players: usize, avg_rank: f64) -> f64 {
    let frequency = count as f64 / total.max(1) as f64 * 100.0 * FREQUENCY_WEIGHT;
    let diversity = unique_players as f64 / count.max(1) as f64 * 100.0 * DIVERSITY_WEIGHT;
    let rank = (100.0 - avg_rank) / 100.0 * 100.0 * RANK_WEIGHT;

    frequency + diversity + rank
}

/// Round to the nearest integer, halves toward positive infinity
/// (-2.5 becomes -2, 2.5 becomes 3)
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Class of an archetype: its last word
pub fn class_of(archetype: &str) -> &str {
    archetype.split_whitespace().last().unwrap_or(UNKNOWN_CLASS)
}

/// Compute class distribution and the tiered archetype ranking for one
/// window's observations. Archetypes are grouped by exact name.
pub fn aggregate(
    decks: &[DeckObservation],
    period: &str,
    samples: &ArchetypeSampleCache,
    now: DateTime<Utc>,
) -> WindowStats {
    let total = decks.len();

    let mut classes: Vec<(String, usize)> = Vec::new();
    let mut class_index: HashMap<String, usize> = HashMap::new();
    let mut tallies: Vec<ArchetypeTally> = Vec::new();
    let mut tally_index: HashMap<String, usize> = HashMap::new();

    for deck in decks {
        let name = if deck.archetype().is_empty() {
            UNKNOWN_DECK
        } else {
            deck.archetype()
        };

        let class = class_of(name);
        match class_index.get(class).copied() {
            Some(i) => classes[i].1 += 1,
            None => {
                class_index.insert(class.to_string(), classes.len());
                classes.push((class.to_string(), 1));
            }
        }

        let i = *tally_index.entry(name.to_string()).or_insert_with(|| {
            tallies.push(ArchetypeTally {
                name: name.to_string(),
                count: 0,
                ranks: Vec::new(),
                players: HashSet::new(),
            });
            tallies.len() - 1
        });

        let tally = &mut tallies[i];
        tally.count += 1;
        if let Some(rank) = deck.rank {
            tally.ranks.push(rank);
        }
        if let Some(identity) = deck.identity() {
            tally.players.insert(identity);
        }
    }

    let mut archetypes: Vec<ArchetypeScore> = tallies
        .into_iter()
        .map(|tally| {
            let avg_rank = average_rank(&tally.ranks);
            let score = round_half_up(meta_score(tally.count, total, tally.players.len(), avg_rank));

            ArchetypeScore {
                count: tally.count,
                percentage: Percent::of(tally.count, total),
                unique_players: tally.players.len(),
                avg_rank: round_half_up(avg_rank),
                meta_score: score,
                tier: Tier::from_score(score),
                sample_deck_code: samples.get(&tally.name).map(|s| s.code.clone()),
                name: tally.name,
            }
        })
        .collect();

    archetypes.sort_by(|a, b| b.meta_score.cmp(&a.meta_score));

    let mut by_count: Vec<&ArchetypeScore> = archetypes.iter().collect();
    by_count.sort_by(|a, b| b.count.cmp(&a.count));
    let top_archetypes = by_count
        .into_iter()
        .take(TOP_ARCHETYPES)
        .map(|a| TopArchetype {
            name: a.name.clone(),
            count: a.count,
            percentage: a.percentage,
        })
        .collect();

    // First-seen class wins ties
    let most_played_class = classes
        .iter()
        .fold(None::<&(String, usize)>, |best, current| match best {
            Some(b) if b.1 >= current.1 => Some(b),
            _ => Some(current),
        })
        .map(|(class, _)| class.clone())
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string());

    let class_percentages: BTreeMap<String, Percent> = classes
        .iter()
        .map(|(class, count)| (class.clone(), Percent::of(*count, total)))
        .collect();
    let class_distribution: BTreeMap<String, usize> = classes.into_iter().collect();

    debug!(
        "{}: {} decks, {} archetypes, {} classes",
        period,
        total,
        archetypes.len(),
        class_distribution.len()
    );

    WindowStats {
        snapshot: WindowSnapshot {
            class_distribution,
            class_percentages,
            top_archetypes,
            most_played_class,
            total_decks_analyzed: total,
            period: period.to_string(),
        },
        meta_score: MetaScoreReport {
            archetypes,
            total_decks_analyzed: total,
            period: period.to_string(),
            last_calculated: now,
            methodology: Methodology::default(),
        },
    }
}

/// Slice the log for `window` and aggregate it
pub fn compute_window(
    log: &HistoricalLog,
    window: &TimeWindow,
    cap: usize,
    samples: &ArchetypeSampleCache,
    now: DateTime<Utc>,
) -> Result<WindowStats, AggregateError> {
    if window.hours == 0 {
        return Err(AggregateError::InvalidWindow {
            label: window.key.clone(),
            hours: window.hours,
        });
    }
    if cap == 0 {
        return Err(AggregateError::ZeroCap {
            label: window.key.clone(),
        });
    }
    if window_cutoff(window.hours, now).is_none() {
        return Err(AggregateError::OutOfRange {
            label: window.key.clone(),
            hours: window.hours,
        });
    }

    let decks = log.window_slice(window.hours, cap, now);
    Ok(aggregate(&decks, &window.period(), samples, now))
}
