pub mod meta;
pub mod observation;
pub mod sample;

pub use meta::{
    ArchetypeScore, MetaScoreReport, MetaSnapshot, Methodology, Percent, Tier, TopArchetype,
    WindowSnapshot, WindowStats,
};
pub use observation::{normalize, DeckInfo, DeckObservation, HistoricalEntry};
pub use sample::{ArchetypeSampleCache, SampleEntry};
