pub mod file;
pub mod http;

use anyhow::Result;
use serde::Deserialize;

use crate::models::DeckObservation;

pub use file::FileSource;
pub use http::HttpSource;

/// Observation record as emitted by the scrapers
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservation {
    pub rank: Option<u32>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub deck_name: String,
    #[serde(default)]
    pub deck_code: Option<String>,
    #[serde(default)]
    pub time_ago: String,
}

impl From<RawObservation> for DeckObservation {
    fn from(raw: RawObservation) -> Self {
        DeckObservation::new(
            raw.rank,
            raw.player_name.as_deref(),
            raw.deck_name.trim(),
            raw.deck_code.as_deref(),
            raw.time_ago.trim(),
        )
    }
}

/// Where a cycle's observations come from
pub enum ObservationSource {
    File(FileSource),
    Http(HttpSource),
}

impl ObservationSource {
    /// Fetch the current batch of observations
    pub async fn fetch(&self) -> Result<Vec<DeckObservation>> {
        let raw = match self {
            ObservationSource::File(source) => source.read()?,
            ObservationSource::Http(source) => source.fetch().await?,
        };

        Ok(raw.into_iter().map(DeckObservation::from).collect())
    }

    pub fn describe(&self) -> String {
        match self {
            ObservationSource::File(source) => format!("file {}", source.path().display()),
            ObservationSource::Http(source) => format!("url {}", source.url()),
        }
    }
}
