use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::source::RawObservation;

/// Pulls the scraped batch from a JSON feed
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<RawObservation>> {
        debug!("Fetching observations: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch observations")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Observation feed error: {} - {}", status, text);
        }

        let records: Vec<RawObservation> = response
            .json()
            .await
            .context("Failed to parse observation feed")?;

        debug!("Fetched {} observations", records.len());
        Ok(records)
    }
}
