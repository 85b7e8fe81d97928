use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context};

/// A lookback window such as "24h" or "7d"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    /// Key used in the published snapshot ("24h", "7d", ...)
    pub key: String,
    pub hours: u64,
}

impl TimeWindow {
    pub fn hours(key: &str, hours: u64) -> Self {
        Self {
            key: key.to_string(),
            hours,
        }
    }

    /// The standard short/medium/long windows
    pub fn defaults() -> Vec<TimeWindow> {
        vec![
            TimeWindow::hours("24h", 24),
            TimeWindow::hours("7d", 24 * 7),
            TimeWindow::hours("30d", 24 * 30),
        ]
    }

    /// Human label, e.g. "Last 24 hours" or "Last 7 days"
    pub fn period(&self) -> String {
        if self.hours % 24 == 0 && self.hours >= 48 {
            format!("Last {} days", self.hours / 24)
        } else if self.hours == 1 {
            "Last hour".to_string()
        } else {
            format!("Last {} hours", self.hours)
        }
    }

    /// Parse a comma-separated list like "24h,7d,30d"
    pub fn parse_list(list: &str) -> anyhow::Result<Vec<TimeWindow>> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<TimeWindow>())
            .collect()
    }
}

impl FromStr for TimeWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        let (number, multiplier) = if let Some(n) = s.strip_suffix('h') {
            (n, 1)
        } else if let Some(n) = s.strip_suffix('d') {
            (n, 24)
        } else {
            bail!("Window '{}' must end in 'h' or 'd'", s);
        };

        let amount: u64 = number
            .parse()
            .with_context(|| format!("Window '{}' has an invalid length", s))?;

        let hours = amount
            .checked_mul(multiplier)
            .with_context(|| format!("Window '{}' is too long", s))?;

        Ok(TimeWindow {
            key: s.to_string(),
            hours,
        })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}
