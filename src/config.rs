//! Engine configuration.
//!
//! Loaded from TOML (typically a project's `schedule.toml`); every field
//! has a default, so an empty or missing file yields a usable config.
//!
//! ```toml
//! weekend_days = ["Sat", "Sun"]
//! search_horizon_days = 366
//! log_anomalies = true
//! ```

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::WorkCalendar;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Days of the week the site does not work.
    #[serde(default = "default_weekend_days")]
    pub weekend_days: Vec<Weekday>,

    /// Upper bound on how far working-day searches scan.
    #[serde(default = "default_search_horizon_days")]
    pub search_horizon_days: u32,

    /// Log evaluator anomalies (missing predecessor dates, inverted plans).
    #[serde(default = "default_log_anomalies")]
    pub log_anomalies: bool,
}

fn default_weekend_days() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

fn default_search_horizon_days() -> u32 {
    366
}

fn default_log_anomalies() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weekend_days: default_weekend_days(),
            search_horizon_days: default_search_horizon_days(),
            log_anomalies: default_log_anomalies(),
        }
    }
}

impl EngineConfig {
    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a file.
    ///
    /// Returns the default config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no engine config, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Builds the working-day calendar for a holiday set supplied by the
    /// holidays subsystem.
    pub fn calendar(&self, holidays: impl IntoIterator<Item = NaiveDate>) -> WorkCalendar {
        let mut calendar = WorkCalendar::new()
            .with_weekend(self.weekend_days.clone())
            .with_holidays(holidays);
        calendar.search_horizon_days = self.search_horizon_days;
        calendar
    }
}
