use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::model::BookingStatus;
use crate::status::StatusMap;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Total precedence order over source systems, highest first.
    /// Externalized so new sources never require resolution-code changes.
    pub precedence: Vec<String>,
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub revenue: RevenueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Bronze table this source's records land in.
    pub table: String,
    /// Raw status vocabulary → canonical status.
    pub status_map: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_silver_table")]
    pub silver_table: String,
    #[serde(default = "default_gold_table")]
    pub gold_table: String,
}

fn default_db_path() -> String {
    "travel_lakehouse.db".into()
}

fn default_silver_table() -> String {
    "silver_bookings".into()
}

fn default_gold_table() -> String {
    "gold_daily_bookings_kpi".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            silver_table: default_silver_table(),
            gold_table: default_gold_table(),
        }
    }
}

// ---------------------------------------------------------------------------
// Revenue policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueConfig {
    #[serde(default)]
    pub policy: RevenuePolicy,
}

/// Which statuses count toward revenue. Cancelled bookings never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenuePolicy {
    ConfirmedAndPending,
    ConfirmedOnly,
}

impl Default for RevenuePolicy {
    fn default() -> Self {
        Self::ConfirmedAndPending
    }
}

impl RevenuePolicy {
    pub fn eligible(&self, status: BookingStatus) -> bool {
        match status {
            BookingStatus::Confirmed => true,
            BookingStatus::Pending => matches!(self, Self::ConfirmedAndPending),
            BookingStatus::Cancelled => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| PipelineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.precedence.is_empty() {
            return Err(PipelineError::ConfigValidation(
                "precedence must list at least one source".into(),
            ));
        }

        // Precedence must be a total order: no duplicates
        for (i, source) in self.precedence.iter().enumerate() {
            if self.precedence[..i].contains(source) {
                return Err(PipelineError::ConfigValidation(format!(
                    "precedence lists source '{source}' more than once"
                )));
            }
        }

        // Precedence and configured sources must cover each other exactly
        for source in &self.precedence {
            if !self.sources.contains_key(source) {
                return Err(PipelineError::ConfigValidation(format!(
                    "precedence references unconfigured source '{source}'"
                )));
            }
        }
        for source in self.sources.keys() {
            if !self.precedence.contains(source) {
                return Err(PipelineError::ConfigValidation(format!(
                    "source '{source}' is missing from the precedence order"
                )));
            }
        }

        // Status maps must be exhaustively valid at load, not at first use
        self.status_maps()?;

        for (source, sc) in &self.sources {
            validate_table_name(source, &sc.table)?;
        }
        validate_table_name("storage", &self.storage.silver_table)?;
        validate_table_name("storage", &self.storage.gold_table)?;

        Ok(())
    }

    /// Rank of a source in the precedence order (0 = highest).
    pub fn rank(&self, source: &str) -> Option<usize> {
        self.precedence.iter().position(|s| s == source)
    }

    /// Compiled per-source status maps.
    pub fn status_maps(&self) -> Result<BTreeMap<String, StatusMap>, PipelineError> {
        self.sources
            .iter()
            .map(|(name, sc)| Ok((name.clone(), StatusMap::from_raw(name, &sc.status_map)?)))
            .collect()
    }
}

/// Table names end up interpolated into SQL, so restrict them to plain
/// identifiers.
fn validate_table_name(owner: &str, table: &str) -> Result<(), PipelineError> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PipelineError::ConfigValidation(format!(
            "{owner}: table name '{table}' is not a valid identifier"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
