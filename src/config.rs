/// Engine configuration
///
/// Defaults cover everything; values stored under `engine.*` in the
/// preferences table override them.

use crate::db::Database;
use crate::error::{EngineError, Result};
use crate::intelligence::ScoringStrategy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Preference key prefix for engine settings
pub const PREFERENCE_PREFIX: &str = "engine.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Most recent work items fed to the profiler
    pub history_limit: i64,
    /// Most recent activity-log entries fed to the profiler
    pub activity_limit: i64,
    pub profile_ttl: Duration,
    pub item_score_ttl: Duration,
    /// Deadline for each upstream store fetch
    pub fetch_timeout: Duration,
    /// Surface upstream failures instead of falling back to defaults
    pub strict: bool,
    pub cache_enabled: bool,
    pub strategy: ScoringStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            activity_limit: 200,
            profile_ttl: Duration::from_secs(30 * 60),
            item_score_ttl: Duration::from_secs(5 * 60),
            fetch_timeout: Duration::from_secs(3),
            strict: false,
            cache_enabled: true,
            strategy: ScoringStrategy::Optimized,
        }
    }
}

impl EngineConfig {
    /// Load the defaults overlaid with stored preferences
    pub async fn load(db: &Database) -> Result<Self> {
        let mut config = Self::default();
        for pref in db.get_preferences_with_prefix(PREFERENCE_PREFIX).await? {
            let key = pref.key.trim_start_matches(PREFERENCE_PREFIX);
            config.apply(key, &pref.value)?;
        }
        Ok(config)
    }

    /// Apply a single `key = value` override (key without the `engine.` prefix)
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "history_limit" => self.history_limit = parse_limit(key, value)?,
            "activity_limit" => self.activity_limit = parse_limit(key, value)?,
            "profile_ttl_secs" => self.profile_ttl = parse_secs(key, value)?,
            "item_score_ttl_secs" => self.item_score_ttl = parse_secs(key, value)?,
            "fetch_timeout_ms" => {
                self.fetch_timeout = Duration::from_millis(parse_value(key, value)?)
            }
            "strict" => self.strict = parse_value(key, value)?,
            "cache_enabled" => self.cache_enabled = parse_value(key, value)?,
            "strategy" => self.strategy = parse_value(key, value)?,
            other => {
                return Err(EngineError::Config(format!("unknown setting '{}'", other)));
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Config(format!("invalid value '{}' for {}", value, key)))
}

fn parse_limit(key: &str, value: &str) -> Result<i64> {
    let limit: i64 = parse_value(key, value)?;
    if limit <= 0 {
        return Err(EngineError::Config(format!("{} must be positive", key)));
    }
    Ok(limit)
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    Ok(Duration::from_secs(parse_value(key, value)?))
}
