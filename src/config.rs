//! Tracker configuration.
//!
//! All tunable constants are injected through [`TrackerConfig`] rather than
//! hardcoded. Deployments typically build it once at startup, either from
//! [`TrackerConfig::default`] or from the environment with
//! [`TrackerConfig::from_env`].

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Environment variable prefix used by [`TrackerConfig::from_env`].
pub const ENV_PREFIX: &str = "WALKS_";

/// Which calendar day the current streak is counted back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakAnchor {
    /// Start at the `as_of` date. A missing or failed `as_of` day means a
    /// streak of 0.
    #[default]
    AsOf,
    /// Start at the most recent record on or before `as_of`.
    LatestRecord,
    /// Start at `as_of`, or at the day before when `as_of` has no record yet
    /// (today's steps may still be syncing).
    AsOfWithGrace,
}

impl FromStr for StreakAnchor {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "as_of" | "asof" => Ok(StreakAnchor::AsOf),
            "latest" | "latest_record" => Ok(StreakAnchor::LatestRecord),
            "grace" | "as_of_with_grace" => Ok(StreakAnchor::AsOfWithGrace),
            other => Err(TrackerError::config(format!(
                "unknown streak anchor '{}'",
                other
            ))),
        }
    }
}

/// Configuration for step conversion and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Steps that make up one mile.
    /// Default: 2000
    pub steps_per_mile: u32,

    /// Daily goal assigned to ingested records that do not carry their own.
    /// Default: 10000
    pub daily_goal: u32,

    /// Number of most recent days with data used to estimate walking pace
    /// for the arrival projection. Fewer days are used when fewer exist.
    /// Default: 30
    pub pace_window_days: u32,

    /// Reference day for the current streak.
    /// Default: [`StreakAnchor::AsOf`]
    pub streak_anchor: StreakAnchor,

    /// Maximum number of memoized summaries (one per scope).
    /// Default: 16
    pub cache_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            steps_per_mile: 2000,
            daily_goal: 10_000,
            pace_window_days: 30,
            streak_anchor: StreakAnchor::AsOf,
            cache_capacity: 16,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from `WALKS_*` environment variables.
    ///
    /// Unset variables keep their default. A variable that is set but does
    /// not parse is an error rather than being silently ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (used by
    /// [`TrackerConfig::from_env`] and by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            steps_per_mile: read_var(&lookup, "STEPS_PER_MILE")?
                .unwrap_or(defaults.steps_per_mile),
            daily_goal: read_var(&lookup, "DAILY_GOAL")?.unwrap_or(defaults.daily_goal),
            pace_window_days: read_var(&lookup, "PACE_WINDOW_DAYS")?
                .unwrap_or(defaults.pace_window_days),
            streak_anchor: read_var(&lookup, "STREAK_ANCHOR")?
                .unwrap_or(defaults.streak_anchor),
            cache_capacity: read_var(&lookup, "CACHE_CAPACITY")?
                .unwrap_or(defaults.cache_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every constant is usable as a divisor or window size.
    pub fn validate(&self) -> Result<()> {
        if self.steps_per_mile == 0 {
            return Err(TrackerError::config("steps_per_mile must be > 0"));
        }
        if self.daily_goal == 0 {
            return Err(TrackerError::config("daily_goal must be > 0"));
        }
        if self.pace_window_days == 0 {
            return Err(TrackerError::config("pace_window_days must be > 0"));
        }
        if self.cache_capacity == 0 {
            return Err(TrackerError::config("cache_capacity must be > 0"));
        }
        Ok(())
    }

    /// Convert a step count into miles.
    ///
    /// An unvalidated zero `steps_per_mile` yields 0 rather than infinity.
    pub fn steps_to_miles(&self, steps: u64) -> f64 {
        if self.steps_per_mile == 0 {
            return 0.0;
        }
        steps as f64 / self.steps_per_mile as f64
    }
}

fn read_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    match lookup(&key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| TrackerError::config(format!("{} has invalid value '{}'", key, raw))),
    }
}
