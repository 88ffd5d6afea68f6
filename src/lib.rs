//! # Walks Tracker
//!
//! Turns a daily step count into progress along a fixed cross-country walking
//! route (Seattle to Boston along I-90 by default).
//!
//! This library provides:
//! - Route position lookup: cumulative miles to current/next waypoint,
//!   interpolated coordinates, percent complete and completed crossings
//! - Dashboard statistics: totals, best day, goal days, streaks,
//!   week-over-week comparison and projected arrival date
//! - Memoization of summaries keyed by a fingerprint of their inputs
//!
//! ## Features
//!
//! - **`persistence`** - Enable SQLite storage for step records and cached summaries
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use walks_tracker::{summarize, DailyStepRecord, RouteEngine, TrackerConfig};
//!
//! let route = RouteEngine::i90();
//! let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let records = vec![DailyStepRecord::new(day, 12_000, 10_000).unwrap()];
//!
//! let summary = summarize(&records, day, &route, &TrackerConfig::default());
//! assert_eq!(summary.total_steps, 12_000);
//! assert_eq!(summary.current_position.current_waypoint.city, "Seattle");
//! ```

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackerError};

// Injected constants (steps per mile, goal, pace window, streak policy)
pub mod config;
pub use config::{StreakAnchor, TrackerConfig};

// Route position engine
pub mod route;
pub use route::{Position, Route, RouteEngine, Waypoint, DEFAULT_ROUTE};

// Statistics aggregation
pub mod stats;
pub use stats::{summarize, summarize_scoped, StatsScope, StatsSummary};

// Step record sources (query interface + in-memory log)
pub mod steps;
pub use steps::{StepLog, StepSource};

// Summary memoization
pub mod cache;
pub use cache::{fingerprint, SummaryCache};

// Service facade
pub mod tracker;
pub use tracker::Tracker;

// SQLite persistence for step records and cached summaries
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteStepStore;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use walks_tracker::GpsPoint;
/// let point = GpsPoint::new(47.6080, -122.3375); // Seattle
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a route, for fitting the map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl RouteBounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Steps walked on one calendar day.
///
/// The date is the unique key: a source holds at most one record per date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStepRecord {
    pub date: NaiveDate,
    pub steps: u32,
    /// Step goal for this day (always > 0)
    pub goal: u32,
}

impl DailyStepRecord {
    /// Create a record, rejecting a zero goal.
    pub fn new(date: NaiveDate, steps: u32, goal: u32) -> Result<Self> {
        if goal == 0 {
            return Err(TrackerError::invalid(format!(
                "goal for {} must be > 0",
                date
            )));
        }
        Ok(Self { date, steps, goal })
    }

    /// Create a record using the configured default goal.
    pub fn with_default_goal(
        date: NaiveDate,
        steps: u32,
        config: &TrackerConfig,
    ) -> Result<Self> {
        Self::new(date, steps, config.daily_goal)
    }

    /// Whether the day's steps reached its goal.
    pub fn goal_met(&self) -> bool {
        self.steps >= self.goal
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(TrackerError::invalid(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending at (and including) `end`.
    pub fn ending_at(end: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(TrackerError::invalid("date range must span at least one day"));
        }
        Self::new(end - Duration::days(days as i64 - 1), end)
    }

    /// January 1st through December 31st of `year`.
    pub fn year(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_invalid("year out of range")?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_invalid("year out of range")?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days in the range.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether every day of the range falls in `year`.
    pub fn within_year(&self, year: i32) -> bool {
        self.start.year() == year && self.end.year() == year
    }
}

// ============================================================================
// Tests
// ============================================================================
