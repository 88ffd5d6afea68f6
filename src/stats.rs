//! Dashboard statistics over daily step records.
//!
//! [`summarize_scoped`] reduces a set of [`DailyStepRecord`]s into a
//! [`StatsSummary`]: totals, best day, goal days, the current streak, a
//! rolling week-over-week comparison, the walker's position on the route and
//! a projected arrival date at the destination.
//!
//! Totals, best day, goal days and streak are computed over the requested
//! scope (a calendar year or all time). The route position, crossings, week
//! comparison and arrival projection always use every record, since the
//! walker's progress is cumulative across years.
//!
//! The computation is a pure function of its inputs. Records dated after
//! `as_of` are ignored, and an empty record set yields zeroed fields with
//! `None` for the week comparison, best day and arrival estimate.
//!
//! ## Example
//! ```rust
//! use chrono::NaiveDate;
//! use walks_tracker::{summarize, DailyStepRecord, RouteEngine, TrackerConfig};
//!
//! let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
//! let records = vec![
//!     DailyStepRecord::new(d(1), 12_000, 10_000).unwrap(),
//!     DailyStepRecord::new(d(2), 9_000, 10_000).unwrap(),
//!     DailyStepRecord::new(d(3), 15_000, 10_000).unwrap(),
//! ];
//!
//! let summary = summarize(&records, d(3), &RouteEngine::i90(), &TrackerConfig::default());
//! assert_eq!(summary.total_distance_miles, 18.0);
//! assert_eq!(summary.current_streak, 1);
//! assert_eq!(summary.goal_met_percentage, 66.7);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{StreakAnchor, TrackerConfig};
use crate::route::{Position, RouteEngine};
use crate::{DailyStepRecord, DateRange};

/// Length of each window in the week-over-week comparison.
const WEEK_DAYS: i64 = 7;

/// Which records the totals are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsScope {
    /// One calendar year
    Year(i32),
    /// Every record
    AllTime,
}

impl StatsScope {
    /// `Some(year)` scopes to that year, `None` to all time.
    pub fn from_year(year: Option<i32>) -> Self {
        year.map(StatsScope::Year).unwrap_or(StatsScope::AllTime)
    }

    pub fn includes(&self, date: NaiveDate) -> bool {
        match self {
            StatsScope::Year(year) => date.year() == *year,
            StatsScope::AllTime => true,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            StatsScope::Year(year) => Some(*year),
            StatsScope::AllTime => None,
        }
    }
}

impl fmt::Display for StatsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsScope::Year(year) => write!(f, "{}", year),
            StatsScope::AllTime => write!(f, "all"),
        }
    }
}

/// Full statistics payload for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub scope: StatsScope,
    pub as_of: NaiveDate,

    // Scoped totals
    pub total_steps: u64,
    pub total_distance_miles: f64,
    /// Distinct dates with a record
    pub total_days: u32,
    pub avg_daily_steps: u64,
    pub avg_daily_miles: f64,
    pub best_day_steps: u32,
    /// Earliest date on ties
    pub best_day_date: Option<NaiveDate>,
    pub days_goal_met: u32,
    /// One decimal place
    pub goal_met_percentage: f64,
    pub current_streak: u32,

    // Rolling weeks (across years)
    /// The 7 days ending at `as_of`
    pub this_week_steps: u64,
    /// The 7 days before that
    pub last_week_steps: u64,
    /// Whole percent change, `None` when last week has no steps
    pub week_comparison: Option<i64>,

    // Cumulative route progress
    pub all_time_steps: u64,
    pub all_time_distance_miles: f64,
    pub crossings_completed: u32,
    pub current_position: Position,
    /// Miles left in the current crossing
    pub miles_remaining: f64,
    /// Average miles per day over the pace window
    pub daily_pace_miles: f64,
    pub days_to_destination: Option<u32>,
    pub eta_date: Option<NaiveDate>,
}

impl StatsSummary {
    /// Serialize the summary to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Summarize every record, as of `as_of`.
pub fn summarize(
    records: &[DailyStepRecord],
    as_of: NaiveDate,
    route: &RouteEngine,
    config: &TrackerConfig,
) -> StatsSummary {
    summarize_scoped(records, StatsScope::AllTime, as_of, route, config)
}

/// Summarize records for `scope`, as of `as_of`.
///
/// `records` should hold every known record (not just the scope's), so the
/// route position and arrival projection reflect cumulative progress. When
/// several records share a date, the later one in the slice wins.
pub fn summarize_scoped(
    records: &[DailyStepRecord],
    scope: StatsScope,
    as_of: NaiveDate,
    route: &RouteEngine,
    config: &TrackerConfig,
) -> StatsSummary {
    let all_days = index_by_date(records, as_of);
    let scoped_days: BTreeMap<NaiveDate, DailyStepRecord> = all_days
        .iter()
        .filter(|(date, _)| scope.includes(**date))
        .map(|(date, record)| (*date, *record))
        .collect();

    let total_steps: u64 = scoped_days.values().map(|r| r.steps as u64).sum();
    let total_days = scoped_days.len() as u32;
    let avg_daily_steps = if total_days > 0 {
        total_steps / total_days as u64
    } else {
        0
    };

    let best_day = best_day(&scoped_days);
    let days_goal_met = scoped_days.values().filter(|r| r.goal_met()).count() as u32;
    let goal_met_percentage = if total_days > 0 {
        round_to(100.0 * days_goal_met as f64 / total_days as f64, 1)
    } else {
        0.0
    };
    let current_streak = current_streak(&scoped_days, as_of, config.streak_anchor);

    let (this_week_steps, last_week_steps) = week_totals(&all_days, as_of);
    let week_comparison = percent_change(this_week_steps, last_week_steps);

    let all_time_steps: u64 = all_days.values().map(|r| r.steps as u64).sum();
    let all_time_distance_miles = config.steps_to_miles(all_time_steps);
    let current_position = route.position_at(all_time_distance_miles);
    let miles_remaining = route.total_distance() - current_position.effective_miles;

    let daily_pace_miles = daily_pace_miles(&all_days, config);
    let eta = days_to_destination(miles_remaining, daily_pace_miles).and_then(|days| {
        as_of
            .checked_add_signed(Duration::days(days as i64))
            .map(|eta_date| (days, eta_date))
    });
    let days_to_destination = eta.map(|(days, _)| days);
    let eta_date = eta.map(|(_, eta_date)| eta_date);

    StatsSummary {
        scope,
        as_of,
        total_steps,
        total_distance_miles: config.steps_to_miles(total_steps),
        total_days,
        avg_daily_steps,
        avg_daily_miles: config.steps_to_miles(avg_daily_steps),
        best_day_steps: best_day.map(|r| r.steps).unwrap_or(0),
        best_day_date: best_day.map(|r| r.date),
        days_goal_met,
        goal_met_percentage,
        current_streak,
        this_week_steps,
        last_week_steps,
        week_comparison,
        all_time_steps,
        all_time_distance_miles,
        crossings_completed: current_position.crossings_completed,
        current_position,
        miles_remaining,
        daily_pace_miles,
        days_to_destination,
        eta_date,
    }
}

/// Collapse records into one per date, dropping anything after `as_of`.
fn index_by_date(
    records: &[DailyStepRecord],
    as_of: NaiveDate,
) -> BTreeMap<NaiveDate, DailyStepRecord> {
    records
        .iter()
        .filter(|r| r.date <= as_of)
        .map(|r| (r.date, *r))
        .collect()
}

/// Record with the most steps; the earliest date wins ties.
fn best_day(days: &BTreeMap<NaiveDate, DailyStepRecord>) -> Option<&DailyStepRecord> {
    days.values().fold(None, |best, record| match best {
        Some(b) if b.steps >= record.steps => Some(b),
        _ => Some(record),
    })
}

/// Consecutive goal-met days counted backwards from the anchor day.
fn current_streak(
    days: &BTreeMap<NaiveDate, DailyStepRecord>,
    as_of: NaiveDate,
    anchor: StreakAnchor,
) -> u32 {
    let start = match anchor {
        StreakAnchor::AsOf => Some(as_of),
        StreakAnchor::LatestRecord => days.keys().next_back().copied(),
        StreakAnchor::AsOfWithGrace => {
            if days.contains_key(&as_of) {
                Some(as_of)
            } else {
                as_of.pred_opt()
            }
        }
    };

    let mut streak = 0;
    let mut day = start;
    while let Some(d) = day {
        match days.get(&d) {
            Some(record) if record.goal_met() => {
                streak += 1;
                day = d.pred_opt();
            }
            _ => break,
        }
    }
    streak
}

/// Steps in the 7 days ending at `as_of`, and in the 7 days before those.
fn week_totals(days: &BTreeMap<NaiveDate, DailyStepRecord>, as_of: NaiveDate) -> (u64, u64) {
    let sum_range = |range: Option<DateRange>| -> u64 {
        range
            .map(|r| {
                days.range(r.start..=r.end)
                    .map(|(_, record)| record.steps as u64)
                    .sum::<u64>()
            })
            .unwrap_or(0)
    };

    let this_week = DateRange::ending_at(as_of, WEEK_DAYS as u32).ok();
    let last_week_end = as_of - Duration::days(WEEK_DAYS);
    let last_week = DateRange::ending_at(last_week_end, WEEK_DAYS as u32).ok();
    (sum_range(this_week), sum_range(last_week))
}

/// Whole percent change from `previous` to `current`; `None` without a baseline.
fn percent_change(current: u64, previous: u64) -> Option<i64> {
    if previous == 0 {
        return None;
    }
    let change = 100.0 * (current as f64 - previous as f64) / previous as f64;
    Some(change.round() as i64)
}

/// Average miles per day over the most recent `pace_window_days` days with data.
fn daily_pace_miles(days: &BTreeMap<NaiveDate, DailyStepRecord>, config: &TrackerConfig) -> f64 {
    let recent: Vec<u64> = days
        .values()
        .rev()
        .take(config.pace_window_days as usize)
        .map(|r| r.steps as u64)
        .collect();
    if recent.is_empty() {
        return 0.0;
    }
    let steps: u64 = recent.iter().sum();
    config.steps_to_miles(steps) / recent.len() as f64
}

fn days_to_destination(miles_remaining: f64, daily_pace_miles: f64) -> Option<u32> {
    if daily_pace_miles <= 0.0 || !daily_pace_miles.is_finite() {
        return None;
    }
    let days = (miles_remaining / daily_pace_miles).ceil();
    if !days.is_finite() || days > u32::MAX as f64 {
        return None;
    }
    Some(days as u32)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(day: NaiveDate, steps: u32) -> DailyStepRecord {
        DailyStepRecord::new(day, steps, 10_000).unwrap()
    }

    /// `count` consecutive days ending at `end`, all with `steps`.
    fn run_of_days(end: NaiveDate, count: i64, steps: u32) -> Vec<DailyStepRecord> {
        (0..count)
            .map(|i| rec(end - Duration::days(count - 1 - i), steps))
            .collect()
    }

    fn summarize_default(records: &[DailyStepRecord], as_of: NaiveDate) -> StatsSummary {
        summarize(records, as_of, &RouteEngine::i90(), &TrackerConfig::default())
    }

    #[test]
    fn test_empty_records() {
        let summary = summarize_default(&[], date(2025, 6, 1));

        assert_eq!(summary.total_steps, 0);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.avg_daily_steps, 0);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.goal_met_percentage, 0.0);
        assert_eq!(summary.best_day_steps, 0);
        assert!(summary.best_day_date.is_none());
        assert!(summary.week_comparison.is_none());
        assert!(summary.eta_date.is_none());
        assert!(summary.days_to_destination.is_none());
        assert_eq!(summary.current_position.current_waypoint.city, "Seattle");
        assert_eq!(summary.miles_remaining, 2850.0);
    }

    #[test]
    fn test_three_day_scenario() {
        let records = vec![
            rec(date(2025, 1, 1), 12_000),
            rec(date(2025, 1, 2), 9_000),
            rec(date(2025, 1, 3), 15_000),
        ];
        let summary = summarize_default(&records, date(2025, 1, 3));

        assert_eq!(summary.total_steps, 36_000);
        assert_eq!(summary.total_distance_miles, 18.0);
        assert_eq!(summary.total_days, 3);
        assert_eq!(summary.avg_daily_steps, 12_000);
        assert_eq!(summary.days_goal_met, 2);
        assert_eq!(summary.goal_met_percentage, 66.7);
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.best_day_steps, 15_000);
        assert_eq!(summary.best_day_date, Some(date(2025, 1, 3)));
    }

    #[test]
    fn test_best_day_tie_takes_earliest() {
        let records = vec![
            rec(date(2025, 2, 5), 20_000),
            rec(date(2025, 2, 1), 20_000),
            rec(date(2025, 2, 3), 8_000),
        ];
        let summary = summarize_default(&records, date(2025, 2, 5));
        assert_eq!(summary.best_day_date, Some(date(2025, 2, 1)));
    }

    #[test]
    fn test_duplicate_dates_last_wins() {
        let records = vec![rec(date(2025, 1, 1), 4_000), rec(date(2025, 1, 1), 11_000)];
        let summary = summarize_default(&records, date(2025, 1, 1));
        assert_eq!(summary.total_days, 1);
        assert_eq!(summary.total_steps, 11_000);
        assert_eq!(summary.current_streak, 1);
    }

    #[test]
    fn test_records_after_as_of_ignored() {
        let records = vec![rec(date(2025, 1, 1), 10_000), rec(date(2025, 1, 5), 50_000)];
        let summary = summarize_default(&records, date(2025, 1, 2));
        assert_eq!(summary.total_steps, 10_000);
        assert_eq!(summary.all_time_steps, 10_000);
    }

    #[test]
    fn test_streak_breaks_on_gap() {
        let mut records = run_of_days(date(2025, 3, 10), 4, 11_000);
        // gap on 3/6, then more goal days before it
        records.extend(run_of_days(date(2025, 3, 5), 5, 12_000));
        let summary = summarize_default(&records, date(2025, 3, 10));
        assert_eq!(summary.current_streak, 4);
    }

    #[test]
    fn test_streak_zero_when_as_of_missing() {
        let records = run_of_days(date(2025, 3, 9), 5, 11_000);
        let summary = summarize_default(&records, date(2025, 3, 10));
        assert_eq!(summary.current_streak, 0);
    }

    #[test]
    fn test_streak_anchor_policies() {
        let records = run_of_days(date(2025, 3, 9), 5, 11_000);
        let route = RouteEngine::i90();

        let grace = TrackerConfig {
            streak_anchor: StreakAnchor::AsOfWithGrace,
            ..TrackerConfig::default()
        };
        assert_eq!(summarize(&records, date(2025, 3, 10), &route, &grace).current_streak, 5);
        // Grace covers a single missing day only
        assert_eq!(summarize(&records, date(2025, 3, 11), &route, &grace).current_streak, 0);

        let latest = TrackerConfig {
            streak_anchor: StreakAnchor::LatestRecord,
            ..TrackerConfig::default()
        };
        assert_eq!(summarize(&records, date(2025, 3, 20), &route, &latest).current_streak, 5);
    }

    #[test]
    fn test_streak_uses_record_goal() {
        let records = vec![
            DailyStepRecord::new(date(2025, 4, 1), 12_000, 15_000).unwrap(),
            DailyStepRecord::new(date(2025, 4, 2), 12_000, 10_000).unwrap(),
        ];
        let summary = summarize_default(&records, date(2025, 4, 2));
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.days_goal_met, 1);
    }

    #[test]
    fn test_week_comparison() {
        let as_of = date(2025, 5, 14);
        let mut records = run_of_days(as_of, 7, 12_000);
        records.extend(run_of_days(as_of - Duration::days(7), 7, 10_000));

        let summary = summarize_default(&records, as_of);
        assert_eq!(summary.this_week_steps, 84_000);
        assert_eq!(summary.last_week_steps, 70_000);
        assert_eq!(summary.week_comparison, Some(20));
    }

    #[test]
    fn test_week_comparison_without_baseline() {
        let as_of = date(2025, 5, 14);
        let records = vec![rec(as_of, 5_000)];
        let summary = summarize_default(&records, as_of);
        assert_eq!(summary.this_week_steps, 5_000);
        assert_eq!(summary.last_week_steps, 0);
        assert!(summary.week_comparison.is_none());
    }

    #[test]
    fn test_week_comparison_decline_rounds() {
        assert_eq!(percent_change(2, 3), Some(-33));
        assert_eq!(percent_change(0, 10), Some(-100));
        assert_eq!(percent_change(0, 0), None);
    }

    #[test]
    fn test_year_scope_keeps_all_time_position() {
        let records = vec![
            rec(date(2024, 12, 30), 1_000_000),
            rec(date(2024, 12, 31), 1_000_000),
            rec(date(2025, 1, 1), 20_000),
        ];
        let summary = summarize_scoped(
            &records,
            StatsScope::Year(2025),
            date(2025, 1, 1),
            &RouteEngine::i90(),
            &TrackerConfig::default(),
        );

        assert_eq!(summary.total_steps, 20_000);
        assert_eq!(summary.total_days, 1);
        assert_eq!(summary.all_time_steps, 2_020_000);
        assert_eq!(summary.all_time_distance_miles, 1010.0);
        assert_eq!(summary.current_position.current_waypoint.city, "Billings");
        // Week windows span the year boundary
        assert_eq!(summary.this_week_steps, 2_020_000);
    }

    #[test]
    fn test_crossings_and_miles_remaining_wrap() {
        // 2850 * 2000 = 5_700_000 steps per crossing; add 100 miles more
        let records = vec![
            rec(date(2025, 1, 1), 5_700_000),
            rec(date(2025, 1, 2), 200_000),
        ];
        let summary = summarize_default(&records, date(2025, 1, 2));
        assert_eq!(summary.crossings_completed, 1);
        assert!((summary.current_position.effective_miles - 100.0).abs() < 1e-9);
        assert!((summary.miles_remaining - 2750.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_crossing_restarts_lap() {
        let records = vec![rec(date(2025, 1, 1), 5_700_000)];
        let summary = summarize_default(&records, date(2025, 1, 1));
        assert_eq!(summary.crossings_completed, 1);
        assert_eq!(summary.current_position.effective_miles, 0.0);
        assert_eq!(summary.current_position.percent_complete, 0.0);
        assert_eq!(summary.miles_remaining, 2850.0);
    }

    #[test]
    fn test_eta_projection() {
        // 10 miles/day for 10 days = 100 miles in, 2750 left -> 275 days
        let as_of = date(2025, 1, 10);
        let records = run_of_days(as_of, 10, 20_000);
        let summary = summarize_default(&records, as_of);

        assert!((summary.daily_pace_miles - 10.0).abs() < 1e-9);
        assert_eq!(summary.days_to_destination, Some(275));
        assert_eq!(summary.eta_date, Some(as_of + Duration::days(275)));
    }

    #[test]
    fn test_eta_rounds_up_partial_day() {
        assert_eq!(days_to_destination(10.5, 10.0), Some(2));
        assert_eq!(days_to_destination(100.0, 0.0), None);
        assert_eq!(days_to_destination(2850.0, 1e-12), None);
    }

    #[test]
    fn test_tiny_pace_has_no_eta() {
        // 1 step in a month: roughly 170 million days away, past the calendar
        let as_of = date(2025, 2, 10);
        let mut records = run_of_days(as_of - Duration::days(1), 29, 0);
        records.push(rec(as_of, 1));
        let summary = summarize_default(&records, as_of);

        assert!(summary.daily_pace_miles > 0.0);
        assert!(summary.days_to_destination.is_none());
        assert!(summary.eta_date.is_none());
    }

    #[test]
    fn test_pace_window_uses_recent_days() {
        let as_of = date(2025, 2, 10);
        let mut records = run_of_days(as_of, 3, 4_000);
        records.extend(run_of_days(as_of - Duration::days(20), 10, 40_000));

        let config = TrackerConfig {
            pace_window_days: 3,
            ..TrackerConfig::default()
        };
        let summary = summarize(&records, as_of, &RouteEngine::i90(), &config);
        assert!((summary.daily_pace_miles - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_step_history_has_no_eta() {
        let as_of = date(2025, 2, 10);
        let records = run_of_days(as_of, 5, 0);
        let summary = summarize_default(&records, as_of);
        assert_eq!(summary.total_days, 5);
        assert!(summary.eta_date.is_none());
        assert_eq!(summary.current_streak, 0);
    }

    #[test]
    fn test_summary_json() {
        let summary = summarize_default(&[rec(date(2025, 1, 1), 12_000)], date(2025, 1, 1));
        let json: serde_json::Value = serde_json::from_str(&summary.to_json()).unwrap();
        assert_eq!(json["total_steps"], 12_000);
        assert_eq!(json["best_day_date"], "2025-01-01");
        assert_eq!(json["scope"], "all_time");
        assert!(json["week_comparison"].is_null());
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(StatsScope::Year(2025).to_string(), "2025");
        assert_eq!(StatsScope::from_year(None).to_string(), "all");
        assert_eq!(StatsScope::from_year(Some(2024)).year(), Some(2024));
    }
}
