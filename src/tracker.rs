//! Service facade tying a step source, the route engine, configuration and
//! the summary cache together.
//!
//! This is what a surrounding HTTP layer holds on to: one [`Tracker`] per
//! process, with `stats` behind the stats endpoint, `record_steps` behind the
//! ingestion endpoint and `waypoints` behind the route endpoint.

use chrono::NaiveDate;
use log::{debug, info};

use crate::cache::{fingerprint, SummaryCache};
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::route::{Position, RouteEngine, Waypoint};
use crate::stats::{summarize_scoped, StatsScope, StatsSummary};
use crate::steps::StepSource;
use crate::{DailyStepRecord, DateRange};

#[cfg(feature = "persistence")]
use crate::persistence::SqliteStepStore;

/// Step tracking service over a [`StepSource`].
pub struct Tracker<S: StepSource> {
    source: S,
    route: RouteEngine,
    config: TrackerConfig,
    cache: SummaryCache,
}

impl<S: StepSource> Tracker<S> {
    /// Create a tracker, validating the configuration.
    pub fn new(source: S, route: RouteEngine, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let cache = SummaryCache::new(config.cache_capacity);
        Ok(Self {
            source,
            route,
            config,
            cache,
        })
    }

    /// Statistics for `scope` as of `as_of`.
    ///
    /// Served from the cache when the step records and `as_of` are unchanged
    /// since the last computation for this scope.
    pub fn stats(&mut self, scope: StatsScope, as_of: NaiveDate) -> Result<StatsSummary> {
        let records = self.source.all_steps()?;
        let fp = fingerprint(&records, as_of);

        if let Some(summary) = self.cache.get(scope, &fp) {
            debug!("[Tracker] Stats cache hit for {}", scope);
            return Ok(summary);
        }

        info!("[Tracker] Stats cache miss for {}, recomputing", scope);
        let summary = summarize_scoped(&records, scope, as_of, &self.route, &self.config);
        self.cache.insert(scope, fp, summary.clone());
        Ok(summary)
    }

    /// Record a day's steps from an ingestion client, using the configured
    /// goal. An existing higher count for the day is kept.
    pub fn record_steps(&mut self, date: NaiveDate, steps: u32) -> Result<DailyStepRecord> {
        let record = DailyStepRecord::with_default_goal(date, steps, &self.config)?;
        let stored = self.source.upsert_max(record)?;
        info!("[Tracker] Upserted steps: {} -> {}", stored.date, stored.steps);
        Ok(stored)
    }

    /// Store a record as-is, replacing any existing record for its date.
    pub fn replace_steps(&mut self, record: DailyStepRecord) -> Result<()> {
        self.source.upsert(record)
    }

    /// Records between `start` and `end` inclusive; fails if `start > end`.
    pub fn steps_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyStepRecord>> {
        let range = DateRange::new(start, end)?;
        self.source.steps_in_range(range)
    }

    /// Cumulative position on the route from every record up to `as_of`.
    pub fn position(&self, as_of: NaiveDate) -> Result<Position> {
        let steps: u64 = self
            .source
            .all_steps()?
            .iter()
            .filter(|r| r.date <= as_of)
            .map(|r| r.steps as u64)
            .sum();
        self.route.locate(self.config.steps_to_miles(steps))
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        self.route.list_waypoints()
    }

    pub fn route(&self) -> &RouteEngine {
        &self.route
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of memoized summaries.
    pub fn cached_summaries(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(feature = "persistence")]
impl Tracker<SqliteStepStore> {
    /// Like [`Tracker::stats`], but also consults the summary persisted in
    /// the store before recomputing, and writes fresh results back. A
    /// restarted process with unchanged step data skips the recomputation.
    pub fn stats_persisted(
        &mut self,
        scope: StatsScope,
        as_of: NaiveDate,
    ) -> Result<StatsSummary> {
        let records = self.source.all_steps()?;
        let fp = fingerprint(&records, as_of);

        if let Some(summary) = self.cache.get(scope, &fp) {
            debug!("[Tracker] Stats cache hit for {}", scope);
            return Ok(summary);
        }

        let summary = match self.source.load_cached_summary(scope, &fp)? {
            Some(summary) => {
                debug!("[Tracker] Persisted stats hit for {}", scope);
                summary
            }
            None => {
                info!("[Tracker] Stats cache miss for {}, recomputing", scope);
                let summary = summarize_scoped(&records, scope, as_of, &self.route, &self.config);
                self.source.store_cached_summary(scope, &fp, &summary)?;
                summary
            }
        };
        self.cache.insert(scope, fp, summary.clone());
        Ok(summary)
    }
}
