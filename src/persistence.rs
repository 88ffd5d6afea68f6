//! # SQLite Step Store
//!
//! Durable storage for daily step records plus a persisted summary cache.
//!
//! ## Tables
//!
//! 1. **`daily_steps`**: one row per calendar date (the date is the primary
//!    key, so writes are upserts)
//! 2. **`stats_cache`**: one row per scope holding the last computed summary
//!    (MessagePack blob) and the fingerprint of the inputs it came from

use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, TrackerError};
use crate::stats::{StatsScope, StatsSummary};
use crate::steps::StepSource;
use crate::{DailyStepRecord, DateRange};

/// Step records and cached summaries in SQLite.
pub struct SqliteStepStore {
    db: Connection,
}

impl SqliteStepStore {
    /// Open (or create) a store at the given database path.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        info!("[StepStore] Opened {}", db_path);
        Ok(Self { db })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS daily_steps (
                step_date TEXT PRIMARY KEY,
                steps INTEGER NOT NULL DEFAULT 0,
                goal INTEGER NOT NULL,
                created_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            CREATE TABLE IF NOT EXISTS stats_cache (
                scope TEXT PRIMARY KEY,
                data_hash TEXT NOT NULL,
                summary BLOB NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
        "#,
        )?;
        Ok(())
    }

    fn query_steps(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<DailyStepRecord>> {
        let mut stmt = self.db.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (date, steps, goal) = row?;
            records.push(record_from_row(&date, steps, goal)?);
        }
        Ok(records)
    }

    /// Last persisted summary for `scope`, if its fingerprint matches.
    ///
    /// Used by `Tracker::stats_persisted`.
    pub fn load_cached_summary(
        &self,
        scope: StatsScope,
        fingerprint: &str,
    ) -> Result<Option<StatsSummary>> {
        let row: Option<(String, Vec<u8>)> = self
            .db
            .query_row(
                "SELECT data_hash, summary FROM stats_cache WHERE scope = ?",
                params![scope.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((hash, blob)) if hash == fingerprint => {
                debug!("[StepStore] Stats cache hit for {}", scope);
                rmp_serde::from_slice(&blob)
                    .map(Some)
                    .map_err(|e| TrackerError::Persistence {
                        message: format!("corrupt cached summary for {}: {}", scope, e),
                    })
            }
            _ => Ok(None),
        }
    }

    /// Persist a summary for `scope` under the given input fingerprint.
    pub fn store_cached_summary(
        &self,
        scope: StatsScope,
        fingerprint: &str,
        summary: &StatsSummary,
    ) -> Result<()> {
        let blob = rmp_serde::to_vec(summary).map_err(|e| TrackerError::Persistence {
            message: format!("failed to encode summary for {}: {}", scope, e),
        })?;
        self.db.execute(
            "INSERT OR REPLACE INTO stats_cache (scope, data_hash, summary) VALUES (?, ?, ?)",
            params![scope.to_string(), fingerprint, blob],
        )?;
        Ok(())
    }

    /// Number of stored step records.
    pub fn record_count(&self) -> Result<u32> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM daily_steps", [], |row| row.get(0))?;
        Ok(count as u32)
    }
}

impl StepSource for SqliteStepStore {
    fn steps_in_range(&self, range: DateRange) -> Result<Vec<DailyStepRecord>> {
        self.query_steps(
            "SELECT step_date, steps, goal FROM daily_steps
             WHERE step_date >= ? AND step_date <= ?
             ORDER BY step_date",
            &[&range.start.to_string(), &range.end.to_string()],
        )
    }

    fn all_steps(&self) -> Result<Vec<DailyStepRecord>> {
        self.query_steps(
            "SELECT step_date, steps, goal FROM daily_steps ORDER BY step_date",
            &[],
        )
    }

    fn upsert(&mut self, record: DailyStepRecord) -> Result<()> {
        self.db.execute(
            "INSERT INTO daily_steps (step_date, steps, goal) VALUES (?, ?, ?)
             ON CONFLICT(step_date) DO UPDATE SET steps = excluded.steps, goal = excluded.goal",
            params![record.date.to_string(), record.steps, record.goal],
        )?;
        debug!("[StepStore] Upsert {} -> {}", record.date, record.steps);
        Ok(())
    }

    fn upsert_max(&mut self, record: DailyStepRecord) -> Result<DailyStepRecord> {
        let date = record.date.to_string();
        self.db.execute(
            "INSERT INTO daily_steps (step_date, steps, goal) VALUES (?, ?, ?)
             ON CONFLICT(step_date) DO UPDATE SET steps = MAX(steps, excluded.steps)",
            params![date, record.steps, record.goal],
        )?;

        let (steps, goal): (i64, i64) = self.db.query_row(
            "SELECT steps, goal FROM daily_steps WHERE step_date = ?",
            params![date],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        debug!("[StepStore] Upsert (max) {} -> {}", date, steps);
        record_from_row(&date, steps, goal)
    }
}

fn record_from_row(date: &str, steps: i64, goal: i64) -> Result<DailyStepRecord> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
        TrackerError::Persistence {
            message: format!("bad step_date '{}': {}", date, e),
        }
    })?;
    let steps = u32::try_from(steps).map_err(|_| TrackerError::Persistence {
        message: format!("step count {} out of range for {}", steps, date),
    })?;
    let goal = u32::try_from(goal).map_err(|_| TrackerError::Persistence {
        message: format!("goal {} out of range for {}", goal, date),
    })?;
    DailyStepRecord::new(date, steps, goal)
}
