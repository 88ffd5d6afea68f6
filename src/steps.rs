//! Daily step record storage.
//!
//! [`StepSource`] is the seam between the statistics core and wherever step
//! data actually lives. [`StepLog`] is the in-memory implementation; the
//! SQLite-backed one lives in `persistence` behind the `persistence` feature.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;

use crate::error::Result;
use crate::{DailyStepRecord, DateRange};

/// Storage of one [`DailyStepRecord`] per calendar date.
pub trait StepSource {
    /// Records with `range.start <= date <= range.end`, oldest first.
    fn steps_in_range(&self, range: DateRange) -> Result<Vec<DailyStepRecord>>;

    /// Every record, oldest first.
    fn all_steps(&self) -> Result<Vec<DailyStepRecord>>;

    /// Insert a record, overwriting any existing record for the same date.
    fn upsert(&mut self, record: DailyStepRecord) -> Result<()>;

    /// Insert a record, but keep the existing step count for the date when
    /// it is higher. Returns the record as stored.
    fn upsert_max(&mut self, record: DailyStepRecord) -> Result<DailyStepRecord>;
}

/// In-memory step records keyed by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepLog {
    days: BTreeMap<NaiveDate, DailyStepRecord>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from records; later records replace earlier ones on the
    /// same date.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = DailyStepRecord>,
    {
        Self {
            days: records.into_iter().map(|r| (r.date, r)).collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyStepRecord> {
        self.days.get(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl StepSource for StepLog {
    fn steps_in_range(&self, range: DateRange) -> Result<Vec<DailyStepRecord>> {
        Ok(self
            .days
            .range(range.start..=range.end)
            .map(|(_, r)| *r)
            .collect())
    }

    fn all_steps(&self) -> Result<Vec<DailyStepRecord>> {
        Ok(self.days.values().copied().collect())
    }

    fn upsert(&mut self, record: DailyStepRecord) -> Result<()> {
        debug!("[StepLog] Upsert {} -> {}", record.date, record.steps);
        self.days.insert(record.date, record);
        Ok(())
    }

    fn upsert_max(&mut self, record: DailyStepRecord) -> Result<DailyStepRecord> {
        let stored = self
            .days
            .entry(record.date)
            .and_modify(|existing| {
                if record.steps > existing.steps {
                    existing.steps = record.steps;
                }
            })
            .or_insert(record);
        debug!("[StepLog] Upsert (max) {} -> {}", stored.date, stored.steps);
        Ok(*stored)
    }
}
