//! # Summary Cache
//!
//! Memoizes [`StatsSummary`] values per [`StatsScope`]. Each entry remembers
//! the fingerprint of the inputs it was computed from and is only served back
//! for an identical fingerprint, so any change to the step records (or to the
//! `as_of` date) forces a recomputation.
//!
//! Eviction is least-recently-used with a linear scan; the cache holds one
//! entry per scope, so it stays tiny.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::stats::{StatsScope, StatsSummary};
use crate::DailyStepRecord;

/// Hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 16;

/// Fingerprint of the inputs that determine a summary.
///
/// Records are de-duplicated by date (last wins) and ordered before hashing,
/// and records after `as_of` are skipped, mirroring what the summary itself
/// looks at. Input order therefore does not matter.
pub fn fingerprint(records: &[DailyStepRecord], as_of: NaiveDate) -> String {
    let days: BTreeMap<NaiveDate, &DailyStepRecord> = records
        .iter()
        .filter(|r| r.date <= as_of)
        .map(|r| (r.date, r))
        .collect();

    let mut hasher = Sha256::new();
    for record in days.values() {
        hasher.update(format!("{}:{}:{},", record.date, record.steps, record.goal));
    }
    hasher.update(format!("|{}", as_of));

    let digest = hasher.finalize();
    let mut hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex.truncate(FINGERPRINT_LEN);
    hex
}

#[derive(Debug)]
struct CacheEntry {
    fingerprint: String,
    summary: StatsSummary,
    last_access: u64,
}

/// LRU cache of summaries keyed by scope and validated by fingerprint.
#[derive(Debug)]
pub struct SummaryCache {
    capacity: usize,
    entries: HashMap<StatsScope, CacheEntry>,
    access_counter: u64,
}

impl SummaryCache {
    /// Create a new cache with the given capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            access_counter: 0,
        }
    }

    /// Cached summary for `scope`, if it was computed from inputs with the
    /// same fingerprint. A stale entry is dropped.
    pub fn get(&mut self, scope: StatsScope, fingerprint: &str) -> Option<StatsSummary> {
        let fresh = match self.entries.get(&scope) {
            Some(entry) => entry.fingerprint == fingerprint,
            None => return None,
        };
        if !fresh {
            self.entries.remove(&scope);
            return None;
        }

        self.access_counter += 1;
        let counter = self.access_counter;
        self.entries.get_mut(&scope).map(|entry| {
            entry.last_access = counter;
            entry.summary.clone()
        })
    }

    /// Store a summary, evicting the least recently used scope if full.
    pub fn insert(&mut self, scope: StatsScope, fingerprint: String, summary: StatsSummary) {
        if !self.entries.contains_key(&scope) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        self.access_counter += 1;
        self.entries.insert(
            scope,
            CacheEntry {
                fingerprint,
                summary,
                last_access: self.access_counter,
            },
        );
    }

    /// Drop every entry (e.g. after a write to the step records).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_counter = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, scope: StatsScope) -> bool {
        self.entries.contains_key(&scope)
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(scope, _)| *scope);

        if let Some(scope) = oldest {
            self.entries.remove(&scope);
        }
    }
}

impl Default for SummaryCache {
    fn default() -> Self {
        Self::new(16)
    }
}
