//! Cross-keyword deduplication.
//!
//! Two records describe the same publication when their identity keys match:
//! the DOI when one is present, otherwise the lower-cased trimmed title. The
//! first occurrence wins and keeps its keyword.
//!
//! Records without a DOI whose titles are empty or missing all share the key
//! `""` (or the lower-cased sentinel) and collapse into one.

use crate::record::{Record, NOT_AVAILABLE};
use std::collections::HashSet;
use tracing::warn;

/// Key used to detect the same publication across queries.
pub fn identity_key(record: &Record) -> String {
    if !record.doi.is_empty() && record.doi != NOT_AVAILABLE {
        record.doi.clone()
    } else {
        record.title.to_lowercase().trim().to_string()
    }
}

/// Result of a deduplication pass.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// First occurrences, in input order
    pub unique: Vec<Record>,
    /// Skipped later occurrences, in input order
    pub duplicates: Vec<Record>,
}

/// Stable first-seen filter over identity keys.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a record's key is offered.
    pub fn admit(&mut self, record: &Record) -> bool {
        self.seen.insert(identity_key(record))
    }

    /// Number of distinct keys seen so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Keep the first record per identity key.
pub fn dedupe<I>(records: I) -> DedupOutcome
where
    I: IntoIterator<Item = Record>,
{
    let mut filter = Deduplicator::new();
    let mut outcome = DedupOutcome::default();

    for record in records {
        if filter.admit(&record) {
            outcome.unique.push(record);
        } else {
            warn!(title = %record.title, keyword = %record.keyword, "Duplicate skipped");
            outcome.duplicates.push(record);
        }
    }

    outcome
}
