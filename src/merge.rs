//! Merge and deduplication of the two activity sources
//!
//! The bulk export seeds the set. API records then either match by id,
//! match by (date, distance to 0.1 km), or are inserted as new runs. On a
//! match only the heart rate is taken from the API, and only when present.

use std::collections::HashMap;

use crate::models::{ActivityRecord, FuzzyKey};

/// Counters describing what a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub export_records: usize,
    pub api_records: usize,
    /// Export rows folded into an earlier export row (same id or same key)
    pub export_duplicates: usize,
    pub id_matches: usize,
    pub fuzzy_matches: usize,
    /// Matches where the API heart rate replaced the stored value
    pub heart_rate_updates: usize,
    pub api_inserted: usize,
}

/// Canonical record set under construction
///
/// Records live in insertion order. `by_id` and `by_key` index into that
/// vector; a fuzzy key keeps the first record that claimed it.
#[derive(Debug, Default)]
pub struct ActivityMerger {
    records: Vec<ActivityRecord>,
    by_id: HashMap<String, usize>,
    by_key: HashMap<FuzzyKey, usize>,
    stats: MergeStats,
}

impl ActivityMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge both sources into one date-sorted record set
    pub fn merge(
        export: Vec<ActivityRecord>,
        api: Vec<ActivityRecord>,
    ) -> (Vec<ActivityRecord>, MergeStats) {
        let mut merger = Self::new();
        merger.seed_export(export);
        for record in api {
            merger.add_api_record(record);
        }
        merger.finish()
    }

    /// Seed with bulk-export records.
    ///
    /// A repeated id replaces the stored body in place. Records without an id
    /// are folded into an existing record with the same fuzzy key.
    pub fn seed_export(&mut self, export: Vec<ActivityRecord>) {
        for record in export {
            self.stats.export_records += 1;
            match record.id.clone() {
                Some(id) => match self.by_id.get(&id) {
                    Some(&slot) => {
                        self.stats.export_duplicates += 1;
                        self.records[slot] = record;
                    }
                    None => {
                        self.push(record);
                    }
                },
                None => {
                    if self.by_key.contains_key(&record.fuzzy_key()) {
                        self.stats.export_duplicates += 1;
                    } else {
                        self.push(record);
                    }
                }
            }
        }
        // Replaced bodies may carry a different date or distance
        self.rebuild_key_index();
    }

    /// Fold one API record into the set
    pub fn add_api_record(&mut self, record: ActivityRecord) {
        self.stats.api_records += 1;

        if let Some(slot) = record.id.as_ref().and_then(|id| self.by_id.get(id)).copied() {
            self.stats.id_matches += 1;
            self.take_heart_rate(slot, record.avg_heart_rate);
            return;
        }

        if let Some(&slot) = self.by_key.get(&record.fuzzy_key()) {
            self.stats.fuzzy_matches += 1;
            tracing::debug!(
                date = %record.date,
                km = %record.distance_km,
                "API activity matched an existing run by date and distance"
            );
            self.take_heart_rate(slot, record.avg_heart_rate);
            return;
        }

        self.stats.api_inserted += 1;
        self.push(record);
    }

    /// Sorted records plus merge counters
    pub fn finish(mut self) -> (Vec<ActivityRecord>, MergeStats) {
        // Stable sort keeps insertion order within a day
        self.records.sort_by_key(|r| r.date);
        tracing::info!(
            export = self.stats.export_records,
            api = self.stats.api_records,
            id_matches = self.stats.id_matches,
            fuzzy_matches = self.stats.fuzzy_matches,
            inserted = self.stats.api_inserted,
            total = self.records.len(),
            "Merged activity sources"
        );
        (self.records, self.stats)
    }

    fn push(&mut self, record: ActivityRecord) -> usize {
        let slot = self.records.len();
        if let Some(id) = &record.id {
            self.by_id.insert(id.clone(), slot);
        }
        self.by_key.entry(record.fuzzy_key()).or_insert(slot);
        self.records.push(record);
        slot
    }

    fn rebuild_key_index(&mut self) {
        self.by_key.clear();
        for (slot, record) in self.records.iter().enumerate() {
            self.by_key.entry(record.fuzzy_key()).or_insert(slot);
        }
    }

    fn take_heart_rate(&mut self, slot: usize, heart_rate: Option<f64>) {
        if let Some(hr) = heart_rate {
            self.records[slot].avg_heart_rate = Some(hr);
            self.stats.heart_rate_updates += 1;
        }
    }
}
