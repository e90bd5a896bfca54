// src/model/harvest.rs
//! The result of one bulk collection run.

use super::Record;
use crate::error::FetchError;
use crate::types::RecordId;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// The four places harvested records end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Items,
    ItemSets,
    Media,
    References,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Items,
        Bucket::ItemSets,
        Bucket::Media,
        Bucket::References,
    ];

    /// File-friendly name, also the export file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Items => "items",
            Bucket::ItemSets => "item_sets",
            Bucket::Media => "media",
            Bucket::References => "references",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct BucketStore {
    records: Vec<Record>,
    by_id: HashMap<RecordId, usize>,
}

impl BucketStore {
    /// Stores the record unless its id is already present; returns its slot.
    fn insert(&mut self, record: Record) -> usize {
        if let Some(id) = record.id() {
            if let Some(&slot) = self.by_id.get(&id) {
                return slot;
            }
            self.by_id.insert(id, self.records.len());
        }
        self.records.push(record);
        self.records.len() - 1
    }

    fn get(&self, id: RecordId) -> Option<&Record> {
        self.by_id.get(&id).map(|&slot| &self.records[slot])
    }
}

#[derive(Debug, Clone)]
struct CategorySlice {
    bucket: Bucket,
    slots: Vec<usize>,
}

/// Buckets of deduplicated records plus the per-category bookkeeping.
///
/// Records are deduplicated by `o:id` within a bucket: when two categories
/// return the same item, the bucket stores it once and both categories
/// point at that one copy.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    buckets: HashMap<Bucket, BucketStore>,
    categories: IndexMap<String, CategorySlice>,
    failures: Vec<FetchError>,
}

impl Harvest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one category's records to its bucket.
    pub fn absorb(&mut self, category: &str, bucket: Bucket, records: Vec<Record>) {
        let store = self.buckets.entry(bucket).or_default();
        let slots = records.into_iter().map(|r| store.insert(r)).collect();
        self.categories
            .insert(category.to_string(), CategorySlice { bucket, slots });
    }

    pub fn record_failure(&mut self, failure: FetchError) {
        self.failures.push(failure);
    }

    pub fn bucket(&self, bucket: Bucket) -> &[Record] {
        self.buckets
            .get(&bucket)
            .map(|store| store.records.as_slice())
            .unwrap_or_default()
    }

    /// Records fetched by one category, in page order.
    pub fn category(&self, name: &str) -> Vec<&Record> {
        self.categories
            .get(name)
            .map(|slice| {
                let records = self.bucket(slice.bucket);
                slice.slots.iter().map(|&slot| &records[slot]).collect()
            })
            .unwrap_or_default()
    }

    /// `(category, bucket, record count)` in catalogue order.
    pub fn category_counts(&self) -> impl Iterator<Item = (&str, Bucket, usize)> {
        self.categories
            .iter()
            .map(|(name, slice)| (name.as_str(), slice.bucket, slice.slots.len()))
    }

    pub fn failures(&self) -> &[FetchError] {
        &self.failures
    }

    pub fn failed_categories(&self) -> Vec<&str> {
        self.failures.iter().filter_map(FetchError::category).collect()
    }

    pub fn total_records(&self) -> usize {
        self.buckets.values().map(|store| store.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }

    pub fn item_set(&self, id: RecordId) -> Option<&Record> {
        self.buckets.get(&Bucket::ItemSets)?.get(id)
    }

    pub fn media(&self, id: RecordId) -> Option<&Record> {
        self.buckets.get(&Bucket::Media)?.get(id)
    }

    /// Harvested item sets the record belongs to; unknown ids are skipped.
    pub fn item_sets_of(&self, record: &Record) -> Vec<&Record> {
        record
            .item_set_ids()
            .into_iter()
            .filter_map(|id| self.item_set(id))
            .collect()
    }

    /// Harvested media attached to the record; unknown ids are skipped.
    pub fn media_of(&self, record: &Record) -> Vec<&Record> {
        record
            .media_ids()
            .into_iter()
            .filter_map(|id| self.media(id))
            .collect()
    }
}
