// src/analytics/mod.rs
//! Summary statistics over a harvest, for the end-of-run report.

use crate::model::{Bucket, Harvest, Record};
use std::collections::HashMap;

/// Buckets holding texts with a language and full-text content.
const TEXT_BUCKETS: [Bucket; 2] = [Bucket::Items, Bucket::References];
const LANGUAGE_FIELD: &str = "dcterms:language";
const UNKNOWN_LANGUAGE: &str = "unknown";

/// Headline numbers printed after a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestStats {
    pub total_records: usize,
    pub bucket_totals: Vec<(Bucket, usize)>,
    pub category_counts: Vec<(String, usize)>,
    /// Language of items and references, most frequent first.
    pub languages: Vec<(String, usize)>,
    /// Share of public records across all buckets, 0.0 when empty.
    pub public_share: f64,
    /// Words of full text (`bibo:content`) across items and references.
    pub total_words: usize,
    /// `total_words` per item or reference, 0.0 when there are none.
    pub average_words: f64,
    pub failed_categories: Vec<String>,
}

impl HarvestStats {
    pub fn top_languages(&self, n: usize) -> &[(String, usize)] {
        &self.languages[..n.min(self.languages.len())]
    }
}

pub fn measure_harvest(harvest: &Harvest) -> HarvestStats {
    let bucket_totals: Vec<(Bucket, usize)> = Bucket::ALL
        .iter()
        .map(|&bucket| (bucket, harvest.bucket(bucket).len()))
        .collect();
    let total_records = bucket_totals.iter().map(|(_, n)| n).sum();

    let public = Bucket::ALL
        .iter()
        .flat_map(|&bucket| harvest.bucket(bucket))
        .filter(|record| record.is_public())
        .count();

    let texts = TEXT_BUCKETS
        .iter()
        .map(|&bucket| harvest.bucket(bucket).len())
        .sum::<usize>();
    let total_words = TEXT_BUCKETS
        .iter()
        .flat_map(|&bucket| harvest.bucket(bucket))
        .map(Record::word_count)
        .sum::<usize>();

    HarvestStats {
        total_records,
        bucket_totals,
        category_counts: harvest
            .category_counts()
            .map(|(name, _, count)| (name.to_string(), count))
            .collect(),
        languages: language_distribution(harvest),
        public_share: if total_records > 0 {
            public as f64 / total_records as f64
        } else {
            0.0
        },
        total_words,
        average_words: if texts > 0 {
            total_words as f64 / texts as f64
        } else {
            0.0
        },
        failed_categories: harvest
            .failed_categories()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

fn language_distribution(harvest: &Harvest) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in TEXT_BUCKETS
        .iter()
        .flat_map(|&bucket| harvest.bucket(bucket))
    {
        let language = record
            .first_display_title(LANGUAGE_FIELD)
            .unwrap_or(UNKNOWN_LANGUAGE);
        *counts.entry(language).or_insert(0) += 1;
    }

    let mut languages: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(language, count)| (language.to_string(), count))
        .collect();
    languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    languages
}
