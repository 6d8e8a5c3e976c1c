//! Per-category counts for listing pages
//!
//! Pages that carry no single product (catalog and listing pages) are not
//! entities, but the crawl still records how many of them were seen per
//! category and how many items they advertised.

use std::collections::BTreeMap;

/// Counts for one classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateBucket {
    /// Number of distinct listing URLs recorded under this classification
    pub count: u64,

    /// Sum of the item counts those listings reported
    pub items: u64,
}

/// Accumulates listing counts keyed by classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateCounter {
    buckets: BTreeMap<String, AggregateBucket>,
}

impl AggregateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one listing page
    ///
    /// The crawl loop calls this once per distinct listing URL; the frontier's
    /// exactly-once processing guarantees a URL is never counted twice.
    pub fn record(&mut self, classification: &str, item_count: u64) {
        let bucket = self
            .buckets
            .entry(classification.to_string())
            .or_default();
        bucket.count += 1;
        bucket.items += item_count;
    }

    /// Inserts a bucket verbatim, replacing any existing one (used on restore)
    pub fn restore(&mut self, classification: String, bucket: AggregateBucket) {
        self.buckets.insert(classification, bucket);
    }

    pub fn get(&self, classification: &str) -> Option<&AggregateBucket> {
        self.buckets.get(classification)
    }

    /// Number of listing pages recorded for a classification (0 if unseen)
    pub fn count_of(&self, classification: &str) -> u64 {
        self.get(classification).map(|b| b.count).unwrap_or(0)
    }

    /// Iterates buckets in classification order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregateBucket)> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
