//! Statistics generation from a stored checkpoint
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the last saved snapshot.

use crate::crawler::CrawlState;
use crate::state::{AggregateBucket, UrlStatus};
use crate::storage::{SnapshotStore, StorageResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// When the snapshot was written, if it came from a store
    pub saved_at: Option<DateTime<Utc>>,

    pub config_hash: Option<String>,

    /// Total number of URLs known to the frontier
    pub total_urls: u64,

    /// Count of URLs by status
    pub urls_by_status: BTreeMap<UrlStatus, u64>,

    /// Processed URLs that yielded an entity
    pub pages_with_entity: u64,

    pub entities: u64,

    /// Entities with at least one related entity
    pub linked_entities: u64,

    /// Undirected outfit relations between known entities
    pub outfit_pairs: u64,

    /// Outfit URLs recorded on processed pages whose target is not yet processed
    pub pending_outfit_links: u64,

    /// Listing counts per classification
    pub buckets: Vec<(String, AggregateBucket)>,
}

impl CrawlStatistics {
    /// Computes statistics over in-memory crawl state
    pub fn from_state(state: &CrawlState) -> Self {
        let mut urls_by_status = BTreeMap::new();
        for status in UrlStatus::all_statuses() {
            let count = state.frontier.count(status) as u64;
            if count > 0 {
                urls_by_status.insert(status, count);
            }
        }

        let pages_with_entity = state
            .frontier
            .processed()
            .filter(|record| record.entity_id.is_some())
            .count() as u64;

        let pending_outfit_links = state
            .frontier
            .processed()
            .flat_map(|record| record.outfit_urls.iter())
            .filter(|url| state.frontier.status_of(url) != Some(UrlStatus::Processed))
            .count() as u64;

        let linked_entities = state
            .graph
            .entities()
            .filter(|entity| !entity.related_ids.is_empty())
            .count() as u64;

        Self {
            saved_at: None,
            config_hash: None,
            total_urls: state.frontier.len() as u64,
            urls_by_status,
            pages_with_entity,
            entities: state.graph.len() as u64,
            linked_entities,
            outfit_pairs: (state.graph.outfit_pairs().len() / 2) as u64,
            pending_outfit_links,
            buckets: state
                .aggregates
                .iter()
                .map(|(classification, bucket)| (classification.to_string(), *bucket))
                .collect(),
        }
    }

    pub fn count(&self, status: UrlStatus) -> u64 {
        self.urls_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from the stored snapshot
///
/// Statuses are reported as saved; interrupted URLs are not requeued.
///
/// # Returns
///
/// * `Ok(Some(CrawlStatistics))` - A checkpoint exists
/// * `Ok(None)` - The store is empty
/// * `Err(StorageError)` - The store could not be read
pub fn load_statistics(store: &dyn SnapshotStore) -> StorageResult<Option<CrawlStatistics>> {
    let snapshot = match store.load_snapshot()? {
        Some(snapshot) => snapshot,
        None => return Ok(None),
    };

    let state = CrawlState::from_snapshot(&snapshot, false);
    let mut stats = CrawlStatistics::from_state(&state);
    stats.saved_at = Some(snapshot.saved_at);
    stats.config_hash = snapshot.config_hash;

    Ok(Some(stats))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    if let Some(saved_at) = stats.saved_at {
        println!("Checkpoint saved at: {}", saved_at.to_rfc3339());
    }
    if let Some(hash) = &stats.config_hash {
        println!("Config hash: {}", hash);
    }
    println!();

    println!("URLs ({} total):", stats.total_urls);
    for (status, count) in &stats.urls_by_status {
        let percentage = if stats.total_urls > 0 {
            (*count as f64 / stats.total_urls as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Entities:");
    println!("  Extracted: {}", stats.entities);
    println!("  Pages with an entity: {}", stats.pages_with_entity);
    println!("  Linked to an outfit: {}", stats.linked_entities);
    println!("  Outfit pairs: {}", stats.outfit_pairs);
    println!("  Pending outfit links: {}", stats.pending_outfit_links);
    println!();

    if !stats.buckets.is_empty() {
        println!("Listings by Classification:");
        for (classification, bucket) in &stats.buckets {
            println!(
                "  {}: {} pages, {} items",
                classification, bucket.count, bucket.items
            );
        }
        println!();
    }

    let processed = stats.count(UrlStatus::Processed);
    let progress = if stats.total_urls > 0 {
        (processed as f64 / stats.total_urls as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Progress: {:.1}% ({} / {} URLs processed)",
        progress, processed, stats.total_urls
    );
}
