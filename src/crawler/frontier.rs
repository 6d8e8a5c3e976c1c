//! Frontier of known URLs
//!
//! This module handles:
//! - The New/Processing/Processed partition of every known URL
//! - Priority-ordered retrieval over the New set
//! - Lazy removal: heap entries are validated against live status on pop
//!
//! The frontier is policy-free. Scope filtering and priority assignment are
//! the crawl loop's job.

use crate::state::{UrlRecord, UrlStatus};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// A heap entry pointing at a URL in the New set
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    /// The normalized URL
    pub url: String,

    /// Priority value at the time of queueing (lower is higher priority)
    pub priority: u32,
}

// Lower priority values pop first from the max-heap; ties go to the
// lexicographically smaller URL.
impl Ord for QueuedUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.url.cmp(&self.url))
    }
}

impl PartialOrd for QueuedUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.url == other.url
    }
}

impl Eq for QueuedUrl {}

/// Frontier owns every URL record and its status transitions
///
/// Each record lives in exactly one of the three maps, matching its status.
/// The heap may hold stale entries (URLs no longer New); they are discarded
/// when they reach the top.
#[derive(Debug, Default)]
pub struct Frontier {
    new: HashMap<String, UrlRecord>,
    processing: HashMap<String, UrlRecord>,
    processed: HashMap<String, UrlRecord>,
    queue: BinaryHeap<QueuedUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a frontier from persisted records
    ///
    /// The heap is rebuilt from the restored New set. With
    /// `requeue_interrupted`, records stuck in Processing by an earlier
    /// session are demoted to New so they get another visit.
    pub fn restore(records: impl IntoIterator<Item = UrlRecord>, requeue_interrupted: bool) -> Self {
        let mut frontier = Self::new();
        let mut requeued = 0usize;

        for mut record in records {
            if frontier.contains(&record.url) {
                tracing::warn!("Duplicate record for {} in snapshot, keeping first", record.url);
                continue;
            }

            if requeue_interrupted && record.status == UrlStatus::Processing {
                record.status = UrlStatus::New;
                requeued += 1;
            }

            match record.status {
                UrlStatus::New => {
                    frontier.queue.push(QueuedUrl {
                        url: record.url.clone(),
                        priority: record.priority,
                    });
                    frontier.new.insert(record.url.clone(), record);
                }
                UrlStatus::Processing => {
                    frontier.processing.insert(record.url.clone(), record);
                }
                UrlStatus::Processed => {
                    frontier.processed.insert(record.url.clone(), record);
                }
            }
        }

        if requeued > 0 {
            tracing::info!(
                "Requeued {} URLs interrupted during a previous session",
                requeued
            );
        }

        frontier
    }

    /// Adds a URL with the given priority unless it is already known
    ///
    /// Returns true if the URL was inserted. A known URL keeps its status and
    /// its first priority.
    pub fn add_if_absent(&mut self, url: &str, priority: u32) -> bool {
        if self.contains(url) {
            return false;
        }

        self.new
            .insert(url.to_string(), UrlRecord::new(url, priority));
        self.queue.push(QueuedUrl {
            url: url.to_string(),
            priority,
        });
        true
    }

    /// Removes the minimum-priority New URL and moves it to Processing
    ///
    /// Returns None once the New set is exhausted.
    pub fn next(&mut self) -> Option<String> {
        while let Some(queued) = self.queue.pop() {
            let live = matches!(
                self.new.get(&queued.url),
                Some(record) if record.priority == queued.priority
            );

            if !live {
                tracing::trace!("Discarding stale frontier entry {}", queued.url);
                continue;
            }

            if let Some(mut record) = self.new.remove(&queued.url) {
                debug_assert!(record.status.can_transition_to(UrlStatus::Processing));
                record.status = UrlStatus::Processing;
                self.processing.insert(queued.url.clone(), record);
                return Some(queued.url);
            }
        }

        None
    }

    /// Moves a Processing URL to Processed, stamping its extraction results
    ///
    /// Returns false (and changes nothing) if the URL is not in Processing.
    pub fn mark_processed(
        &mut self,
        url: &str,
        entity_id: Option<String>,
        outfit_urls: BTreeSet<String>,
    ) -> bool {
        let mut record = match self.processing.remove(url) {
            Some(record) => record,
            None => {
                tracing::debug!("mark_processed ignored for {}: not in Processing", url);
                return false;
            }
        };

        debug_assert!(record.status.can_transition_to(UrlStatus::Processed));
        record.status = UrlStatus::Processed;
        record.entity_id = entity_id;
        record.outfit_urls = outfit_urls;
        self.processed.insert(url.to_string(), record);
        true
    }

    /// Priority of a known URL regardless of its status
    pub fn priority_of(&self, url: &str) -> Option<u32> {
        self.get(url).map(|record| record.priority)
    }

    /// Status of a known URL
    pub fn status_of(&self, url: &str) -> Option<UrlStatus> {
        self.get(url).map(|record| record.status)
    }

    /// Looks a record up in whichever collection holds it
    pub fn get(&self, url: &str) -> Option<&UrlRecord> {
        self.new
            .get(url)
            .or_else(|| self.processing.get(url))
            .or_else(|| self.processed.get(url))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.new.contains_key(url)
            || self.processing.contains_key(url)
            || self.processed.contains_key(url)
    }

    /// Processed records, for deferred link resolution
    pub fn processed(&self) -> impl Iterator<Item = &UrlRecord> {
        self.processed.values()
    }

    /// Every record across all three collections
    pub fn records(&self) -> impl Iterator<Item = &UrlRecord> {
        self.new
            .values()
            .chain(self.processing.values())
            .chain(self.processed.values())
    }

    /// Number of records with the given status
    pub fn count(&self, status: UrlStatus) -> usize {
        match status {
            UrlStatus::New => self.new.len(),
            UrlStatus::Processing => self.processing.len(),
            UrlStatus::Processed => self.processed.len(),
        }
    }

    /// Total number of known URLs
    pub fn len(&self) -> usize {
        self.new.len() + self.processing.len() + self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if no URL is waiting in New
    pub fn is_exhausted(&self) -> bool {
        self.new.is_empty()
    }
}
