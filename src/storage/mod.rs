//! Storage module for persisting crawl checkpoints
//!
//! This module handles:
//! - The `Snapshot` bundle of URL records, entities, and aggregate buckets
//! - The `SnapshotStore` trait the checkpoint coordinator writes through
//! - A SQLite implementation of that trait

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{SnapshotStore, StorageError, StorageResult};

use crate::graph::Entity;
use crate::state::{AggregateBucket, UrlRecord};
use chrono::{DateTime, Utc};

/// One persisted item, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotRecord {
    Url(UrlRecord),
    Entity(Entity),
    Bucket {
        classification: String,
        bucket: AggregateBucket,
    },
}

/// A complete, independently loadable copy of the crawl state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,

    /// Hash of the configuration the crawl ran under
    pub config_hash: Option<String>,

    pub records: Vec<SnapshotRecord>,
}

impl Snapshot {
    pub fn new(config_hash: Option<String>) -> Self {
        Self {
            saved_at: Utc::now(),
            config_hash,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: SnapshotRecord) {
        self.records.push(record);
    }

    pub fn urls(&self) -> impl Iterator<Item = &UrlRecord> {
        self.records.iter().filter_map(|record| match record {
            SnapshotRecord::Url(url) => Some(url),
            _ => None,
        })
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.records.iter().filter_map(|record| match record {
            SnapshotRecord::Entity(entity) => Some(entity),
            _ => None,
        })
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &AggregateBucket)> {
        self.records.iter().filter_map(|record| match record {
            SnapshotRecord::Bucket {
                classification,
                bucket,
            } => Some((classification.as_str(), bucket)),
            _ => None,
        })
    }
}
