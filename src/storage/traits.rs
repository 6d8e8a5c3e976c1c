//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::storage::Snapshot;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backends
///
/// Implementations must make `save_snapshot` atomic: after a failed or
/// interrupted save, `load_snapshot` returns the previous snapshot intact.
pub trait SnapshotStore {
    /// Loads the stored snapshot
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Snapshot))` - A previous session was checkpointed
    /// * `Ok(None)` - The store is empty (fresh crawl)
    /// * `Err(StorageError)` - The store exists but could not be read
    fn load_snapshot(&self) -> StorageResult<Option<Snapshot>>;

    /// Replaces the stored snapshot
    fn save_snapshot(&mut self, snapshot: &Snapshot) -> StorageResult<()>;
}
