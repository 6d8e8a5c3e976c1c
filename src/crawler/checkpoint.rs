//! Checkpointing of the in-memory crawl state
//!
//! `CrawlState` bundles the three stateful components. `Checkpointer` moves
//! it in and out of a `SnapshotStore`; it holds no crawl state of its own.

use crate::crawler::Frontier;
use crate::graph::EntityGraph;
use crate::state::AggregateCounter;
use crate::storage::{Snapshot, SnapshotRecord, SnapshotStore, StorageResult};

/// Frontier, entity graph, and aggregate counter of one crawl
#[derive(Debug, Default)]
pub struct CrawlState {
    pub frontier: Frontier,
    pub graph: EntityGraph,
    pub aggregates: AggregateCounter,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the state from a snapshot
    ///
    /// The frontier's heap is rebuilt over the restored New set. With
    /// `requeue_interrupted`, URLs saved while Processing go back to New.
    pub fn from_snapshot(snapshot: &Snapshot, requeue_interrupted: bool) -> Self {
        let frontier = Frontier::restore(snapshot.urls().cloned(), requeue_interrupted);

        let mut graph = EntityGraph::new();
        for entity in snapshot.entities() {
            graph.restore(entity.clone());
        }

        let mut aggregates = AggregateCounter::new();
        for (classification, bucket) in snapshot.buckets() {
            aggregates.restore(classification.to_string(), *bucket);
        }

        Self {
            frontier,
            graph,
            aggregates,
        }
    }

    /// Copies the full state into a snapshot, records sorted by key
    pub fn to_snapshot(&self, config_hash: Option<String>) -> Snapshot {
        let mut snapshot = Snapshot::new(config_hash);

        let mut urls: Vec<_> = self.frontier.records().collect();
        urls.sort_by(|a, b| a.url.cmp(&b.url));
        for record in urls {
            snapshot.push(SnapshotRecord::Url(record.clone()));
        }

        let mut entities: Vec<_> = self.graph.entities().collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        for entity in entities {
            snapshot.push(SnapshotRecord::Entity(entity.clone()));
        }

        for (classification, bucket) in self.aggregates.iter() {
            snapshot.push(SnapshotRecord::Bucket {
                classification: classification.to_string(),
                bucket: *bucket,
            });
        }

        snapshot
    }
}

/// Loads and saves `CrawlState` through a snapshot store
pub struct Checkpointer<S> {
    store: S,
    config_hash: Option<String>,
    requeue_interrupted: bool,
}

impl<S: SnapshotStore> Checkpointer<S> {
    /// # Arguments
    ///
    /// * `store` - The snapshot backend
    /// * `config_hash` - Hash of the running configuration, stamped on saves
    /// * `requeue_interrupted` - Demote Processing URLs to New on load
    pub fn new(store: S, config_hash: Option<String>, requeue_interrupted: bool) -> Self {
        Self {
            store,
            config_hash,
            requeue_interrupted,
        }
    }

    /// Restores the last saved state, or an empty one if nothing was saved
    ///
    /// A store that exists but cannot be read is an error: starting empty
    /// would silently discard resumable progress.
    pub fn load(&self) -> StorageResult<CrawlState> {
        let snapshot = match self.store.load_snapshot()? {
            Some(snapshot) => snapshot,
            None => {
                tracing::info!("No checkpoint found, starting with empty state");
                return Ok(CrawlState::new());
            }
        };

        if let (Some(saved), Some(current)) = (&snapshot.config_hash, &self.config_hash) {
            if saved != current {
                tracing::warn!(
                    "Checkpoint was saved under a different configuration (hash {} vs {})",
                    saved,
                    current
                );
            }
        }

        let state = CrawlState::from_snapshot(&snapshot, self.requeue_interrupted);

        tracing::info!(
            "Loaded checkpoint from {}: {} URLs, {} entities, {} buckets",
            snapshot.saved_at.to_rfc3339(),
            state.frontier.len(),
            state.graph.len(),
            state.aggregates.len()
        );

        Ok(state)
    }

    /// Resolves deferred outfit links, then writes the full state
    ///
    /// Returns the number of links resolved by this checkpoint.
    pub fn save(&mut self, state: &mut CrawlState) -> StorageResult<usize> {
        let linked = state.graph.resolve_deferred_links(&state.frontier);

        let snapshot = state.to_snapshot(self.config_hash.clone());
        self.store.save_snapshot(&snapshot)?;

        tracing::debug!(
            "Checkpoint saved: {} URLs, {} entities",
            state.frontier.len(),
            state.graph.len()
        );

        Ok(linked)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
