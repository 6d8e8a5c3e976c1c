//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Restoring state from the last checkpoint and seeding the frontier
//! - Pulling URLs in priority order and handing them to the extractor
//! - Scope-filtering and prioritizing discovered links
//! - Periodic and final checkpoints

use crate::config::Config;
use crate::crawler::checkpoint::{Checkpointer, CrawlState};
use crate::crawler::extractor::{ExtractionResult, PageExtractor};
use crate::state::UrlStatus;
use crate::storage::SnapshotStore;
use crate::url::{normalize_url, ScopePolicy};
use crate::CrawlError;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Counters for one crawl session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    /// URLs handed to the extractor this session
    pub pages_visited: u64,
    pub entities_found: u64,
    pub listings_recorded: u64,
    pub unextractable: u64,

    /// URLs left in Processing after a transient failure
    pub transient_failures: u64,

    /// New URLs added to the frontier
    pub urls_enqueued: u64,

    /// Links dropped by the scope policy
    pub links_out_of_scope: u64,

    pub checkpoints_saved: u64,
    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator<E, S> {
    config: Config,
    extractor: E,
    checkpointer: Checkpointer<S>,
    state: CrawlState,
    scope: ScopePolicy,
    summary: CrawlSummary,
}

impl<E: PageExtractor, S: SnapshotStore> Coordinator<E, S> {
    /// Creates a new coordinator instance
    ///
    /// Restores the last checkpoint (unless `fresh`) and adds every seed URL
    /// at priority 0. Seeds already known keep their status.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `extractor` - Turns URLs into extraction results
    /// * `store` - Where checkpoints are loaded from and saved to
    /// * `config_hash` - Hash stamped on every checkpoint
    /// * `fresh` - Ignore any stored checkpoint (the next save overwrites it)
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - The stored checkpoint could not be read, or a
    ///   seed URL is invalid
    pub fn new(
        config: Config,
        extractor: E,
        store: S,
        config_hash: Option<String>,
        fresh: bool,
    ) -> Result<Self, CrawlError> {
        let checkpointer =
            Checkpointer::new(store, config_hash, config.crawler.requeue_interrupted);

        let state = if fresh {
            tracing::info!("Starting fresh crawl, ignoring any stored checkpoint");
            CrawlState::new()
        } else {
            checkpointer.load()?
        };

        let scope = ScopePolicy::from_config(&config);

        let mut coordinator = Self {
            config,
            extractor,
            checkpointer,
            state,
            scope,
            summary: CrawlSummary::default(),
        };
        coordinator.seed()?;

        Ok(coordinator)
    }

    fn seed(&mut self) -> Result<(), CrawlError> {
        let mut seeded = 0;

        for entry in &self.config.scope {
            for seed in &entry.seeds {
                let url = normalize_url(seed)?;
                if self.state.frontier.add_if_absent(url.as_str(), 0) {
                    seeded += 1;
                }
            }
        }

        tracing::info!(
            "Frontier ready: {} seeds added, {} URLs waiting, {} processed",
            seeded,
            self.state.frontier.count(UrlStatus::New),
            self.state.frontier.count(UrlStatus::Processed)
        );
        Ok(())
    }

    /// Runs the crawl until the frontier is exhausted
    ///
    /// A checkpoint is attempted on every exit path. If the loop itself
    /// failed, a checkpoint failure is logged and the loop's error returned.
    pub async fn run(&mut self) -> Result<CrawlSummary, CrawlError> {
        let start_time = Instant::now();
        let result = self.crawl_loop(start_time).await;
        self.summary.elapsed = start_time.elapsed();

        match result {
            Ok(()) => {
                self.checkpoint()?;
                tracing::info!(
                    "Crawl completed: {} pages visited in {:?} ({} entities, {} listings)",
                    self.summary.pages_visited,
                    self.summary.elapsed,
                    self.summary.entities_found,
                    self.summary.listings_recorded
                );
                Ok(self.summary.clone())
            }
            Err(e) => {
                tracing::error!("Crawl aborted: {}", e);
                if let Err(save_error) = self.checkpoint() {
                    tracing::error!("Final checkpoint failed: {}", save_error);
                }
                Err(e)
            }
        }
    }

    async fn crawl_loop(&mut self, start_time: Instant) -> Result<(), CrawlError> {
        let interval = u64::from(self.config.crawler.checkpoint_interval.max(1));

        loop {
            let url = match self.state.frontier.next() {
                Some(url) => url,
                None => {
                    tracing::info!("Frontier is empty, crawl complete");
                    return Ok(());
                }
            };

            tracing::debug!("Processing URL: {}", url);
            self.process_url(&url).await?;
            self.summary.pages_visited += 1;

            if self.summary.pages_visited % interval == 0 {
                let rate = self.summary.pages_visited as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages visited, {} in frontier, {:.2} pages/sec",
                    self.summary.pages_visited,
                    self.state.frontier.count(UrlStatus::New),
                    rate
                );

                // A failed periodic checkpoint does not stop the crawl
                if let Err(e) = self.checkpoint() {
                    tracing::error!("Periodic checkpoint failed, continuing in memory: {}", e);
                }
            }
        }
    }

    /// Extracts one Processing URL and feeds the result back
    ///
    /// Related links are enqueued before generic ones, so a URL appearing in
    /// both keeps the related priority.
    async fn process_url(&mut self, url: &str) -> Result<(), CrawlError> {
        let parent_priority = self.state.frontier.priority_of(url).unwrap_or(0);
        let related_priority =
            parent_priority.saturating_add(self.config.crawler.related_priority_step);
        let discovered_priority =
            parent_priority.saturating_add(self.config.crawler.discovered_priority_step);

        let result = match self.extractor.extract(url).await {
            Ok(result) => result,
            Err(e) if e.is_transient() => {
                tracing::warn!("{} on {}, left in Processing", e, url);
                self.summary.transient_failures += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let outfit_urls = match &result {
            ExtractionResult::Entity(page) => {
                self.enqueue_links(&page.related_links, related_priority)
            }
            _ => BTreeSet::new(),
        };
        self.enqueue_links(result.discovered_links(), discovered_priority);

        match result {
            ExtractionResult::Entity(page) => {
                let entity_id = page.entity.id.clone();
                tracing::debug!(
                    "Entity {} on {} with {} outfit links",
                    entity_id,
                    url,
                    outfit_urls.len()
                );

                self.state.graph.record(page.entity);
                self.state
                    .frontier
                    .mark_processed(url, Some(entity_id), outfit_urls);
                self.summary.entities_found += 1;
            }
            ExtractionResult::Listing {
                classification,
                item_count,
                ..
            } => {
                tracing::debug!(
                    "Listing '{}' on {} with {} items",
                    classification,
                    url,
                    item_count
                );
                self.state.aggregates.record(&classification, item_count);
                self.state.frontier.mark_processed(url, None, BTreeSet::new());
                self.summary.listings_recorded += 1;
            }
            ExtractionResult::Unextractable { .. } => {
                tracing::warn!("No entity or listing found on {}", url);
                self.state.frontier.mark_processed(url, None, BTreeSet::new());
                self.summary.unextractable += 1;
            }
        }

        Ok(())
    }

    /// Normalizes and scope-filters links, adding the survivors at `priority`
    ///
    /// Returns every in-scope normalized link, whether or not it was new.
    fn enqueue_links(&mut self, links: &BTreeSet<String>, priority: u32) -> BTreeSet<String> {
        let mut in_scope = BTreeSet::new();

        for link in links {
            let normalized = match normalize_url(link) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Failed to normalize URL {}: {}", link, e);
                    continue;
                }
            };

            let classification = self.scope.classify(&normalized);
            if !classification.should_crawl() {
                tracing::debug!("Dropping {} ({:?})", normalized, classification);
                self.summary.links_out_of_scope += 1;
                continue;
            }

            if self.state.frontier.add_if_absent(normalized.as_str(), priority) {
                self.summary.urls_enqueued += 1;
            }
            in_scope.insert(normalized.to_string());
        }

        in_scope
    }

    /// Resolves deferred outfit links and saves the full state
    pub fn checkpoint(&mut self) -> Result<(), CrawlError> {
        let linked = self.checkpointer.save(&mut self.state)?;
        self.summary.checkpoints_saved += 1;

        if linked > 0 {
            tracing::info!("Checkpoint saved, {} outfit links resolved", linked);
        } else {
            tracing::debug!("Checkpoint saved");
        }
        Ok(())
    }

    /// Saves a final checkpoint after the loop was interrupted
    pub fn shutdown(&mut self) -> Result<(), CrawlError> {
        tracing::info!(
            "Interrupted after {} pages, saving checkpoint",
            self.summary.pages_visited
        );
        self.checkpoint()
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn summary(&self) -> &CrawlSummary {
        &self.summary
    }

    pub fn store(&self) -> &S {
        self.checkpointer.store()
    }

    /// Consumes the coordinator, returning its snapshot store
    pub fn into_store(self) -> S {
        self.checkpointer.into_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CrawlerConfig, ExtractorConfig, OutputConfig, PrefixEntry, ScopeEntry, UserAgentConfig,
    };
    use crate::crawler::{EntityPage, ExtractError};
    use crate::graph::Entity;
    use crate::storage::{Snapshot, SqliteStore, StorageError, StorageResult};
    use std::collections::HashMap;

    /// Extractor answering from a fixed table; unknown URLs are unextractable
    #[derive(Default)]
    struct TableExtractor {
        pages: HashMap<String, Result<ExtractionResult, ExtractError>>,
    }

    impl TableExtractor {
        fn page(mut self, url: &str, result: Result<ExtractionResult, ExtractError>) -> Self {
            self.pages.insert(url.to_string(), result);
            self
        }
    }

    impl PageExtractor for TableExtractor {
        async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
            self.pages.get(url).cloned().unwrap_or(Ok(ExtractionResult::Unextractable {
                discovered_links: BTreeSet::new(),
            }))
        }
    }

    /// Store that starts empty and rejects every save
    struct FullDiskStore;

    impl SnapshotStore for FullDiskStore {
        fn load_snapshot(&self) -> StorageResult<Option<Snapshot>> {
            Ok(None)
        }

        fn save_snapshot(&mut self, _snapshot: &Snapshot) -> StorageResult<()> {
            Err(StorageError::Corrupt("disk full".to_string()))
        }
    }

    fn create_test_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                checkpoint_interval: 2,
                ..CrawlerConfig::default()
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: ":memory:".to_string(),
            },
            extractor: ExtractorConfig {
                entity_id: ".ref".to_string(),
                id_marker: "REF".to_string(),
                name: "h1".to_string(),
                price: ".price".to_string(),
                color: ".color".to_string(),
                description: ".description".to_string(),
                related: "#outfit a".to_string(),
                images: "#gallery img".to_string(),
                listing_item: ".item".to_string(),
                description_attributes: vec![],
            },
            scope: vec![ScopeEntry {
                prefix: "shop.test/w".to_string(),
                seeds: vec!["https://shop.test/w/u1".to_string()],
            }],
            blacklist: vec![PrefixEntry {
                prefix: "shop.test/w/help".to_string(),
            }],
        }
    }

    fn links(urls: &[&str]) -> BTreeSet<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    fn entity_page(id: &str, url: &str, related: &[&str], discovered: &[&str]) -> ExtractionResult {
        ExtractionResult::Entity(EntityPage {
            entity: Entity::new(id, url),
            related_links: links(related),
            discovered_links: links(discovered),
        })
    }

    fn coordinator(
        extractor: TableExtractor,
    ) -> Coordinator<TableExtractor, SqliteStore> {
        Coordinator::new(
            create_test_config(),
            extractor,
            SqliteStore::new_in_memory().unwrap(),
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_seeds_added_at_priority_zero() {
        let coordinator = coordinator(TableExtractor::default());
        let frontier = &coordinator.state().frontier;
        assert_eq!(frontier.priority_of("https://shop.test/w/u1"), Some(0));
        assert_eq!(frontier.status_of("https://shop.test/w/u1"), Some(UrlStatus::New));
    }

    #[tokio::test]
    async fn test_links_filtered_and_prioritized() {
        let extractor = TableExtractor::default().page(
            "https://shop.test/w/u1",
            Ok(entity_page(
                "E1",
                "https://shop.test/w/u1",
                &["https://shop.test/w/u2#details", "https://other.test/w/x"],
                &[
                    "https://shop.test/w/u3?color=red",
                    "https://shop.test/w/help/returns",
                    "https://shop.test/w/u2",
                ],
            )),
        );
        let mut coordinator = coordinator(extractor);

        let url = coordinator.state.frontier.next().unwrap();
        coordinator.process_url(&url).await.unwrap();

        let frontier = &coordinator.state().frontier;
        assert_eq!(frontier.priority_of("https://shop.test/w/u2"), Some(1));
        assert_eq!(frontier.priority_of("https://shop.test/w/u3"), Some(100));
        assert!(!frontier.contains("https://other.test/w/x"));
        assert!(!frontier.contains("https://shop.test/w/help/returns"));

        let record = frontier.get("https://shop.test/w/u1").unwrap();
        assert_eq!(record.status, UrlStatus::Processed);
        assert_eq!(record.entity_id.as_deref(), Some("E1"));
        assert_eq!(record.outfit_urls, links(&["https://shop.test/w/u2"]));

        assert_eq!(coordinator.summary().links_out_of_scope, 2);
        assert_eq!(coordinator.summary().urls_enqueued, 2);
    }

    #[tokio::test]
    async fn test_listing_counted_once() {
        let extractor = TableExtractor::default().page(
            "https://shop.test/w/u1",
            Ok(ExtractionResult::Listing {
                classification: "skirts".to_string(),
                item_count: 12,
                discovered_links: links(&["https://shop.test/w/u1", "https://shop.test/w/a"]),
            }),
        );
        let mut coordinator = coordinator(extractor);
        let summary = coordinator.run().await.unwrap();

        // u1 links back to itself; it must not be counted again
        assert_eq!(coordinator.state().aggregates.count_of("skirts"), 1);
        assert_eq!(summary.listings_recorded, 1);
        assert_eq!(summary.unextractable, 1);
        assert_eq!(summary.pages_visited, 2);
    }

    #[tokio::test]
    async fn test_fatal_error_still_checkpoints() {
        let extractor = TableExtractor::default().page(
            "https://shop.test/w/u1",
            Err(ExtractError::Fatal("renderer crashed".to_string())),
        );
        let mut coordinator = coordinator(extractor);

        let result = coordinator.run().await;
        assert!(matches!(result, Err(CrawlError::Extraction(ExtractError::Fatal(_)))));

        let snapshot = coordinator.store().load_snapshot().unwrap().unwrap();
        let saved = snapshot.urls().next().unwrap();
        assert_eq!(saved.status, UrlStatus::Processing);
    }

    #[tokio::test]
    async fn test_periodic_checkpoints() {
        let extractor = TableExtractor::default().page(
            "https://shop.test/w/u1",
            Ok(ExtractionResult::Unextractable {
                discovered_links: links(&[
                    "https://shop.test/w/a",
                    "https://shop.test/w/b",
                    "https://shop.test/w/c",
                ]),
            }),
        );
        let mut coordinator = coordinator(extractor);
        let summary = coordinator.run().await.unwrap();

        // Four pages with an interval of two: two periodic saves plus the final one
        assert_eq!(summary.pages_visited, 4);
        assert_eq!(summary.checkpoints_saved, 3);
    }

    fn four_page_extractor() -> TableExtractor {
        TableExtractor::default().page(
            "https://shop.test/w/u1",
            Ok(ExtractionResult::Unextractable {
                discovered_links: links(&[
                    "https://shop.test/w/a",
                    "https://shop.test/w/b",
                    "https://shop.test/w/c",
                ]),
            }),
        )
    }

    #[tokio::test]
    async fn test_failed_checkpoints_continue_in_memory() {
        let mut config = create_test_config();
        config.crawler.checkpoint_interval = 1;
        let mut coordinator =
            Coordinator::new(config, four_page_extractor(), FullDiskStore, None, false).unwrap();

        let result = coordinator.run().await;

        // Every periodic save failed, yet the crawl reached the end
        assert_eq!(coordinator.summary().pages_visited, 4);
        assert_eq!(coordinator.summary().checkpoints_saved, 0);
        assert_eq!(coordinator.state().frontier.count(UrlStatus::Processed), 4);
        // The final save failure is what the caller sees
        assert!(matches!(
            result,
            Err(CrawlError::Storage(StorageError::Corrupt(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_final_checkpoint_keeps_extractor_error() {
        let extractor = TableExtractor::default().page(
            "https://shop.test/w/u1",
            Err(ExtractError::Fatal("boom".to_string())),
        );
        let mut coordinator =
            Coordinator::new(create_test_config(), extractor, FullDiskStore, None, false).unwrap();

        let result = coordinator.run().await;

        assert!(matches!(
            result,
            Err(CrawlError::Extraction(ExtractError::Fatal(ref reason))) if reason == "boom"
        ));
    }

    #[tokio::test]
    async fn test_transient_failure_left_in_processing() {
        let extractor = TableExtractor::default().page(
            "https://shop.test/w/u1",
            Err(ExtractError::Transient("503".to_string())),
        );
        let mut coordinator = coordinator(extractor);
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.transient_failures, 1);
        assert_eq!(
            coordinator.state().frontier.status_of("https://shop.test/w/u1"),
            Some(UrlStatus::Processing)
        );
    }
}
