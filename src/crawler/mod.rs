//! Crawler module for frontier management and page processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier of known URLs and its priority order
//! - The page extractor contract and its HTML implementation
//! - HTTP fetching
//! - Checkpointing of crawl state
//! - Overall crawl coordination

mod checkpoint;
mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod parser;

pub use checkpoint::{Checkpointer, CrawlState};
pub use coordinator::{Coordinator, CrawlSummary};
pub use extractor::{EntityPage, ExtractError, ExtractionResult, PageExtractor};
pub use fetcher::{build_http_client, fetch_url, user_agent_string, FetchResult};
pub use frontier::{Frontier, QueuedUrl};
pub use parser::{parse_page, HtmlExtractor, PageSelectors};

use crate::config::Config;
use crate::storage::SqliteStore;
use crate::CrawlError;
use std::path::Path;

/// Runs a complete crawl against the configured SQLite checkpoint database
///
/// This is the main entry point used by the binary. It will:
/// 1. Open the checkpoint database
/// 2. Restore the last checkpoint (unless `fresh`) and seed the frontier
/// 3. Crawl with the HTML extractor until the frontier is exhausted
/// 4. Save a final checkpoint
///
/// # Example
///
/// ```no_run
/// use outfit_frontier::config::load_config_with_hash;
/// use outfit_frontier::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let summary = crawl(config, Some(hash), false).await?;
/// println!("{} entities", summary.entities_found);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: Config,
    config_hash: Option<String>,
    fresh: bool,
) -> Result<CrawlSummary, CrawlError> {
    let mut coordinator = open_coordinator(config, config_hash, fresh)?;
    coordinator.run().await
}

/// Builds a coordinator over the HTML extractor and the configured database
pub fn open_coordinator(
    config: Config,
    config_hash: Option<String>,
    fresh: bool,
) -> Result<Coordinator<HtmlExtractor, SqliteStore>, CrawlError> {
    let store = SqliteStore::new(Path::new(&config.output.database_path))?;
    let extractor = HtmlExtractor::new(&config)?;
    Coordinator::new(config, extractor, store, config_hash, fresh)
}
