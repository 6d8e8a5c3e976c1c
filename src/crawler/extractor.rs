//! Page extractor contract
//!
//! The crawl loop never looks at page content itself. It hands each URL to a
//! `PageExtractor` and acts on the shape of the result.

use crate::graph::Entity;
use std::collections::BTreeSet;
use thiserror::Error;

/// A product page: the entity plus the links found on it
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPage {
    pub entity: Entity,

    /// Absolute URLs from the "complete the outfit" section
    pub related_links: BTreeSet<String>,

    /// Every other absolute URL on the page
    pub discovered_links: BTreeSet<String>,
}

/// What a page turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// A product/detail page
    Entity(EntityPage),

    /// A catalog or listing page with no single entity
    Listing {
        classification: String,
        item_count: u64,
        discovered_links: BTreeSet<String>,
    },

    /// The page matched neither shape
    Unextractable { discovered_links: BTreeSet<String> },
}

impl ExtractionResult {
    /// Links the crawl loop should enqueue at the generic priority step
    pub fn discovered_links(&self) -> &BTreeSet<String> {
        match self {
            ExtractionResult::Entity(page) => &page.discovered_links,
            ExtractionResult::Listing {
                discovered_links, ..
            } => discovered_links,
            ExtractionResult::Unextractable { discovered_links } => discovered_links,
        }
    }
}

/// Extraction failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The page could not be loaded right now; the URL stays in Processing
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    /// The extractor cannot continue; the crawl stops
    #[error("Fatal extractor failure: {0}")]
    Fatal(String),
}

impl ExtractError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::Transient(_))
    }
}

/// Turns a URL into an extraction result
#[allow(async_fn_in_trait)]
pub trait PageExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError>;
}
