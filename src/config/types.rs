use serde::Deserialize;

/// Main configuration structure for Outfit-Frontier
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub scope: Vec<ScopeEntry>,
    #[serde(default)]
    pub blacklist: Vec<PrefixEntry>,
}

/// Crawl loop and frontier tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of processed URLs between periodic checkpoints
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,

    /// Priority added to a parent's priority for links in the related-item section
    #[serde(
        rename = "related-priority-step",
        default = "default_related_priority_step"
    )]
    pub related_priority_step: u32,

    /// Priority added to a parent's priority for every other in-scope link
    #[serde(
        rename = "discovered-priority-step",
        default = "default_discovered_priority_step"
    )]
    pub discovered_priority_step: u32,

    /// Demote URLs left in Processing by a previous session back to New on load
    #[serde(rename = "requeue-interrupted", default = "default_requeue_interrupted")]
    pub requeue_interrupted: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            related_priority_step: default_related_priority_step(),
            discovered_priority_step: default_discovered_priority_step(),
            requeue_interrupted: default_requeue_interrupted(),
        }
    }
}

fn default_checkpoint_interval() -> u32 {
    25
}

fn default_related_priority_step() -> u32 {
    1
}

fn default_discovered_priority_step() -> u32 {
    100
}

fn default_requeue_interrupted() -> bool {
    true
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite checkpoint database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// CSS selectors the HTML extractor uses to recognise product and listing pages
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Element whose text carries the retailer's unique product id
    #[serde(rename = "entity-id")]
    pub entity_id: String,

    /// Text the id element must contain for the page to count as a product
    #[serde(rename = "id-marker", default)]
    pub id_marker: String,

    pub name: String,
    pub price: String,
    pub color: String,
    pub description: String,

    /// Anchors inside the "complete the outfit" section
    pub related: String,

    pub images: String,

    /// Items whose presence marks a catalog/listing page
    #[serde(rename = "listing-item")]
    pub listing_item: String,

    /// Attribute names looked up in the product description
    #[serde(rename = "description-attributes", default)]
    pub description_attributes: Vec<String>,
}

/// An allowed crawl prefix with the seed URLs that start inside it
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeEntry {
    /// Host (optionally "*." wildcarded) followed by a path prefix
    pub prefix: String,

    /// URLs placed in the frontier at priority 0
    pub seeds: Vec<String>,
}

/// A prefix whose URLs are never enqueued
#[derive(Debug, Clone, Deserialize)]
pub struct PrefixEntry {
    pub prefix: String,
}
