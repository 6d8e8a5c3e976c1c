//! HTML page extractor
//!
//! This module turns a fetched retail page into an `ExtractionResult`:
//! - Product pages (id element present and carrying the id marker) become
//!   entities, with their "complete the outfit" links kept apart
//! - Pages with listing items become listings, counted per category
//! - Anything else is unextractable
//!
//! Every page also yields its outgoing links so the crawl can expand.

use crate::config::{Config, ExtractorConfig};
use crate::crawler::extractor::{EntityPage, ExtractError, ExtractionResult, PageExtractor};
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::graph::{join_description_lines, parse_description_attributes, parse_prices, Entity};
use crate::{ConfigError, CrawlError};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Compiled selectors for one site's page layout
#[derive(Debug, Clone)]
pub struct PageSelectors {
    entity_id: Selector,
    id_marker: String,
    name: Selector,
    price: Selector,
    color: Selector,
    description: Selector,
    related: Selector,
    images: Selector,
    listing_item: Selector,
    description_attributes: Vec<String>,
}

impl PageSelectors {
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            entity_id: compile("entity-id", &config.entity_id)?,
            id_marker: config.id_marker.clone(),
            name: compile("name", &config.name)?,
            price: compile("price", &config.price)?,
            color: compile("color", &config.color)?,
            description: compile("description", &config.description)?,
            related: compile("related", &config.related)?,
            images: compile("images", &config.images)?,
            listing_item: compile("listing-item", &config.listing_item)?,
            description_attributes: config.description_attributes.clone(),
        })
    }
}

fn compile(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field: field.to_string(),
        message: format!("{:?}", e),
    })
}

/// Default page extractor: fetches with reqwest, parses with scraper
pub struct HtmlExtractor {
    client: Client,
    selectors: PageSelectors,
}

impl HtmlExtractor {
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        Ok(Self {
            client: build_http_client(&config.user_agent)?,
            selectors: PageSelectors::from_config(&config.extractor)?,
        })
    }
}

impl PageExtractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let (final_url, body) = match fetch_url(&self.client, url).await {
            FetchResult::Success { final_url, body } => (final_url, body),
            FetchResult::ContentMismatch { content_type } => {
                tracing::debug!("Skipping {}: content type {}", url, content_type);
                return Ok(unextractable());
            }
            FetchResult::HttpError {
                status_code,
                transient: true,
            } => {
                return Err(ExtractError::Transient(format!("HTTP {}", status_code)));
            }
            FetchResult::HttpError { status_code, .. } => {
                tracing::debug!("Skipping {}: HTTP {}", url, status_code);
                return Ok(unextractable());
            }
            FetchResult::NetworkError { error } => {
                return Err(ExtractError::Transient(error));
            }
        };

        let base_url = match Url::parse(&final_url).or_else(|_| Url::parse(url)) {
            Ok(base_url) => base_url,
            Err(e) => {
                tracing::warn!("Cannot resolve links on {}: {}", url, e);
                return Ok(unextractable());
            }
        };

        Ok(parse_page(&body, url, &base_url, &self.selectors))
    }
}

fn unextractable() -> ExtractionResult {
    ExtractionResult::Unextractable {
        discovered_links: BTreeSet::new(),
    }
}

/// Classifies a page and extracts its fields and links
///
/// # Arguments
///
/// * `html` - The page body
/// * `page_url` - The URL the page was requested under (stored on the entity)
/// * `base_url` - The URL used to resolve relative links (after redirects)
/// * `selectors` - The site's compiled selectors
pub fn parse_page(
    html: &str,
    page_url: &str,
    base_url: &Url,
    selectors: &PageSelectors,
) -> ExtractionResult {
    let document = Html::parse_document(html);
    let mut discovered_links = extract_links(&document, base_url);

    let id_text = document
        .select(&selectors.entity_id)
        .next()
        .map(|element| element_text(&element));

    if let Some(id) = id_text {
        if id.contains(selectors.id_marker.as_str()) {
            let related_links = select_attr(&document, &selectors.related, "href", base_url);
            discovered_links.retain(|link| !related_links.contains(link));

            return ExtractionResult::Entity(EntityPage {
                entity: extract_entity(&document, id, page_url, base_url, selectors),
                related_links,
                discovered_links,
            });
        }

        tracing::warn!(
            "Id element on {} does not contain '{}': '{}'",
            page_url,
            selectors.id_marker,
            id
        );
        return ExtractionResult::Unextractable { discovered_links };
    }

    let item_count = document.select(&selectors.listing_item).count() as u64;
    if item_count > 0 {
        return ExtractionResult::Listing {
            classification: listing_classification(base_url),
            item_count,
            discovered_links,
        };
    }

    ExtractionResult::Unextractable { discovered_links }
}

fn extract_entity(
    document: &Html,
    id: String,
    page_url: &str,
    base_url: &Url,
    selectors: &PageSelectors,
) -> Entity {
    let mut entity = Entity::new(id, page_url);

    entity.name = first_text(document, &selectors.name).unwrap_or_default();
    entity.classification = entity_classification(base_url);
    entity.prices = first_text(document, &selectors.price)
        .map(|text| parse_prices(&text))
        .unwrap_or_default();
    entity.color = first_text(document, &selectors.color).and_then(|text| parse_color(&text));
    entity.description = document
        .select(&selectors.description)
        .next()
        .map(|element| join_description_lines(&element.text().collect::<String>()))
        .unwrap_or_default();
    entity.attributes =
        parse_description_attributes(&entity.description, &selectors.description_attributes);

    entity.image_urls = select_attr(document, &selectors.images, "src", base_url);
    if entity.image_urls.is_empty() {
        entity.image_urls = select_attr(document, &selectors.images, "data-src", base_url);
    }

    entity
}

/// Trimmed text of the first element matching `selector`, if non-empty
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element_text(&element))
        .filter(|text| !text.is_empty())
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Color blocks read "Color: Ecru"; bare values are taken as-is
fn parse_color(text: &str) -> Option<String> {
    let value = match text.split_once(':') {
        Some((_, value)) => value,
        None => text,
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Resolved values of `attr` on every element matching `selector`
fn select_attr(document: &Html, selector: &Selector, attr: &str, base_url: &Url) -> BTreeSet<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr(attr))
        .filter_map(|value| resolve_link(value, base_url))
        .collect()
}

/// Product URLs look like `/<category>/<product>`; the category is the
/// parent directory
fn entity_classification(url: &Url) -> String {
    let segments = path_segments(url);
    match segments.len() {
        0 | 1 => String::new(),
        n => segments[n - 2].to_string(),
    }
}

/// Listing URLs end in their category; a file extension is dropped
fn listing_classification(url: &Url) -> String {
    match path_segments(url).last() {
        Some(segment) => match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => segment.to_string(),
        },
        None => String::new(),
    }
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Extracts all followable links from the document
fn extract_links(document: &Html, base_url: &Url) -> BTreeSet<String> {
    let mut links = BTreeSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.insert(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.insert(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for `javascript:`, `mailto:`, `tel:` and `data:` links,
/// fragment-only links, and anything that does not resolve.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
