//! Integration tests for the crawler
//!
//! Most tests drive the crawl loop with a table-backed extractor so the
//! frontier, graph, and checkpoint behavior can be checked exactly. The last
//! test uses wiremock to run the HTML extractor end-to-end.

use outfit_frontier::config::{
    Config, CrawlerConfig, ExtractorConfig, OutputConfig, PrefixEntry, ScopeEntry,
    UserAgentConfig,
};
use outfit_frontier::crawler::{
    Checkpointer, Coordinator, CrawlState, EntityPage, ExtractError, ExtractionResult,
    HtmlExtractor, PageExtractor,
};
use outfit_frontier::graph::Entity;
use outfit_frontier::state::UrlStatus;
use outfit_frontier::storage::SqliteStore;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::rc::Rc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const U1: &str = "https://shop.test/w/u1";
const U2: &str = "https://shop.test/w/u2";
const U3: &str = "https://shop.test/w/u3";
const U4: &str = "https://shop.test/w/u4";

/// Extractor answering from a fixed table and logging every call
///
/// URLs missing from the table are unextractable.
#[derive(Default)]
struct TableExtractor {
    pages: HashMap<String, Result<ExtractionResult, ExtractError>>,
    visits: Rc<RefCell<Vec<String>>>,
}

impl TableExtractor {
    fn new() -> Self {
        Self::default()
    }

    fn entity(mut self, url: &str, id: &str, related: &[&str], discovered: &[&str]) -> Self {
        let page = ExtractionResult::Entity(EntityPage {
            entity: Entity::new(id, url),
            related_links: links(related),
            discovered_links: links(discovered),
        });
        self.pages.insert(url.to_string(), Ok(page));
        self
    }

    fn failure(mut self, url: &str, error: ExtractError) -> Self {
        self.pages.insert(url.to_string(), Err(error));
        self
    }

    fn visit_log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.visits)
    }
}

impl PageExtractor for TableExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        self.visits.borrow_mut().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .unwrap_or(Ok(ExtractionResult::Unextractable {
                discovered_links: BTreeSet::new(),
            }))
    }
}

fn links(urls: &[&str]) -> BTreeSet<String> {
    urls.iter().map(|s| s.to_string()).collect()
}

fn create_test_config(scope_prefix: &str, seeds: Vec<String>, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            checkpoint_interval: 25,
            related_priority_step: 1,
            discovered_priority_step: 100,
            requeue_interrupted: true,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        extractor: ExtractorConfig {
            entity_id: "#product .ref".to_string(),
            id_marker: "REF".to_string(),
            name: "#product h1".to_string(),
            price: "#product .price".to_string(),
            color: "#product .color".to_string(),
            description: "#product .description".to_string(),
            related: "#outfit a".to_string(),
            images: "#gallery img".to_string(),
            listing_item: ".grid .item".to_string(),
            description_attributes: vec!["fabric".to_string(), "sleeve".to_string()],
        },
        scope: vec![ScopeEntry {
            prefix: scope_prefix.to_string(),
            seeds,
        }],
        blacklist: vec![PrefixEntry {
            prefix: format!("{}/help", scope_prefix),
        }],
    }
}

fn shop_config(db_path: &str) -> Config {
    create_test_config("shop.test/w", vec![U1.to_string()], db_path)
}

fn memory_coordinator(extractor: TableExtractor) -> Coordinator<TableExtractor, SqliteStore> {
    Coordinator::new(
        shop_config(":memory:"),
        extractor,
        SqliteStore::new_in_memory().expect("Failed to open in-memory store"),
        None,
        false,
    )
    .expect("Failed to create coordinator")
}

fn file_coordinator(
    db_path: &Path,
    extractor: TableExtractor,
    requeue_interrupted: bool,
) -> Coordinator<TableExtractor, SqliteStore> {
    let mut config = shop_config(&db_path.to_string_lossy());
    config.crawler.requeue_interrupted = requeue_interrupted;

    Coordinator::new(
        config,
        extractor,
        SqliteStore::new(db_path).expect("Failed to open store"),
        Some("test-hash".to_string()),
        false,
    )
    .expect("Failed to create coordinator")
}

fn related_ids(state: &CrawlState, id: &str) -> Vec<String> {
    state
        .graph
        .get(id)
        .map(|entity| entity.related_ids.iter().cloned().collect())
        .unwrap_or_default()
}

/// (url, priority, status, entity id, outfit urls), sorted by url
fn observable_frontier(
    state: &CrawlState,
) -> Vec<(String, u32, UrlStatus, Option<String>, BTreeSet<String>)> {
    let mut records: Vec<_> = state
        .frontier
        .records()
        .map(|r| {
            (
                r.url.clone(),
                r.priority,
                r.status,
                r.entity_id.clone(),
                r.outfit_urls.clone(),
            )
        })
        .collect();
    records.sort();
    records
}

#[tokio::test]
async fn test_related_links_served_before_discovered() {
    let extractor = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[U3])
        .entity(U2, "E2", &[], &[]);
    let visits = extractor.visit_log();

    let mut coordinator = memory_coordinator(extractor);
    let summary = coordinator.run().await.expect("Crawl failed");

    let frontier = &coordinator.state().frontier;
    let u1 = frontier.get(U1).expect("u1 missing");
    assert_eq!(u1.status, UrlStatus::Processed);
    assert_eq!(u1.entity_id.as_deref(), Some("E1"));
    assert_eq!(frontier.priority_of(U2), Some(1));
    assert_eq!(frontier.priority_of(U3), Some(100));

    assert_eq!(*visits.borrow(), vec![U1, U2, U3]);
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.entities_found, 2);
    assert_eq!(summary.unextractable, 1);
}

#[tokio::test]
async fn test_outfit_cluster_exhausted_before_catalog() {
    // u2 (related to u1) leads to u4; both come ahead of u3 (generic link of u1)
    let extractor = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[U3])
        .entity(U2, "E2", &[U4], &[])
        .entity(U4, "E4", &[], &[]);
    let visits = extractor.visit_log();

    let mut coordinator = memory_coordinator(extractor);
    coordinator.run().await.expect("Crawl failed");

    assert_eq!(*visits.borrow(), vec![U1, U2, U4, U3]);
    assert_eq!(coordinator.state().frontier.priority_of(U4), Some(2));
}

#[tokio::test]
async fn test_cyclic_links_terminate_and_visit_once() {
    let extractor = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[U3])
        .entity(U2, "E2", &[U1], &[U3])
        .entity(U3, "E3", &[U1, U2], &[U1]);
    let visits = extractor.visit_log();

    let mut coordinator = memory_coordinator(extractor);
    coordinator.run().await.expect("Crawl failed");

    assert_eq!(visits.borrow().len(), 3);
    let frontier = &coordinator.state().frontier;
    assert!(frontier.is_exhausted());
    assert_eq!(frontier.count(UrlStatus::Processed), 3);
}

#[tokio::test]
async fn test_mutual_outfit_links_resolved_at_checkpoint() {
    let extractor = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[])
        .entity(U2, "E2", &[U1], &[]);

    let mut coordinator = memory_coordinator(extractor);
    coordinator.run().await.expect("Crawl failed");

    let state = coordinator.state();
    assert_eq!(related_ids(state, "E1"), vec!["E2"]);
    assert_eq!(related_ids(state, "E2"), vec!["E1"]);
    assert_eq!(
        state.graph.outfit_pairs(),
        vec![
            ("E1".to_string(), "E2".to_string()),
            ("E2".to_string(), "E1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_one_sided_outfit_link_is_made_symmetric() {
    // Only u1 lists u2; the relation still ends up on both entities
    let extractor = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[])
        .entity(U2, "E2", &[], &[]);

    let mut coordinator = memory_coordinator(extractor);
    coordinator.run().await.expect("Crawl failed");

    assert_eq!(related_ids(coordinator.state(), "E2"), vec!["E1"]);
}

#[tokio::test]
async fn test_checkpoint_round_trip_through_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("frontier.db");

    let extractor = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[U3])
        .entity(U2, "E2", &[U1], &[]);
    let mut coordinator = file_coordinator(&db_path, extractor, true);
    coordinator.run().await.expect("Crawl failed");

    let store = SqliteStore::new(&db_path).expect("Failed to reopen store");
    let loaded = Checkpointer::new(store, None, true)
        .load()
        .expect("Failed to load checkpoint");

    let original = coordinator.state();
    assert_eq!(observable_frontier(&loaded), observable_frontier(original));
    assert_eq!(loaded.graph.outfit_pairs(), original.graph.outfit_pairs());
    assert_eq!(loaded.aggregates, original.aggregates);
    assert_eq!(
        loaded.graph.get("E1").map(|e| e.url.clone()),
        Some(U1.to_string())
    );
}

#[tokio::test]
async fn test_transient_failure_requeued_on_restart() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("frontier.db");

    // Session 1: u2 cannot be loaded
    let first = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[])
        .failure(U2, ExtractError::Transient("timeout".to_string()));
    let mut coordinator = file_coordinator(&db_path, first, true);
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.transient_failures, 1);
    assert_eq!(
        coordinator.state().frontier.status_of(U2),
        Some(UrlStatus::Processing)
    );
    assert!(related_ids(coordinator.state(), "E1").is_empty());
    drop(coordinator);

    // Session 2: u2 comes back as New and is visited; u1 is not revisited
    let second = TableExtractor::new().entity(U2, "E2", &[U1], &[]);
    let visits = second.visit_log();
    let mut coordinator = file_coordinator(&db_path, second, true);
    coordinator.run().await.expect("Crawl failed");

    assert_eq!(*visits.borrow(), vec![U2]);
    let state = coordinator.state();
    assert_eq!(state.frontier.status_of(U2), Some(UrlStatus::Processed));
    assert_eq!(related_ids(state, "E1"), vec!["E2"]);
    assert_eq!(related_ids(state, "E2"), vec!["E1"]);
}

#[tokio::test]
async fn test_interrupted_url_stays_processing_without_requeue() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("frontier.db");

    let first = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[])
        .failure(U2, ExtractError::Transient("timeout".to_string()));
    let mut coordinator = file_coordinator(&db_path, first, false);
    coordinator.run().await.expect("Crawl failed");
    drop(coordinator);

    let second = TableExtractor::new().entity(U2, "E2", &[], &[]);
    let visits = second.visit_log();
    let mut coordinator = file_coordinator(&db_path, second, false);
    coordinator.run().await.expect("Crawl failed");

    assert!(visits.borrow().is_empty());
    assert_eq!(
        coordinator.state().frontier.status_of(U2),
        Some(UrlStatus::Processing)
    );
}

#[tokio::test]
async fn test_fatal_failure_saves_progress_for_resume() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("frontier.db");

    let first = TableExtractor::new()
        .entity(U1, "E1", &[U2], &[U3])
        .entity(U2, "E2", &[], &[])
        .failure(U3, ExtractError::Fatal("renderer crashed".to_string()));
    let mut coordinator = file_coordinator(&db_path, first, true);
    assert!(coordinator.run().await.is_err());
    drop(coordinator);

    let second = TableExtractor::new().entity(U3, "E3", &[], &[]);
    let visits = second.visit_log();
    let mut coordinator = file_coordinator(&db_path, second, true);
    let summary = coordinator.run().await.expect("Crawl failed");

    // Only the page that was in flight is visited again
    assert_eq!(*visits.borrow(), vec![U3]);
    assert_eq!(summary.entities_found, 1);
    assert_eq!(coordinator.state().graph.len(), 3);
}

#[tokio::test]
async fn test_fresh_ignores_stored_checkpoint() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("frontier.db");

    let mut coordinator = file_coordinator(
        &db_path,
        TableExtractor::new().entity(U1, "E1", &[], &[]),
        true,
    );
    coordinator.run().await.expect("Crawl failed");
    drop(coordinator);

    let extractor = TableExtractor::new().entity(U1, "E1", &[], &[]);
    let visits = extractor.visit_log();
    let mut coordinator = Coordinator::new(
        shop_config(&db_path.to_string_lossy()),
        extractor,
        SqliteStore::new(&db_path).expect("Failed to open store"),
        None,
        true,
    )
    .expect("Failed to create coordinator");
    coordinator.run().await.expect("Crawl failed");

    assert_eq!(*visits.borrow(), vec![U1]);
}

fn product_page(id: &str, name: &str, related: &str, nav: &[String]) -> String {
    let nav_links: String = nav
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();

    format!(
        r#"<html><body>
        <nav>{nav_links}</nav>
        <div id="product">
          <h1>{name}</h1>
          <div class="ref">{id}</div>
          <div class="price">$39.99</div>
          <div class="color">Color: Black</div>
          <div class="description">
            Stretch fabric
            Long sleeve
          </div>
        </div>
        <div id="outfit"><a href="{related}">Complete the look</a></div>
        <div id="gallery"><img src="/img/{name}.jpg"></div>
        </body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_html_extractor_full_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let host = url::Url::parse(&base_url)
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();

    let blouse = format!("{}/shop/tops/blouse.html", base_url);
    let skirt = format!("{}/shop/skirts/skirt.html", base_url);
    let listing = format!("{}/shop/skirts", base_url);
    let mini = format!("{}/shop/skirts/mini.html", base_url);
    let help = format!("{}/shop/help/contact", base_url);

    Mock::given(method("GET"))
        .and(path("/shop/tops/blouse.html"))
        .respond_with(html(product_page(
            "REF. 0001",
            "blouse",
            &skirt,
            &[listing.clone(), help.clone(), "https://elsewhere.test/".to_string()],
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shop/skirts/skirt.html"))
        .respond_with(html(product_page("REF. 0002", "skirt", &blouse, &[])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shop/skirts"))
        .respond_with(html(format!(
            r#"<html><body><div class="grid">
               <div class="item"><a href="{}">Skirt</a></div>
               <div class="item"><a href="{}">Mini</a></div>
               </div></body></html>"#,
            skirt, mini
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shop/skirts/mini.html"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    // Blacklisted: must never be requested
    Mock::given(method("GET"))
        .and(path("/shop/help/contact"))
        .respond_with(html(String::new()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("frontier.db");
    let config = create_test_config(
        &format!("{}/shop", host),
        vec![blouse.clone()],
        &db_path.to_string_lossy(),
    );

    let extractor = HtmlExtractor::new(&config).expect("Failed to build extractor");
    let store = SqliteStore::new(&db_path).expect("Failed to open store");
    let mut coordinator =
        Coordinator::new(config, extractor, store, None, false).expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.entities_found, 2);
    assert_eq!(summary.listings_recorded, 1);
    assert_eq!(summary.transient_failures, 1);

    let state = coordinator.state();
    assert_eq!(state.frontier.priority_of(&skirt), Some(1));
    assert_eq!(state.frontier.priority_of(&listing), Some(100));
    assert_eq!(state.frontier.priority_of(&mini), Some(200));
    assert_eq!(state.frontier.status_of(&mini), Some(UrlStatus::Processing));
    assert!(!state.frontier.contains(&help));
    assert!(!state.frontier.contains("https://elsewhere.test/"));

    let blouse_entity = state.graph.get("REF. 0001").expect("Blouse not extracted");
    assert_eq!(blouse_entity.name, "blouse");
    assert_eq!(blouse_entity.classification, "tops");
    assert_eq!(blouse_entity.prices, vec![39.99]);
    assert_eq!(blouse_entity.color.as_deref(), Some("Black"));
    assert_eq!(
        blouse_entity.attributes.get("fabric").map(String::as_str),
        Some("Stretch fabric")
    );
    assert_eq!(related_ids(state, "REF. 0001"), vec!["REF. 0002"]);
    assert_eq!(related_ids(state, "REF. 0002"), vec!["REF. 0001"]);

    let skirts = state.aggregates.get("skirts").expect("Listing not counted");
    assert_eq!((skirts.count, skirts.items), (1, 2));
}
