//! Outfit-Frontier main entry point
//!
//! This is the command-line interface for the Outfit-Frontier crawler.

use anyhow::Context;
use clap::Parser;
use outfit_frontier::config::{load_config_with_hash, Config};
use outfit_frontier::crawler::{open_coordinator, CrawlSummary};
use outfit_frontier::output::{load_statistics, print_statistics};
use outfit_frontier::storage::SqliteStore;
use outfit_frontier::url::normalize_url;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Outfit-Frontier: a focused crawler for retail catalogues
///
/// Visits product pages in related-items-first order, links products that
/// are suggested together, and checkpoints its progress so an interrupted
/// crawl resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "outfit-frontier")]
#[command(version)]
#[command(about = "A focused crawler for retail catalogues", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from the last checkpoint (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring the stored checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the checkpoint database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, config_hash, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("outfit_frontier=info,warn"),
            1 => EnvFilter::new("outfit_frontier=debug,info"),
            2 => EnvFilter::new("outfit_frontier=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated config and its seeds
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Outfit-Frontier Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Checkpoint interval: {} pages",
        config.crawler.checkpoint_interval
    );
    println!(
        "  Related link priority step: +{}",
        config.crawler.related_priority_step
    );
    println!(
        "  Discovered link priority step: +{}",
        config.crawler.discovered_priority_step
    );
    println!(
        "  Requeue interrupted URLs: {}",
        config.crawler.requeue_interrupted
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nDescription Attributes:");
    println!("  {}", config.extractor.description_attributes.join(", "));

    println!("\nScopes ({}):", config.scope.len());
    for entry in &config.scope {
        println!("  - {} ({} seeds)", entry.prefix, entry.seeds.len());
        for seed in &entry.seeds {
            let normalized = normalize_url(seed)?;
            println!("    * {}", normalized);
        }
    }

    println!("\nBlacklisted Prefixes ({}):", config.blacklist.len());
    for entry in &config.blacklist {
        println!("  - {}", entry.prefix);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.scope.iter().map(|s| s.seeds.len()).sum::<usize>()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the checkpoint database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let path = Path::new(&config.output.database_path);
    if !path.exists() {
        println!("No checkpoint database found.");
        return Ok(());
    }

    let store =
        SqliteStore::open_read_only(path).context("Failed to open checkpoint database")?;

    match load_statistics(&store)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No checkpoint has been saved yet."),
    }

    Ok(())
}

/// Handles the main crawl operation
///
/// On Ctrl-C the loop is dropped at its current await point and a final
/// checkpoint is saved before exiting.
async fn handle_crawl(config: Config, config_hash: String, fresh: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Scopes: {}, Blacklist: {}, Seeds: {}",
        config.scope.len(),
        config.blacklist.len(),
        config.scope.iter().map(|s| s.seeds.len()).sum::<usize>()
    );

    let mut coordinator = open_coordinator(config, Some(config_hash), fresh)?;

    let outcome = tokio::select! {
        result = coordinator.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(Ok(summary)) => {
            print_summary(&summary);
            Ok(())
        }
        Some(Err(e)) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
        None => {
            coordinator
                .shutdown()
                .context("Failed to save checkpoint after interrupt")?;
            print_summary(coordinator.summary());
            Ok(())
        }
    }
}

fn print_summary(summary: &CrawlSummary) {
    println!("\n=== Crawl Session ===");
    println!("  Pages visited: {}", summary.pages_visited);
    println!("  Entities: {}", summary.entities_found);
    println!("  Listings: {}", summary.listings_recorded);
    println!("  Unextractable: {}", summary.unextractable);
    println!("  Transient failures: {}", summary.transient_failures);
    println!("  URLs enqueued: {}", summary.urls_enqueued);
    println!("  Checkpoints saved: {}", summary.checkpoints_saved);
}
