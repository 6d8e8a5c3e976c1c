//! Output module for reporting on crawl results
//!
//! This module handles:
//! - Computing statistics over crawl state or a stored checkpoint
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
