//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlStatus`: the New/Processing/Processed lifecycle of a URL
//! - `UrlRecord`: a known URL with its priority, status, and extraction results
//! - `AggregateCounter`: per-category counts for listing pages

mod aggregate;
mod url_state;

// Re-export main types
pub use aggregate::{AggregateBucket, AggregateCounter};
pub use url_state::{UrlRecord, UrlStatus};
