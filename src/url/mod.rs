//! URL handling module for Outfit-Frontier
//!
//! This module provides URL normalization, host wildcard matching, and the
//! scope policy that decides which discovered links may enter the frontier.

mod matcher;
mod normalize;

use crate::config::Config;
use url::Url;

// Re-export main functions
pub use matcher::{matches_wildcard, ScopeRule};
pub use normalize::normalize_url;

/// Scope classification of a discovered link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeClassification {
    /// Inside an allowed prefix and not blacklisted
    InScope,
    /// Inside a blacklisted prefix
    Blacklisted,
    /// Outside every allowed prefix
    OutOfScope,
}

impl ScopeClassification {
    /// Returns true if the link may be added to the frontier
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::InScope)
    }
}

/// Allowed and blacklisted prefixes for a crawl
///
/// The frontier itself is policy-free; the crawl loop consults this before
/// offering a link to it.
#[derive(Debug, Clone, Default)]
pub struct ScopePolicy {
    allowed: Vec<ScopeRule>,
    blacklisted: Vec<ScopeRule>,
}

impl ScopePolicy {
    pub fn new(allowed: Vec<ScopeRule>, blacklisted: Vec<ScopeRule>) -> Self {
        Self {
            allowed,
            blacklisted,
        }
    }

    /// Builds the policy from the `[[scope]]` and `[[blacklist]]` entries
    ///
    /// Prefixes are validated at config load time; any that fail to parse
    /// here are skipped.
    pub fn from_config(config: &Config) -> Self {
        let allowed = config
            .scope
            .iter()
            .filter_map(|entry| ScopeRule::parse(&entry.prefix))
            .collect();
        let blacklisted = config
            .blacklist
            .iter()
            .filter_map(|entry| ScopeRule::parse(&entry.prefix))
            .collect();

        Self::new(allowed, blacklisted)
    }

    /// Classifies a normalized URL
    ///
    /// Priority order:
    /// 1. Blacklist (highest priority)
    /// 2. Allowed prefixes
    /// 3. Out of scope (default)
    pub fn classify(&self, url: &Url) -> ScopeClassification {
        if self.blacklisted.iter().any(|rule| rule.matches(url)) {
            return ScopeClassification::Blacklisted;
        }

        if self.allowed.iter().any(|rule| rule.matches(url)) {
            return ScopeClassification::InScope;
        }

        ScopeClassification::OutOfScope
    }
}
