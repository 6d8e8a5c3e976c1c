/// URL lifecycle definitions for tracking crawl progress
///
/// Every known URL moves `New -> Processing -> Processed` exactly once.
/// Processed is terminal.
use std::collections::BTreeSet;
use std::fmt;

/// Represents the current status of a URL in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrlStatus {
    /// Discovered and waiting in the frontier
    New,

    /// Handed to the extractor and not yet finished
    Processing,

    /// Extracted (or recorded as unextractable); never visited again
    Processed,
}

impl UrlStatus {
    /// Returns true if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true if `next` is the single legal successor of this status
    pub fn can_transition_to(&self, next: UrlStatus) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::Processing) | (Self::Processing, Self::Processed)
        )
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Processed => "processed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "processing" => Some(Self::Processing),
            "processed" => Some(Self::Processed),
            _ => None,
        }
    }

    /// Returns all statuses in lifecycle order
    pub fn all_statuses() -> [Self; 3] {
        [Self::New, Self::Processing, Self::Processed]
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A URL known to the crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    /// Normalized URL; the record's key
    pub url: String,

    /// Lower values are explored sooner
    pub priority: u32,

    pub status: UrlStatus,

    /// Related-item URLs seen on this page; set once the page is extracted
    pub outfit_urls: BTreeSet<String>,

    /// Entity found on this page. None once processed means no entity was found.
    pub entity_id: Option<String>,
}

impl UrlRecord {
    /// Creates a freshly discovered record
    pub fn new(url: impl Into<String>, priority: u32) -> Self {
        Self {
            url: url.into(),
            priority,
            status: UrlStatus::New,
            outfit_urls: BTreeSet::new(),
            entity_id: None,
        }
    }
}
