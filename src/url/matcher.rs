use crate::url::normalize::normalize_path;
use url::Url;

/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "shop.example.com" (single subdomain)
///    - "eu.shop.example.com" (nested subdomains)
///
/// # Examples
///
/// ```
/// use outfit_frontier::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "shop.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// A host plus path prefix, e.g. `shop.example.com/us/women`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRule {
    host: String,
    path: String,
}

impl ScopeRule {
    /// Parses a `host[/path]` prefix
    ///
    /// Returns None if the prefix has no host part. A leading scheme is
    /// tolerated and ignored.
    pub fn parse(prefix: &str) -> Option<Self> {
        let prefix = prefix.trim();
        let prefix = prefix
            .strip_prefix("https://")
            .or_else(|| prefix.strip_prefix("http://"))
            .unwrap_or(prefix);

        let (host, path) = match prefix.find('/') {
            Some(idx) => (&prefix[..idx], &prefix[idx..]),
            None => (prefix, "/"),
        };

        if host.is_empty() {
            return None;
        }

        Some(Self {
            host: host.to_lowercase(),
            path: normalize_path(path),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if the URL's host matches and its path starts with this
    /// rule's path on a segment boundary
    pub fn matches(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(h) => h,
            None => return false,
        };

        matches_wildcard(&self.host, host) && path_has_prefix(url.path(), &self.path)
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
