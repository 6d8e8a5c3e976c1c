use crate::config::types::{
    Config, CrawlerConfig, ExtractorConfig, OutputConfig, PrefixEntry, ScopeEntry,
    UserAgentConfig,
};
use crate::url::{normalize_url, ScopeRule};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_extractor_config(&config.extractor)?;
    validate_scope_entries(&config.scope)?;
    validate_blacklist_entries(&config.blacklist)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    // Related items must always be served ahead of generic catalog links
    if config.discovered_priority_step <= config.related_priority_step {
        return Err(ConfigError::Validation(format!(
            "discovered_priority_step ({}) must be greater than related_priority_step ({})",
            config.discovered_priority_step, config.related_priority_step
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every extractor selector parses
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    let selectors = [
        ("entity-id", &config.entity_id),
        ("name", &config.name),
        ("price", &config.price),
        ("color", &config.color),
        ("description", &config.description),
        ("related", &config.related),
        ("images", &config.images),
        ("listing-item", &config.listing_item),
    ];

    for (field, selector) in selectors {
        Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            field: field.to_string(),
            message: format!("{:?}", e),
        })?;
    }

    for name in &config.description_attributes {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "description-attributes cannot contain empty names".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates scope entries and their seeds
fn validate_scope_entries(entries: &[ScopeEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        let rule = validate_prefix(&entry.prefix)?;

        if entry.seeds.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Scope '{}' must have at least one seed URL",
                entry.prefix
            )));
        }

        for seed in &entry.seeds {
            let url = normalize_url(seed).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
            })?;

            if !rule.matches(&url) {
                return Err(ConfigError::Validation(format!(
                    "Seed URL '{}' lies outside its scope '{}'",
                    seed, entry.prefix
                )));
            }
        }
    }

    Ok(())
}

/// Validates blacklist entries
fn validate_blacklist_entries(entries: &[PrefixEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        validate_prefix(&entry.prefix)?;
    }
    Ok(())
}

/// Parses a scope prefix and validates its host part
fn validate_prefix(prefix: &str) -> Result<ScopeRule, ConfigError> {
    let rule = ScopeRule::parse(prefix).ok_or_else(|| {
        ConfigError::InvalidPrefix(format!("Prefix '{}' has no host part", prefix))
    })?;

    validate_host_pattern(rule.host())?;
    Ok(rule)
}

/// Validates a host pattern (supports a leading "*." wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPrefix(
            "Host cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPrefix(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.')
        || host.ends_with('.')
        || host.starts_with('-')
        || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPrefix(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPrefix(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
