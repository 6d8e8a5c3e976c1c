//! Structured attributes and prices recovered from product text

use regex::RegexBuilder;
use std::collections::BTreeMap;

/// Delimiter between description segments
pub const DESCRIPTION_DELIMITER: char = '|';

/// Maps attribute names to the description segments that mention them
///
/// The description is split on `|`. Each segment is searched for any of
/// `names` (case-insensitive); the first match in a segment decides which
/// attribute the whole segment is stored under. A later segment mentioning
/// the same attribute replaces the earlier one.
///
/// # Examples
///
/// ```
/// use outfit_frontier::graph::parse_description_attributes;
///
/// let names = vec!["fabric".to_string(), "sleeve".to_string()];
/// let attrs = parse_description_attributes("Flowy fabric|Short sleeve|Loose fit", &names);
/// assert_eq!(attrs.get("sleeve").map(String::as_str), Some("Short sleeve"));
/// assert_eq!(attrs.len(), 2);
/// ```
pub fn parse_description_attributes(
    description: &str,
    names: &[String],
) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();

    let alternatives: Vec<String> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(regex::escape)
        .collect();

    if description.is_empty() || alternatives.is_empty() {
        return attributes;
    }

    let pattern = match RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::warn!("Could not build description attribute pattern: {}", e);
            return attributes;
        }
    };

    for segment in description.split(DESCRIPTION_DELIMITER) {
        if let Some(found) = pattern.find(segment) {
            attributes.insert(found.as_str().to_lowercase(), segment.to_string());
        }
    }

    attributes
}

/// Joins the non-empty, trimmed lines of a block of text with `|`
pub fn join_description_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_matches(|c: char| c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(&DESCRIPTION_DELIMITER.to_string())
}

/// Parses every `digits.digits` token out of a price block
///
/// Retail price blocks look like `$49.99\n$29.99`; the block is split on `$`
/// and newlines and each token that is a plain decimal is kept. Duplicates
/// are dropped.
pub fn parse_prices(text: &str) -> Vec<f64> {
    let mut prices: Vec<f64> = Vec::new();

    for token in text.split(|c| c == '$' || c == '\n') {
        let token = token.trim();
        if !is_decimal(token) {
            continue;
        }
        if let Ok(price) = token.parse::<f64>() {
            if !prices.contains(&price) {
                prices.push(price);
            }
        }
    }

    prices
}

fn is_decimal(token: &str) -> bool {
    match token.split_once('.') {
        Some((whole, fraction)) => {
            !whole.is_empty()
                && !fraction.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}
