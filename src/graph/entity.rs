use std::collections::{BTreeMap, BTreeSet};

/// A product found on a detail page
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Retailer-assigned unique id
    pub id: String,

    pub name: String,

    /// Coarse category, e.g. "shirts-blouses"
    pub classification: String,

    /// Current and original prices; order is irrelevant
    pub prices: Vec<f64>,

    pub color: Option<String>,

    /// Raw description, segments joined by `|`
    pub description: String,

    /// Description segments keyed by the attribute they mention
    pub attributes: BTreeMap<String, String>,

    pub image_urls: BTreeSet<String>,

    /// Canonical URL of the page the entity was extracted from
    pub url: String,

    /// Ids of entities suggested alongside this one ("complete the outfit")
    pub related_ids: BTreeSet<String>,
}

impl Entity {
    /// Creates an entity with only its identity filled in
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            classification: String::new(),
            prices: Vec::new(),
            color: None,
            description: String::new(),
            attributes: BTreeMap::new(),
            image_urls: BTreeSet::new(),
            url: url.into(),
            related_ids: BTreeSet::new(),
        }
    }
}
