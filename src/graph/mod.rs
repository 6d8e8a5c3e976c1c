//! Entity graph for discovered products
//!
//! The graph owns every extracted entity and the undirected "complete the
//! outfit" relation between them. Relations are built in two phases:
//!
//! 1. When a product page is processed, the frontier records the related
//!    URLs it listed (`outfit_urls` on the processed record).
//! 2. At checkpoint time, `resolve_deferred_links` turns every such URL pair
//!    whose endpoints both have an entity id into a symmetric edge.
//!
//! Linking cannot happen eagerly because the related page has usually not
//! been extracted yet when its parent is processed.

mod attributes;
mod entity;

pub use attributes::{
    join_description_lines, parse_description_attributes, parse_prices, DESCRIPTION_DELIMITER,
};
pub use entity::Entity;

use crate::crawler::Frontier;
use std::collections::HashMap;

/// Entities keyed by id, with a symmetric related-id relation
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: HashMap<String, Entity>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entity or replaces the one with the same id
    ///
    /// The stored entity's related ids are carried over to the replacement,
    /// since the other endpoints still point back at it.
    pub fn record(&mut self, mut entity: Entity) {
        if let Some(existing) = self.entities.remove(&entity.id) {
            entity.related_ids.extend(existing.related_ids);
        }
        self.entities.insert(entity.id.clone(), entity);
    }

    /// Inserts an entity exactly as given (used on restore)
    pub(crate) fn restore(&mut self, entity: Entity) {
        self.entities.insert(entity.id.clone(), entity);
    }

    /// Relates two entities in both directions
    ///
    /// No-op if either id is unknown or both ids are the same. Returns true if
    /// either side gained a new related id.
    pub fn link_related(&mut self, id_a: &str, id_b: &str) -> bool {
        if id_a == id_b || !self.entities.contains_key(id_a) || !self.entities.contains_key(id_b)
        {
            return false;
        }

        let mut added = false;
        if let Some(a) = self.entities.get_mut(id_a) {
            added |= a.related_ids.insert(id_b.to_string());
        }
        if let Some(b) = self.entities.get_mut(id_b) {
            added |= b.related_ids.insert(id_a.to_string());
        }
        added
    }

    /// Links every processed page's entity to the entities of the related
    /// pages it listed, where those pages are processed too
    ///
    /// Returns the number of new links. Related URLs that have not been
    /// processed yet stay unresolved until a later call.
    pub fn resolve_deferred_links(&mut self, frontier: &Frontier) -> usize {
        let mut pairs = Vec::new();

        for record in frontier.processed() {
            let entity_id = match &record.entity_id {
                Some(id) => id,
                None => continue,
            };

            for outfit_url in &record.outfit_urls {
                let outfit_id = frontier
                    .get(outfit_url)
                    .filter(|r| r.status.is_terminal())
                    .and_then(|r| r.entity_id.as_ref());

                if let Some(outfit_id) = outfit_id {
                    pairs.push((entity_id.clone(), outfit_id.clone()));
                }
            }
        }

        let mut linked = 0;
        for (a, b) in &pairs {
            if self.link_related(a, b) {
                linked += 1;
            }
        }

        if linked > 0 {
            tracing::debug!("Resolved {} deferred outfit links", linked);
        }
        linked
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Every (entity, related entity) pair with both ends known, sorted
    ///
    /// Each undirected edge appears once per direction.
    pub fn outfit_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .entities
            .values()
            .flat_map(|entity| {
                entity
                    .related_ids
                    .iter()
                    .filter(|id| self.entities.contains_key(id.as_str()))
                    .map(move |id| (entity.id.clone(), id.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
