//! Adjacency-indexed in-memory graph of inventory entities and edges.
//!
//! The graph owns entities and edges by value and maintains four derived
//! indexes: outgoing edge ids per entity, incoming edge ids per entity,
//! entity ids per entity type, and edge ids per relationship type. Every
//! mutating operation updates the primary maps and the indexes together,
//! so an edge id found in an index always resolves in the primary map.
//!
//! ## Concurrency
//!
//! The graph is not internally synchronized. Callers coordinate access:
//! single writer, or an external read lock held for the duration of a
//! traversal. Traversals read the live indexes and do not snapshot.

mod traverse;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::model::{Edge, EdgeId, Entity, EntityId, EntityType, PropertyValue, VirtualView};

/// Inline capacity of 4 covers the common case — a spool is linked to a
/// tray, a tag, and a stock definition.
type EdgeList = SmallVec<[EdgeId; 4]>;

/// In-memory property graph of inventory entities.
#[derive(Debug, Default)]
pub struct Graph {
    entities: HashMap<EntityId, Entity>,
    edges: HashMap<EdgeId, Edge>,
    outgoing: HashMap<EntityId, EdgeList>,
    incoming: HashMap<EntityId, EdgeList>,
    by_type: HashMap<EntityType, HashSet<EntityId>>,
    by_relationship: HashMap<String, HashSet<EdgeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Entity CRUD
    // ========================================================================

    /// Register an entity. Returns `false` (leaving the graph unchanged)
    /// when the id is already present — no overwrite.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        let id = entity.id().clone();
        if self.entities.contains_key(&id) {
            return false;
        }
        self.by_type.entry(entity.entity_type).or_default().insert(id.clone());
        self.outgoing.entry(id.clone()).or_default();
        self.incoming.entry(id.clone()).or_default();
        self.entities.insert(id, entity);
        true
    }

    /// Remove an entity, cascading to all incident edges first.
    /// Returns `false` when the id is absent.
    pub fn remove_entity(&mut self, id: &EntityId) -> bool {
        let Some(entity) = self.entities.remove(id) else {
            return false;
        };

        let mut incident: Vec<EdgeId> = Vec::new();
        if let Some(out) = self.outgoing.get(id) {
            incident.extend(out.iter().cloned());
        }
        if let Some(inc) = self.incoming.get(id) {
            incident.extend(inc.iter().cloned());
        }
        for edge_id in incident {
            self.remove_edge(&edge_id);
        }

        if let Some(ids) = self.by_type.get_mut(&entity.entity_type) {
            ids.remove(id);
        }
        self.outgoing.remove(id);
        self.incoming.remove(id);
        true
    }

    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains_entity(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_of_type(&self, entity_type: EntityType) -> Vec<&Entity> {
        self.by_type
            .get(&entity_type)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Edge CRUD
    // ========================================================================

    /// Register an edge. Returns `false` when the edge id is already
    /// present, when either endpoint is missing from the graph, or when
    /// [`Edge::validate`] rejects it (blank ids or type, self-reference).
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edges.contains_key(edge.id()) || !edge.validate() {
            return false;
        }
        if !self.entities.contains_key(&edge.from) || !self.entities.contains_key(&edge.to) {
            return false;
        }

        let id = edge.id().clone();
        self.outgoing.entry(edge.from.clone()).or_default().push(id.clone());
        self.incoming.entry(edge.to.clone()).or_default().push(id.clone());
        self.by_relationship
            .entry(edge.relationship_type.clone())
            .or_default()
            .insert(id.clone());
        self.edges.insert(id, edge);
        true
    }

    /// Remove an edge from the primary map and all three edge indexes.
    /// Returns `false` when the id is absent.
    pub fn remove_edge(&mut self, id: &EdgeId) -> bool {
        let Some(edge) = self.edges.remove(id) else {
            return false;
        };
        if let Some(out) = self.outgoing.get_mut(&edge.from) {
            out.retain(|eid| eid != id);
        }
        if let Some(inc) = self.incoming.get_mut(&edge.to) {
            inc.retain(|eid| eid != id);
        }
        if let Some(ids) = self.by_relationship.get_mut(&edge.relationship_type) {
            ids.remove(id);
        }
        true
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_of_relationship(&self, relationship_type: &str) -> Vec<&Edge> {
        self.by_relationship
            .get(relationship_type)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// All edges incident to the entity, outgoing and incoming.
    pub fn edges_of(&self, id: &EntityId) -> Vec<&Edge> {
        let mut result: Vec<&Edge> = Vec::new();
        if let Some(out) = self.outgoing.get(id) {
            result.extend(out.iter().filter_map(|eid| self.edges.get(eid)));
        }
        if let Some(inc) = self.incoming.get(id) {
            result.extend(inc.iter().filter_map(|eid| self.edges.get(eid)));
        }
        result
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    /// Entities connected to `id`, optionally filtered by relationship
    /// type.
    ///
    /// Connectivity rule: targets of outgoing edges always count;
    /// sources of incoming edges count only when the edge is
    /// non-directional. A directional incoming edge does not connect in
    /// reverse.
    pub fn connected_entities(&self, id: &EntityId, relationship_type: Option<&str>) -> Vec<EntityId> {
        let mut seen: HashSet<&EntityId> = HashSet::new();
        let mut result: Vec<EntityId> = Vec::new();

        let type_matches = |edge: &Edge| {
            relationship_type.map_or(true, |t| edge.relationship_type == t)
        };

        if let Some(out) = self.outgoing.get(id) {
            for edge in out.iter().filter_map(|eid| self.edges.get(eid)) {
                if type_matches(edge) && seen.insert(&edge.to) {
                    result.push(edge.to.clone());
                }
            }
        }
        if let Some(inc) = self.incoming.get(id) {
            for edge in inc.iter().filter_map(|eid| self.edges.get(eid)) {
                if !edge.directional && type_matches(edge) && seen.insert(&edge.from) {
                    result.push(edge.from.clone());
                }
            }
        }
        result
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Entities whose properties exactly match every supplied filter.
    pub fn find_entities(&self, filters: &[(&str, PropertyValue)]) -> Vec<&Entity> {
        self.entities
            .values()
            .filter(|e| filters.iter().all(|(k, v)| e.property(k) == Some(v)))
            .collect()
    }

    /// Edges whose properties exactly match every supplied filter.
    pub fn find_edges(&self, filters: &[(&str, PropertyValue)]) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|e| filters.iter().all(|(k, v)| e.property(k) == Some(v)))
            .collect()
    }

    /// Roots of the inventory forest: virtual filament-tray entities,
    /// plus physical components with no incoming edges. De-duplicated
    /// by id.
    pub fn find_inventory_roots(&self) -> Vec<&Entity> {
        let mut seen: HashSet<&EntityId> = HashSet::new();
        let mut roots: Vec<&Entity> = Vec::new();

        for entity in self.entities.values() {
            let is_root = match entity.entity_type {
                EntityType::Virtual => VirtualView::of(entity)
                    .and_then(|v| v.virtual_type())
                    == Some("filament_tray"),
                EntityType::PhysicalComponent => {
                    self.incoming.get(entity.id()).map_or(true, |inc| inc.is_empty())
                }
                _ => false,
            };
            if is_root && seen.insert(entity.id()) {
                roots.push(entity);
            }
        }
        roots
    }
}
