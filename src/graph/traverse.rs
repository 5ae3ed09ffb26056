//! Breadth-first traversal over the connectivity relation.
//!
//! Both traversals use the same connectivity rule as
//! [`Graph::connected_entities`]: outgoing edges always connect, incoming
//! edges connect only when non-directional. They run synchronously on the
//! calling thread; graphs are bounded (a few thousand entities), so no
//! yielding is needed mid-walk.

use std::collections::VecDeque;

use hashbrown::HashMap as IndexMap;

use crate::model::EntityId;

use super::Graph;

impl Graph {
    /// Shortest path between two entities by hop count, as an ordered id
    /// sequence from `start` to `goal`.
    ///
    /// Returns `None` when either endpoint is absent or the goal is
    /// unreachable. A same-node request yields the single-element path.
    /// Ties break FIFO — the first-discovered neighbor wins — which a
    /// strict queue guarantees; a stack would only find *a* path.
    pub fn find_shortest_path(&self, start: &EntityId, goal: &EntityId) -> Option<Vec<EntityId>> {
        if !self.contains_entity(start) || !self.contains_entity(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start.clone()]);
        }

        let mut predecessor: IndexMap<EntityId, EntityId> = IndexMap::new();
        let mut queue: VecDeque<EntityId> = VecDeque::new();
        predecessor.insert(start.clone(), start.clone());
        queue.push_back(start.clone());

        while let Some(current) = queue.pop_front() {
            for neighbor in self.connected_entities(&current, None) {
                if predecessor.contains_key(&neighbor) {
                    continue;
                }
                predecessor.insert(neighbor.clone(), current.clone());
                if neighbor == *goal {
                    return Some(unwind_path(&predecessor, start, goal));
                }
                queue.push_back(neighbor);
            }
        }
        None
    }

    /// All entities within `max_distance` hops of `start`, mapped to
    /// their hop distance. The seed entity itself is at distance 0.
    ///
    /// Returns an empty map when `start` is absent.
    pub fn entities_within_distance(
        &self,
        start: &EntityId,
        max_distance: usize,
    ) -> std::collections::HashMap<EntityId, usize> {
        let mut distances = std::collections::HashMap::new();
        if !self.contains_entity(start) {
            return distances;
        }

        let mut queue: VecDeque<(EntityId, usize)> = VecDeque::new();
        distances.insert(start.clone(), 0);
        queue.push_back((start.clone(), 0));

        while let Some((current, dist)) = queue.pop_front() {
            if dist == max_distance {
                continue;
            }
            for neighbor in self.connected_entities(&current, None) {
                if !distances.contains_key(&neighbor) {
                    distances.insert(neighbor.clone(), dist + 1);
                    queue.push_back((neighbor, dist + 1));
                }
            }
        }
        distances
    }
}

fn unwind_path(
    predecessor: &IndexMap<EntityId, EntityId>,
    start: &EntityId,
    goal: &EntityId,
) -> Vec<EntityId> {
    let mut path = vec![goal.clone()];
    let mut current = goal;
    while current != start {
        current = &predecessor[current];
        path.push(current.clone());
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Entity, EntityType};

    fn chain(graph: &mut Graph, n: usize) -> Vec<EntityId> {
        let ids: Vec<EntityId> = (0..n)
            .map(|i| {
                let e = Entity::new(EntityType::InventoryItem, format!("n{i}"));
                let id = e.id().clone();
                graph.add_entity(e);
                id
            })
            .collect();
        for pair in ids.windows(2) {
            graph.add_edge(Edge::new(pair[0].clone(), pair[1].clone(), "tracks"));
        }
        ids
    }

    #[test]
    fn test_same_node_path_is_singleton() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 1);
        assert_eq!(graph.find_shortest_path(&ids[0], &ids[0]), Some(vec![ids[0].clone()]));
    }

    #[test]
    fn test_disconnected_returns_none() {
        let mut graph = Graph::new();
        let a = Entity::new(EntityType::InventoryItem, "a");
        let b = Entity::new(EntityType::InventoryItem, "b");
        let (a_id, b_id) = (a.id().clone(), b.id().clone());
        graph.add_entity(a);
        graph.add_entity(b);
        assert_eq!(graph.find_shortest_path(&a_id, &b_id), None);
        assert_eq!(graph.find_shortest_path(&a_id, &"ghost".into()), None);
    }

    #[test]
    fn test_shortest_of_competing_routes_wins() {
        let mut graph = Graph::new();
        // Long route a -> b -> c -> d, plus a direct shortcut a -> d.
        let ids = chain(&mut graph, 4);
        graph.add_edge(Edge::new(ids[0].clone(), ids[3].clone(), "shortcut"));

        let path = graph.find_shortest_path(&ids[0], &ids[3]).unwrap();
        assert_eq!(path, vec![ids[0].clone(), ids[3].clone()]);
    }

    #[test]
    fn test_directional_edges_do_not_connect_in_reverse() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 2);
        assert!(graph.find_shortest_path(&ids[0], &ids[1]).is_some());
        assert_eq!(graph.find_shortest_path(&ids[1], &ids[0]), None);
    }

    #[test]
    fn test_within_distance_bounds_and_seed() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 5);

        let reach = graph.entities_within_distance(&ids[0], 2);
        assert_eq!(reach.get(&ids[0]), Some(&0));
        assert_eq!(reach.get(&ids[1]), Some(&1));
        assert_eq!(reach.get(&ids[2]), Some(&2));
        assert!(!reach.contains_key(&ids[3]));
        assert_eq!(reach.len(), 3);
    }

    #[test]
    fn test_within_distance_missing_seed_is_empty() {
        let graph = Graph::new();
        assert!(graph.entities_within_distance(&"ghost".into(), 3).is_empty());
    }
}
