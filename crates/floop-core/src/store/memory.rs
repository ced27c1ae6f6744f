//! Ephemeral in-memory [`GraphStore`] backend for tests, guarded by a
//! single read/write lock around all state.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::model::{Behavior, Direction, Edge, EdgeKind};
use crate::validator::{self, ValidationIssue};

use super::{CancellationToken, GraphStore, NodeQuery, StatsStore};

#[derive(Default)]
struct State {
    behaviors: HashMap<String, Behavior>,
    edges: HashMap<(String, String, EdgeKind), Edge>,
    co_activations: Vec<(String, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for InMemoryStore {
    fn add_node(&self, mut node: Behavior) -> StoreResult<String> {
        if node.id.is_empty() {
            return Err(StoreError::MissingId);
        }
        node.recompute_content_hash();
        let mut state = self.state.write().unwrap();
        if let Some(owner) = state
            .behaviors
            .values()
            .find(|b| b.content_hash == node.content_hash && b.id != node.id)
        {
            return Err(StoreError::DuplicateContent(owner.id.clone()));
        }
        let id = node.id.clone();
        state.behaviors.insert(id.clone(), node);
        Ok(id)
    }

    fn update_node(&self, mut node: Behavior) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let prior = state.behaviors.get(&node.id).ok_or(StoreError::NotFound)?;
        node.recompute_content_hash();
        node.stats = prior.stats.clone();
        state.behaviors.insert(node.id.clone(), node);
        Ok(())
    }

    fn get_node(&self, id: &str) -> StoreResult<Option<Behavior>> {
        Ok(self.state.read().unwrap().behaviors.get(id).cloned())
    }

    fn delete_node(&self, id: &str) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        state.behaviors.remove(id);
        state.edges.retain(|(s, t, _), _| s != id && t != id);
        Ok(())
    }

    fn query_nodes(&self, query: &NodeQuery) -> StoreResult<Vec<Behavior>> {
        let state = self.state.read().unwrap();
        Ok(state
            .behaviors
            .values()
            .filter(|b| query.kind.map(|k| k == b.kind).unwrap_or(true))
            .filter(|b| query.id.as_deref().map(|id| id == b.id).unwrap_or(true))
            .filter(|b| query.scope.map(|s| s.as_str() == b.metadata.scope.as_str()).unwrap_or(true))
            .cloned()
            .collect())
    }

    fn add_edge(&self, edge: Edge) -> StoreResult<()> {
        edge.validate()?;
        let mut state = self.state.write().unwrap();
        state.edges.insert((edge.source.clone(), edge.target.clone(), edge.kind), edge);
        Ok(())
    }

    fn remove_edge(&self, source: &str, target: &str, kind: EdgeKind) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        state.edges.remove(&(source.to_string(), target.to_string(), kind));
        Ok(())
    }

    fn get_edges(&self, node_id: &str, direction: Direction, kind: Option<EdgeKind>) -> StoreResult<Vec<Edge>> {
        let state = self.state.read().unwrap();
        Ok(state
            .edges
            .values()
            .filter(|e| match direction {
                Direction::Outbound => e.source == node_id,
                Direction::Inbound => e.target == node_id,
                Direction::Both => e.source == node_id || e.target == node_id,
            })
            .filter(|e| kind.map(|k| k == e.kind).unwrap_or(true))
            .cloned()
            .collect())
    }

    fn traverse(
        &self,
        start: &str,
        kinds: &[EdgeKind],
        direction: Direction,
        max_depth: usize,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<String>> {
        let state = self.state.read().unwrap();
        let mut visited = HashSet::new();
        visited.insert(start.to_string());
        let mut queue: std::collections::VecDeque<(String, usize)> = std::collections::VecDeque::new();
        queue.push_back((start.to_string(), 0));

        while let Some((node, depth)) = queue.pop_front() {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                break;
            }
            if depth >= max_depth {
                continue;
            }
            for edge in state.edges.values() {
                if !kinds.is_empty() && !kinds.contains(&edge.kind) {
                    continue;
                }
                let next = match direction {
                    Direction::Outbound if edge.source == node => Some(edge.target.clone()),
                    Direction::Inbound if edge.target == node => Some(edge.source.clone()),
                    Direction::Both if edge.source == node => Some(edge.target.clone()),
                    Direction::Both if edge.target == node => Some(edge.source.clone()),
                    _ => None,
                };
                if let Some(next_id) = next {
                    if visited.insert(next_id.clone()) {
                        queue.push_back((next_id, depth + 1));
                    }
                }
            }
        }
        Ok(visited.into_iter().collect())
    }

    fn sync(&self) -> StoreResult<()> {
        Ok(())
    }

    fn close(&self) {}

    fn as_stats_store(&self) -> Option<&dyn StatsStore> {
        Some(self)
    }
}

impl StatsStore for InMemoryStore {
    fn update_confidence(&self, id: &str, confidence: f64) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let b = state.behaviors.get_mut(id).ok_or(StoreError::NotFound)?;
        b.metadata.confidence = confidence.clamp(0.0, 1.0);
        Ok(())
    }

    fn record_activation_hit(&self, id: &str) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let b = state.behaviors.get_mut(id).ok_or(StoreError::NotFound)?;
        b.stats.times_activated += 1;
        b.stats.last_activated = Some(Utc::now());
        b.stats.updated_at = Utc::now();
        Ok(())
    }

    fn record_confirmed(&self, id: &str) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let b = state.behaviors.get_mut(id).ok_or(StoreError::NotFound)?;
        b.stats.times_confirmed += 1;
        b.stats.times_followed += 1;
        b.stats.last_confirmed = Some(Utc::now());
        b.stats.updated_at = Utc::now();
        Ok(())
    }

    fn record_overridden(&self, id: &str) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let b = state.behaviors.get_mut(id).ok_or(StoreError::NotFound)?;
        b.stats.times_overridden += 1;
        b.stats.updated_at = Utc::now();
        Ok(())
    }

    fn touch_edges(&self, ids: &[(String, String, EdgeKind)]) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        for key in ids {
            if let Some(edge) = state.edges.get_mut(key) {
                edge.last_activated = Some(Utc::now());
            }
        }
        Ok(())
    }

    fn batch_update_edge_weights(&self, updates: &[(String, String, EdgeKind, f64)]) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        for (source, target, kind, weight) in updates {
            if !(*weight > 0.0 && *weight <= 1.0) {
                return Err(StoreError::InvalidEdgeWeight);
            }
            if let Some(edge) = state.edges.get_mut(&(source.clone(), target.clone(), *kind)) {
                edge.weight = *weight;
            }
        }
        Ok(())
    }

    fn prune_weak_edges(&self, kind: EdgeKind, threshold: f64) -> StoreResult<usize> {
        let mut state = self.state.write().unwrap();
        let before = state.edges.len();
        state.edges.retain(|(_, _, k), e| !(*k == kind && e.weight <= threshold));
        Ok(before - state.edges.len())
    }

    fn validate_behavior_graph(&self, external_ids: &HashSet<String>) -> StoreResult<Vec<ValidationIssue>> {
        let state = self.state.read().unwrap();
        let behaviors: Vec<Behavior> = state.behaviors.values().cloned().collect();
        let edges: Vec<Edge> = state.edges.values().cloned().collect();
        Ok(validator::validate(&behaviors, &edges, external_ids))
    }

    fn record_co_activation(&self, pair_key: &str) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        state.co_activations.push((pair_key.to_string(), Utc::now()));
        Ok(())
    }

    fn co_activations_for(&self, pair_key: &str) -> StoreResult<Vec<DateTime<Utc>>> {
        let state = self.state.read().unwrap();
        Ok(state
            .co_activations
            .iter()
            .filter(|(k, _)| k == pair_key)
            .map(|(_, ts)| *ts)
            .collect())
    }

    fn prune_co_activations_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut state = self.state.write().unwrap();
        let before = state.co_activations.len();
        state.co_activations.retain(|(_, ts)| *ts >= cutoff);
        Ok(before - state.co_activations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BehaviorKind;

    #[test]
    fn add_then_get_round_trips() {
        let store = InMemoryStore::new();
        store.add_node(Behavior::new("a", "a", BehaviorKind::Directive, "x")).unwrap();
        assert!(store.get_node("a").unwrap().is_some());
    }

    #[test]
    fn duplicate_content_rejected() {
        let store = InMemoryStore::new();
        store.add_node(Behavior::new("a", "a", BehaviorKind::Directive, "same")).unwrap();
        let err = store.add_node(Behavior::new("b", "b", BehaviorKind::Directive, "same")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateContent(ref id) if id == "a"));
    }

    #[test]
    fn delete_is_idempotent_and_cascades() {
        let store = InMemoryStore::new();
        store.add_node(Behavior::new("a", "a", BehaviorKind::Directive, "a")).unwrap();
        store.add_node(Behavior::new("b", "b", BehaviorKind::Directive, "b")).unwrap();
        store.add_edge(Edge::new("a", "b", EdgeKind::Requires, 1.0)).unwrap();
        store.delete_node("a").unwrap();
        store.delete_node("a").unwrap();
        assert!(store.get_edges("b", Direction::Inbound, None).unwrap().is_empty());
    }
}
