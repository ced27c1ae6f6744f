//! Dual-scope federation: wraps a local (per-project) store and a global
//! (per-user) store behind the single [`GraphStore`] contract.
//!
//! Federated writes across both stores are NOT atomic — a local success
//! followed by a global failure leaves divergent state and the global
//! error is surfaced. Callers that need atomicity use
//! [`FederatingStore::add_node_to_scope`] against a single target.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::model::{Behavior, Direction, Edge, EdgeKind, Scope};

use super::{CancellationToken, GraphStore, NodeQuery};

pub struct FederatingStore {
    local: Option<Arc<dyn GraphStore>>,
    global: Arc<dyn GraphStore>,
    /// Serializes resolve-then-write sequences (`resolve_endpoint_scope`
    /// followed by a write to the resolved store) against each other, so two
    /// concurrent callers can't both resolve an endpoint before either write
    /// lands. Plain reads go through unlocked.
    scope_lock: RwLock<()>,
}

impl FederatingStore {
    pub fn new(local: Option<Arc<dyn GraphStore>>, global: Arc<dyn GraphStore>) -> Self {
        Self {
            local,
            global,
            scope_lock: RwLock::new(()),
        }
    }

    fn store_for(&self, scope: Scope) -> StoreResult<&Arc<dyn GraphStore>> {
        match scope {
            Scope::Global => Ok(&self.global),
            Scope::Local => self.local.as_ref().ok_or(StoreError::EndpointNotFound),
        }
    }

    /// Single-scope write primitive: the only operation in this store that
    /// is atomic, because it touches exactly one backing store.
    pub fn add_node_to_scope(&self, node: Behavior, scope: Scope) -> StoreResult<String> {
        self.store_for(scope)?.add_node(node)
    }

    fn resolve_endpoint_scope(&self, id: &str) -> StoreResult<Option<Scope>> {
        if let Some(local) = &self.local {
            if local.get_node(id)?.is_some() {
                return Ok(Some(Scope::Local));
            }
        }
        if self.global.get_node(id)?.is_some() {
            return Ok(Some(Scope::Global));
        }
        Ok(None)
    }
}

impl GraphStore for FederatingStore {
    /// Writes default to the global store; scope-targeted writes should go
    /// through [`FederatingStore::add_node_to_scope`] instead.
    fn add_node(&self, node: Behavior) -> StoreResult<String> {
        self.global.add_node(node)
    }

    fn update_node(&self, node: Behavior) -> StoreResult<()> {
        let _guard = self.scope_lock.write().unwrap();
        match self.resolve_endpoint_scope(&node.id)? {
            Some(scope) => self.store_for(scope)?.update_node(node),
            None => Err(StoreError::NotFound),
        }
    }

    fn get_node(&self, id: &str) -> StoreResult<Option<Behavior>> {
        if let Some(local) = &self.local {
            if let Some(node) = local.get_node(id)? {
                return Ok(Some(node));
            }
        }
        self.global.get_node(id)
    }

    fn delete_node(&self, id: &str) -> StoreResult<()> {
        let local_result = self.local.as_ref().map(|s| s.delete_node(id));
        let global_result = self.global.delete_node(id);
        match (local_result, global_result) {
            (Some(Err(le)), Err(ge)) => Err(StoreError::FederationFailure {
                local: le.to_string(),
                global: ge.to_string(),
            }),
            (_, Err(ge)) if self.local.is_none() => Err(ge),
            _ => Ok(()),
        }
    }

    fn query_nodes(&self, query: &NodeQuery) -> StoreResult<Vec<Behavior>> {
        let (local_result, global_result) = match &self.local {
            Some(local) => std::thread::scope(|s| {
                let local_handle = s.spawn(|| local.query_nodes(query));
                let global_handle = s.spawn(|| self.global.query_nodes(query));
                (local_handle.join().unwrap(), global_handle.join().unwrap())
            }),
            None => (Ok(Vec::new()), self.global.query_nodes(query)),
        };

        let local_nodes = local_result?;
        let global_nodes = global_result?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::with_capacity(local_nodes.len() + global_nodes.len());
        for node in local_nodes {
            seen.insert(node.id.clone());
            merged.push(node);
        }
        for node in global_nodes {
            if seen.insert(node.id.clone()) {
                merged.push(node);
            }
        }
        Ok(merged)
    }

    fn add_edge(&self, edge: Edge) -> StoreResult<()> {
        edge.validate()?;
        let _guard = self.scope_lock.write().unwrap();
        let source_scope = self.resolve_endpoint_scope(&edge.source)?;
        let target_scope = self.resolve_endpoint_scope(&edge.target)?;

        let target_store = match (source_scope, target_scope) {
            (Some(Scope::Local), Some(Scope::Local)) => self.store_for(Scope::Local)?,
            (Some(Scope::Global), Some(Scope::Global)) => &self.global,
            (Some(_), Some(_)) => &self.global,
            (None, None) => return Err(StoreError::EndpointNotFound),
            _ => &self.global,
        };
        target_store.add_edge(edge)
    }

    fn remove_edge(&self, source: &str, target: &str, kind: EdgeKind) -> StoreResult<()> {
        let local_result = self.local.as_ref().map(|s| s.remove_edge(source, target, kind));
        let global_result = self.global.remove_edge(source, target, kind);
        match (local_result, global_result) {
            (Some(Err(le)), Err(ge)) => Err(StoreError::FederationFailure {
                local: le.to_string(),
                global: ge.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn get_edges(&self, node_id: &str, direction: Direction, kind: Option<EdgeKind>) -> StoreResult<Vec<Edge>> {
        let mut edges = Vec::new();
        if let Some(local) = &self.local {
            edges.extend(local.get_edges(node_id, direction, kind)?);
        }
        edges.extend(self.global.get_edges(node_id, direction, kind)?);
        Ok(edges)
    }

    fn traverse(
        &self,
        start: &str,
        kinds: &[EdgeKind],
        direction: Direction,
        max_depth: usize,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<String>> {
        let mut local_result = self
            .local
            .as_ref()
            .map(|s| s.traverse(start, kinds, direction, max_depth, cancel))
            .transpose()?
            .unwrap_or_default();
        let global_result = self.global.traverse(start, kinds, direction, max_depth, cancel)?;

        let mut seen: HashSet<String> = local_result.iter().cloned().collect();
        for id in global_result {
            if seen.insert(id.clone()) {
                local_result.push(id);
            }
        }
        Ok(local_result)
    }

    fn sync(&self) -> StoreResult<()> {
        let local_result = self.local.as_ref().map(|s| s.sync());
        let global_result = self.global.sync();
        match (local_result, global_result) {
            (Some(Err(le)), Err(ge)) => Err(StoreError::FederationFailure {
                local: le.to_string(),
                global: ge.to_string(),
            }),
            (_, Err(ge)) if self.local.is_none() => Err(ge),
            _ => Ok(()),
        }
    }

    fn close(&self) {
        if let Some(local) = &self.local {
            local.close();
        }
        self.global.close();
    }
}
