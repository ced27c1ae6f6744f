mod dirty;
mod export;
mod federation;
mod memory;
mod migrations;
mod paths;
mod sqlite;

pub use dirty::DirtyOp;
pub use federation::FederatingStore;
pub use memory::InMemoryStore;
pub use migrations::{apply_migrations, get_current_version, Migration, MIGRATIONS};
pub use paths::Paths;
pub use sqlite::SqliteStore;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StoreResult;
use crate::model::{Behavior, BehaviorKind, Direction, Edge, EdgeKind, Scope};
use crate::validator::ValidationIssue;

/// Cooperative cancellation token threaded through long-running operations
/// (`traverse`, `validate`, `sync`, PageRank). Checked between inner
/// iterations; cancellation after a commit does not roll back.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Flat predicate for `query_nodes`: every populated field narrows the
/// result set; an empty predicate returns everything.
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    pub kind: Option<BehaviorKind>,
    pub id: Option<String>,
    pub scope: Option<Scope>,
}

/// Base storage capability every backend provides.
pub trait GraphStore: Send + Sync {
    fn add_node(&self, node: Behavior) -> StoreResult<String>;
    fn update_node(&self, node: Behavior) -> StoreResult<()>;
    fn get_node(&self, id: &str) -> StoreResult<Option<Behavior>>;
    fn delete_node(&self, id: &str) -> StoreResult<()>;
    fn query_nodes(&self, query: &NodeQuery) -> StoreResult<Vec<Behavior>>;

    fn add_edge(&self, edge: Edge) -> StoreResult<()>;
    fn remove_edge(&self, source: &str, target: &str, kind: EdgeKind) -> StoreResult<()>;
    fn get_edges(&self, node_id: &str, direction: Direction, kind: Option<EdgeKind>) -> StoreResult<Vec<Edge>>;

    fn traverse(
        &self,
        start: &str,
        kinds: &[EdgeKind],
        direction: Direction,
        max_depth: usize,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<String>>;

    fn sync(&self) -> StoreResult<()>;
    fn close(&self);

    /// Dynamic capability detection: `Some(self)` on backends that
    /// implement [`StatsStore`], `None` otherwise. Overridden by concrete
    /// types rather than requiring trait-object upcasting.
    fn as_stats_store(&self) -> Option<&dyn StatsStore> {
        None
    }

    /// Same pattern as [`GraphStore::as_stats_store`], for embedding
    /// persistence.
    fn as_embedding_sink(&self) -> Option<&dyn EmbeddingSink> {
        None
    }
}

/// Extended statistics operations: confidence/activation bookkeeping, edge
/// maintenance, co-activation tracking, and graph validation.
pub trait StatsStore: GraphStore {
    fn update_confidence(&self, id: &str, confidence: f64) -> StoreResult<()>;
    fn record_activation_hit(&self, id: &str) -> StoreResult<()>;
    fn record_confirmed(&self, id: &str) -> StoreResult<()>;
    fn record_overridden(&self, id: &str) -> StoreResult<()>;
    fn touch_edges(&self, ids: &[(String, String, EdgeKind)]) -> StoreResult<()>;
    fn batch_update_edge_weights(&self, updates: &[(String, String, EdgeKind, f64)]) -> StoreResult<()>;
    fn prune_weak_edges(&self, kind: EdgeKind, threshold: f64) -> StoreResult<usize>;
    fn validate_behavior_graph(&self, external_ids: &std::collections::HashSet<String>) -> StoreResult<Vec<ValidationIssue>>;
    fn record_co_activation(&self, pair_key: &str) -> StoreResult<()>;
    fn co_activations_for(&self, pair_key: &str) -> StoreResult<Vec<chrono::DateTime<chrono::Utc>>>;
    fn prune_co_activations_before(&self, cutoff: chrono::DateTime<chrono::Utc>) -> StoreResult<usize>;
}

/// Pluggable embedding storage seam. Generation happens outside this
/// crate; this trait is only the write/read-through surface.
pub trait EmbeddingSink: GraphStore {
    fn store_embedding(&self, id: &str, vector: &[f32]) -> StoreResult<()>;
    fn get_embedding(&self, id: &str) -> StoreResult<Option<Vec<f32>>>;
}
