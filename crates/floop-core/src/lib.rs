//! A behavior memory graph for LLM coding-agent directives.
//!
//! This crate implements three tightly coupled subsystems:
//!
//! - A dual-scoped, transactional graph store ([`store`]) with schema
//!   migration, content-hash deduplication, incremental JSONL export, and
//!   concurrent-safe cross-store federation.
//! - A ranking and activation pipeline ([`ranking`]): PageRank, time-decay
//!   functions, multi-signal relevance scoring, and a hybrid combiner.
//! - A tiered, token-budgeted injection planner ([`tier`]) that converts
//!   activation scores into a prompt-ready plan.
//!
//! Content sanitization, embedding generation, the CLI surface,
//! configuration loading, and prompt formatting are external collaborators
//! consumed through the interfaces this crate exposes.

pub mod error;
pub mod model;
pub mod ranking;
pub mod store;
pub mod tier;
pub mod validator;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::error::{StoreError, StoreResult};
    pub use crate::model::{
        Behavior, BehaviorKind, Context, Direction, Edge, EdgeKind, LifecycleState, Scope, Value,
    };
    pub use crate::ranking::{HybridScorer, PageRankConfig, RelevanceScorer, page_rank};
    pub use crate::store::{FederatingStore, GraphStore, InMemoryStore, NodeQuery, Paths, SqliteStore, StatsStore};
    pub use crate::tier::{InjectionPlan, Tier, TierPlanner};
    pub use crate::validator::{validate, ValidationIssue};
}
