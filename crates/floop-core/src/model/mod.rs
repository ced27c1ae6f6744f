mod behavior;
mod edge;
mod value;

pub use behavior::{
    content_hash, Behavior, BehaviorKind, Content, LifecycleState, Metadata, Provenance,
    Relationships, Scope, Stats, WhenValue,
};
pub use edge::{Direction, Edge, EdgeKind};
pub use value::Value;

/// A caller-supplied context snapshot used to score `when` predicate
/// matches in the relevance scorer.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub file: Option<String>,
    pub file_path: Option<String>,
    pub language: Option<String>,
    pub task: Option<String>,
    pub environment: Option<String>,
    pub repo: Option<String>,
    pub custom: std::collections::BTreeMap<String, String>,
}

impl Context {
    /// Resolve a `when` predicate key to the corresponding context value.
    /// Known keys map to their dedicated field; anything else is looked up
    /// in `custom`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "file" => self.file.as_deref(),
            "file_path" => self.file_path.as_deref(),
            "language" => self.language.as_deref(),
            "task" => self.task.as_deref(),
            "environment" | "env" => self.environment.as_deref(),
            "repo" | "repository" => self.repo.as_deref(),
            other => self.custom.get(other).map(|s| s.as_str()),
        }
    }
}
