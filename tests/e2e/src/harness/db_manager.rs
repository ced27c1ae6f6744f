//! Test database manager
//!
//! Provides isolated [`SqliteStore`] instances for integration tests:
//! temporary on-disk databases that clean themselves up, plus seeding
//! helpers for common fixture shapes.

use std::path::PathBuf;

use floop_core::model::{Behavior, BehaviorKind};
use floop_core::store::{GraphStore, NodeQuery, SqliteStore};
use tempfile::TempDir;

/// Manager for an isolated, temporary-directory-backed store.
///
/// The backing directory (and the `floop.db`/`nodes.jsonl`/`edges.jsonl`
/// files inside it) is deleted when the manager is dropped.
pub struct TestDatabaseManager {
    pub store: SqliteStore,
    _temp_dir: TempDir,
    dir: PathBuf,
}

impl TestDatabaseManager {
    /// Open a fresh store in a new temporary directory.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        let store = SqliteStore::open(&dir).expect("failed to open test store");
        Self {
            store,
            _temp_dir: temp_dir,
            dir,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn node_count(&self) -> usize {
        self.store.query_nodes(&NodeQuery::default()).unwrap_or_default().len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Seed `count` plain directive behaviors with distinct content.
    pub fn seed_behaviors(&mut self, count: usize) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let id = format!("seed-{i}");
            let behavior = Behavior::new(&id, &id, BehaviorKind::Directive, format!("Directive body {i}"));
            if self.store.add_node(behavior).is_ok() {
                ids.push(id);
            }
        }
        ids
    }

    /// Seed one behavior of each [`BehaviorKind`].
    pub fn seed_diverse(&mut self) -> Vec<String> {
        let kinds = [
            BehaviorKind::Directive,
            BehaviorKind::Constraint,
            BehaviorKind::Procedure,
            BehaviorKind::Preference,
        ];
        let mut ids = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let id = format!("diverse-{kind}");
            let behavior = Behavior::new(&id, &id, kind, format!("{kind} content body"));
            if self.store.add_node(behavior).is_ok() {
                ids.push(id);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_database_starts_empty() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.is_empty());
        assert!(db.dir().exists());
    }

    #[test]
    fn seed_behaviors_reports_back_inserted_ids() {
        let mut db = TestDatabaseManager::new_temp();
        let ids = db.seed_behaviors(10);
        assert_eq!(ids.len(), 10);
        assert_eq!(db.node_count(), 10);
    }

    #[test]
    fn seed_diverse_covers_every_kind() {
        let mut db = TestDatabaseManager::new_temp();
        let ids = db.seed_diverse();
        assert_eq!(ids.len(), 4);
        assert_eq!(db.node_count(), 4);
    }
}
