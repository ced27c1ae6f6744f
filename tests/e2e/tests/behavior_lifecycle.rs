//! End-to-end behavior lifecycle: insertion, content-hash deduplication,
//! cascading delete, and cycle detection over a `requires` graph.

use std::collections::HashSet;

use floop_core::model::{BehaviorKind, Direction};
use floop_core::store::GraphStore;
use floop_e2e_support::harness::db_manager::TestDatabaseManager;
use floop_e2e_support::mocks::fixtures::TestDataFactory;

#[test]
fn duplicate_content_is_rejected_by_hash() {
    let mut db = TestDatabaseManager::new_temp();
    db.store
        .add_node(TestDataFactory::behavior("a", BehaviorKind::Directive, "Use context.Context for cancellation"))
        .unwrap();

    let err = db
        .store
        .add_node(TestDataFactory::behavior("b", BehaviorKind::Directive, "Use context.Context for cancellation"))
        .unwrap_err();

    assert!(matches!(err, floop_core::error::StoreError::DuplicateContent(ref id) if id == "a"));
    assert_eq!(db.node_count(), 1);
}

#[test]
fn deleting_a_node_cascades_to_its_edges() {
    let mut db = TestDatabaseManager::new_temp();
    TestDataFactory::seed_requires_chain(&db.store, &["a", "b", "c"]);

    db.store.delete_node("b").unwrap();

    assert!(db.store.get_edges("a", Direction::Outbound, None).unwrap().is_empty());
    assert!(db.store.get_edges("c", Direction::Inbound, None).unwrap().is_empty());
    assert_eq!(db.node_count(), 2);
}

#[test]
fn traverse_respects_a_depth_bound() {
    let mut db = TestDatabaseManager::new_temp();
    TestDataFactory::seed_requires_chain(&db.store, &["a", "b", "c", "d", "e"]);

    let reached = db
        .store
        .traverse("a", &[floop_core::model::EdgeKind::Requires], Direction::Outbound, 2, None)
        .unwrap();
    let reached: HashSet<&str> = reached.iter().map(|s| s.as_str()).collect();

    assert!(reached.contains("a"));
    assert!(reached.contains("b"));
    assert!(reached.contains("c"));
    assert!(!reached.contains("d"));
    assert!(!reached.contains("e"));
}

#[test]
fn mutual_requires_is_flagged_as_a_cycle() {
    let mut db = TestDatabaseManager::new_temp();
    TestDataFactory::seed_cycle(&db.store, "a", "b");

    let stats = db.store.as_stats_store().expect("sqlite store exposes stats");
    let issues = stats.validate_behavior_graph(&HashSet::new()).unwrap();

    assert!(issues.iter().any(|i| i.issue == floop_core::validator::IssueKind::Cycle));
}
