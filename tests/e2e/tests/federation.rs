//! End-to-end federation: explicit single-scope writes, local-wins reads
//! on id collision, and cross-store edge routing to global.

use std::sync::Arc;

use floop_core::model::{BehaviorKind, Direction, EdgeKind, Scope};
use floop_core::store::{FederatingStore, GraphStore, InMemoryStore};
use floop_e2e_support::mocks::fixtures::TestDataFactory;

fn federated() -> FederatingStore {
    FederatingStore::new(Some(Arc::new(InMemoryStore::new())), Arc::new(InMemoryStore::new()))
}

#[test]
fn explicit_scope_targets_exactly_one_backing_store() {
    let fed = federated();
    fed.add_node_to_scope(TestDataFactory::behavior("local-only", BehaviorKind::Directive, "local body"), Scope::Local)
        .unwrap();
    fed.add_node_to_scope(TestDataFactory::behavior("global-only", BehaviorKind::Directive, "global body"), Scope::Global)
        .unwrap();

    assert!(fed.get_node("local-only").unwrap().is_some());
    assert!(fed.get_node("global-only").unwrap().is_some());
}

#[test]
fn reading_an_id_present_in_both_stores_prefers_local() {
    let fed = federated();
    let mut local = TestDataFactory::behavior("shared", BehaviorKind::Directive, "local wins here");
    local.id = "shared".to_string();
    fed.add_node_to_scope(local, Scope::Local).unwrap();

    let mut global = TestDataFactory::behavior("shared", BehaviorKind::Directive, "global copy, different content");
    global.id = "shared".to_string();
    fed.add_node_to_scope(global, Scope::Global).unwrap();

    let resolved = fed.get_node("shared").unwrap().unwrap();
    assert_eq!(resolved.content.canonical, "local wins here");
}

#[test]
fn an_edge_between_a_local_and_a_global_node_lands_in_global() {
    let fed = federated();
    fed.add_node_to_scope(TestDataFactory::behavior("local-end", BehaviorKind::Directive, "local"), Scope::Local)
        .unwrap();
    fed.add_node_to_scope(TestDataFactory::behavior("global-end", BehaviorKind::Directive, "global"), Scope::Global)
        .unwrap();

    fed.add_edge(floop_core::model::Edge::new("local-end", "global-end", EdgeKind::Requires, 1.0))
        .unwrap();

    let edges = fed.get_edges("local-end", Direction::Outbound, None).unwrap();
    assert_eq!(edges.len(), 1);
}
