//! End-to-end ranking: PageRank over a persisted graph, relevance scoring
//! with kind boosts, and the hybrid combiner built on top of both.

use std::collections::HashMap;

use floop_core::model::{BehaviorKind, Direction, EdgeKind};
use floop_core::ranking::{page_rank, HybridScorer, PageRankConfig, RelevanceScorer};
use floop_core::store::GraphStore;
use floop_e2e_support::harness::db_manager::TestDatabaseManager;
use floop_e2e_support::mocks::fixtures::TestDataFactory;

#[test]
fn a_coordinating_hub_outranks_its_leaves() {
    let mut db = TestDatabaseManager::new_temp();
    let leaves = ["a", "b", "c", "d", "e"];
    TestDataFactory::seed_hub_and_leaves(&db.store, "hub", &leaves);

    let node_ids: Vec<String> = std::iter::once("hub".to_string())
        .chain(leaves.iter().map(|s| s.to_string()))
        .collect();
    let edges = db.store.get_edges("hub", Direction::Outbound, Some(EdgeKind::Requires)).unwrap();

    let scores = page_rank(&node_ids, &edges, PageRankConfig::default(), None);

    assert!((scores["hub"] - 1.0).abs() < 1e-6);
    for leaf in leaves {
        assert!(scores[leaf] < scores["hub"]);
    }
}

#[test]
fn constraint_kind_boost_outranks_preference_with_equal_inputs() {
    let scorer = RelevanceScorer::default();
    let constraint = TestDataFactory::behavior("c", BehaviorKind::Constraint, "never do x");
    let preference = TestDataFactory::behavior("p", BehaviorKind::Preference, "never do x");

    assert!(scorer.score(&constraint, None) > scorer.score(&preference, None));
}

#[test]
fn hybrid_score_batch_is_sorted_descending_by_final_score() {
    let mut db = TestDatabaseManager::new_temp();
    let ids = db.seed_behaviors(3);
    let behaviors: Vec<_> = ids.iter().map(|id| db.store.get_node(id).unwrap().unwrap()).collect();

    let mut activations = HashMap::new();
    activations.insert(ids[0].clone(), 0.1);
    activations.insert(ids[1].clone(), 0.9);
    activations.insert(ids[2].clone(), 0.5);

    let hybrid = HybridScorer::default();
    let results = hybrid.score_batch(&behaviors, None, None, &activations, &HashMap::new());

    assert_eq!(results[0].id, ids[1]);
    assert_eq!(results[1].id, ids[2]);
    assert_eq!(results[2].id, ids[0]);
}
