//! End-to-end tier planning: activation scores to a token-budgeted
//! injection plan, including the constraint-floor guarantee under a
//! tight budget.

use std::collections::HashMap;

use floop_core::model::BehaviorKind;
use floop_core::tier::{Tier, TierPlanner};
use floop_e2e_support::mocks::fixtures::TestDataFactory;

#[test]
fn a_starved_budget_still_keeps_the_constraint_above_name_only() {
    let planner = TierPlanner::default();

    let mut lookup = HashMap::new();
    lookup.insert("c1".to_string(), TestDataFactory::long_constraint("c1"));
    lookup.insert(
        "d1".to_string(),
        TestDataFactory::behavior("d1", BehaviorKind::Directive, &"filler content ".repeat(20)),
    );

    let activations = vec![("c1".to_string(), 0.95), ("d1".to_string(), 0.9)];
    let plan = planner.plan(&activations, &lookup, 10);

    let constraint_entry = plan
        .summarized
        .iter()
        .chain(plan.full.iter())
        .find(|e| e.id == "c1")
        .expect("constraint must never fall to name-only or omitted under budget pressure");
    assert!(constraint_entry.tier <= Tier::Summary);
}

#[test]
fn an_unbounded_budget_keeps_everything_at_its_natural_tier() {
    let planner = TierPlanner::default();
    let mut lookup = HashMap::new();
    lookup.insert("a".to_string(), TestDataFactory::behavior("a", BehaviorKind::Directive, "short"));

    let activations = vec![("a".to_string(), 0.8)];
    let plan = planner.plan(&activations, &lookup, usize::MAX);

    assert_eq!(plan.full.len(), 1);
    assert!(plan.summarized.is_empty());
}
