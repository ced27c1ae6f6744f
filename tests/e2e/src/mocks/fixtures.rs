//! Test data factory
//!
//! Builds the small behavior/edge graphs exercised by the integration
//! tests: linear requires chains, a coordinating hub with leaves, a
//! mutual-requires cycle, and a verbose constraint for tier-planning
//! scenarios.

use floop_core::model::{Behavior, BehaviorKind, Edge, EdgeKind};
use floop_core::store::GraphStore;

pub struct TestDataFactory;

impl TestDataFactory {
    pub fn behavior(id: &str, kind: BehaviorKind, content: &str) -> Behavior {
        Behavior::new(id, id, kind, content)
    }

    /// Insert a chain `a -> b -> c -> ...` of `requires` edges over freshly
    /// created directive behaviors, in chain order.
    pub fn seed_requires_chain(store: &dyn GraphStore, ids: &[&str]) -> Vec<String> {
        for id in ids {
            store
                .add_node(Self::behavior(id, BehaviorKind::Directive, &format!("{id} body")))
                .unwrap();
        }
        for pair in ids.windows(2) {
            store.add_edge(Edge::new(pair[0], pair[1], EdgeKind::Requires, 1.0)).unwrap();
        }
        ids.iter().map(|s| s.to_string()).collect()
    }

    /// Insert a coordinating `hub` behavior that requires each of `leaves`.
    pub fn seed_hub_and_leaves(store: &dyn GraphStore, hub: &str, leaves: &[&str]) {
        store
            .add_node(Self::behavior(hub, BehaviorKind::Directive, "coordinates the others"))
            .unwrap();
        for leaf in leaves {
            store
                .add_node(Self::behavior(leaf, BehaviorKind::Directive, &format!("{leaf} body")))
                .unwrap();
            store.add_edge(Edge::new(hub, *leaf, EdgeKind::Requires, 1.0)).unwrap();
        }
    }

    /// A two-node mutual-requires cycle.
    pub fn seed_cycle(store: &dyn GraphStore, a: &str, b: &str) {
        store.add_node(Self::behavior(a, BehaviorKind::Directive, "a body")).unwrap();
        store.add_node(Self::behavior(b, BehaviorKind::Directive, "b body")).unwrap();
        store.add_edge(Edge::new(a, b, EdgeKind::Requires, 1.0)).unwrap();
        store.add_edge(Edge::new(b, a, EdgeKind::Requires, 1.0)).unwrap();
    }

    /// A constraint whose canonical text is long enough to be
    /// non-trivially summarized or truncated by the tier planner.
    pub fn long_constraint(id: &str) -> Behavior {
        Self::behavior(
            id,
            BehaviorKind::Constraint,
            "Never commit secrets to the repository. For example, API keys, \
             passwords, and private certificates must never appear in tracked \
             files, even in example configuration.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floop_core::model::Direction;
    use floop_core::store::InMemoryStore;

    #[test]
    fn requires_chain_links_every_adjacent_pair() {
        let store = InMemoryStore::new();
        TestDataFactory::seed_requires_chain(&store, &["a", "b", "c"]);
        assert_eq!(store.get_edges("a", Direction::Outbound, None).unwrap().len(), 1);
        assert_eq!(store.get_edges("c", Direction::Inbound, None).unwrap().len(), 1);
    }

    #[test]
    fn hub_and_leaves_creates_one_edge_per_leaf() {
        let store = InMemoryStore::new();
        TestDataFactory::seed_hub_and_leaves(&store, "hub", &["a", "b", "c"]);
        assert_eq!(store.get_edges("hub", Direction::Outbound, None).unwrap().len(), 3);
    }
}
