//! Bounded-hop spreading activation over the behavior edge set.
//!
//! Produces one of the possible inputs to the hybrid scorer's `activation`
//! parameter. The hybrid scorer itself is agnostic to how activation is
//! computed — this is a default producer, not a required dependency.

use std::collections::HashMap;

use crate::model::Edge;

#[derive(Debug, Clone, Copy)]
pub struct ActivationConfig {
    pub max_hops: usize,
    pub decay_per_hop: f64,
    pub min_activation: f64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            max_hops: 3,
            decay_per_hop: 0.5,
            min_activation: 0.01,
        }
    }
}

/// Spread activation outward from `seeds` (each starting at 1.0) across
/// `edges`, scaling by edge weight and the per-hop decay factor. A node's
/// activation is the maximum contribution it received along any path.
pub fn spread(edges: &[Edge], seeds: &[String], config: ActivationConfig) -> HashMap<String, f64> {
    let mut adjacency: HashMap<&str, Vec<(&str, f64)>> = HashMap::new();
    for e in edges {
        adjacency
            .entry(e.source.as_str())
            .or_default()
            .push((e.target.as_str(), e.weight));
        adjacency
            .entry(e.target.as_str())
            .or_default()
            .push((e.source.as_str(), e.weight));
    }

    let mut activation: HashMap<String, f64> = HashMap::new();
    let mut frontier: Vec<(String, f64)> = Vec::new();

    for seed in seeds {
        activation.insert(seed.clone(), 1.0);
        frontier.push((seed.clone(), 1.0));
    }

    for _ in 0..config.max_hops {
        if frontier.is_empty() {
            break;
        }
        let mut next_frontier = Vec::new();
        for (node, level) in &frontier {
            let Some(neighbors) = adjacency.get(node.as_str()) else {
                continue;
            };
            for (neighbor, weight) in neighbors {
                let contributed = level * weight * config.decay_per_hop;
                if contributed < config.min_activation {
                    continue;
                }
                let entry = activation.entry(neighbor.to_string()).or_insert(0.0);
                if contributed > *entry {
                    *entry = contributed;
                    next_frontier.push((neighbor.to_string(), contributed));
                }
            }
        }
        frontier = next_frontier;
    }

    activation
}
