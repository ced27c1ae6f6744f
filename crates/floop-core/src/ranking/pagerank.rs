//! Iterative PageRank over the behavior edge set.

use std::collections::HashMap;

use crate::model::Edge;
use crate::store::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct PageRankConfig {
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Compute PageRank over every node touched by `edges`, restricted to
/// `node_ids` as the full node universe (isolated nodes still receive a
/// score). Final scores are normalized so the maximum is exactly 1.0.
pub fn page_rank(
    node_ids: &[String],
    edges: &[Edge],
    config: PageRankConfig,
    cancel: Option<&CancellationToken>,
) -> HashMap<String, f64> {
    if node_ids.is_empty() {
        return HashMap::new();
    }
    if node_ids.len() == 1 {
        let mut m = HashMap::new();
        m.insert(node_ids[0].clone(), 1.0);
        return m;
    }

    let n = node_ids.len() as f64;
    let index: HashMap<&str, usize> = node_ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    let mut out_degree = vec![0usize; node_ids.len()];
    let mut inbound: Vec<Vec<usize>> = vec![Vec::new(); node_ids.len()];

    // Rank accumulates at an edge's source from its target: a behavior that
    // requires/overrides many others is the coordinating node and ranks
    // above what it merely points at.
    for e in edges {
        let (Some(&s), Some(&t)) = (index.get(e.source.as_str()), index.get(e.target.as_str())) else {
            continue;
        };
        out_degree[t] += 1;
        inbound[s].push(t);
    }

    let mut scores = vec![1.0 / n; node_ids.len()];
    let base = (1.0 - config.damping) / n;

    for _ in 0..config.max_iterations {
        if cancel.is_some_and(|c| c.is_cancelled()) {
            break;
        }
        let dangling_mass: f64 = (0..node_ids.len())
            .filter(|&i| out_degree[i] == 0)
            .map(|i| scores[i])
            .sum();
        let dangling_share = config.damping * dangling_mass / n;

        let mut next = vec![0.0; node_ids.len()];
        for (i, slot) in next.iter_mut().enumerate() {
            let incoming: f64 = inbound[i]
                .iter()
                .map(|&s| scores[s] / out_degree[s] as f64)
                .sum();
            *slot = base + dangling_share + config.damping * incoming;
        }

        let delta: f64 = scores.iter().zip(next.iter()).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < config.tolerance {
            break;
        }
    }

    let max = scores.iter().cloned().fold(0.0_f64, f64::max);
    let mut result = HashMap::with_capacity(node_ids.len());
    for (id, score) in node_ids.iter().zip(scores.into_iter()) {
        let normalized = if max > 0.0 { score / max } else { 0.0 };
        result.insert(id.clone(), normalized);
    }
    result
}
