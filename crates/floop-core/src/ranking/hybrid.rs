//! Weighted combination of context relevance, activation, and PageRank.

use std::collections::HashMap;

use crate::model::{Behavior, Context};

use super::relevance::RelevanceScorer;

#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    pub context: f64,
    pub activation: f64,
    pub pagerank: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            context: 0.5,
            activation: 0.3,
            pagerank: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HybridScore {
    pub id: String,
    pub final_score: f64,
    pub context_score: f64,
    pub activation: f64,
    pub pagerank: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HybridScorer {
    pub weights: HybridWeights,
}

impl HybridScorer {
    pub fn new(weights: HybridWeights) -> Self {
        Self { weights }
    }

    pub fn score(
        &self,
        behavior: Option<&Behavior>,
        context: Option<&Context>,
        relevance: Option<&RelevanceScorer>,
        activation: f64,
        pagerank: Option<f64>,
    ) -> HybridScore {
        let id = behavior.map(|b| b.id.clone()).unwrap_or_default();
        let Some(behavior) = behavior else {
            return HybridScore {
                id,
                final_score: 0.0,
                context_score: 0.0,
                activation: 0.0,
                pagerank: 0.0,
            };
        };
        let context_score = match relevance {
            Some(scorer) => scorer.score(behavior, context),
            None => 0.0,
        };
        let pagerank = pagerank.unwrap_or(0.0);

        let final_score = self.weights.context * context_score
            + self.weights.activation * activation
            + self.weights.pagerank * pagerank;

        HybridScore {
            id: behavior.id.clone(),
            final_score,
            context_score,
            activation,
            pagerank,
        }
    }

    /// Score a batch of behaviors and return results sorted by `final`
    /// descending.
    pub fn score_batch(
        &self,
        behaviors: &[Behavior],
        context: Option<&Context>,
        relevance: Option<&RelevanceScorer>,
        activations: &HashMap<String, f64>,
        pagerank: &HashMap<String, f64>,
    ) -> Vec<HybridScore> {
        let mut scores: Vec<HybridScore> = behaviors
            .iter()
            .map(|b| {
                let activation = activations.get(&b.id).copied().unwrap_or(0.0);
                let pr = pagerank.get(&b.id).copied();
                self.score(Some(b), context, relevance, activation, pr)
            })
            .collect();
        scores.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BehaviorKind;

    #[test]
    fn nil_behavior_is_all_zero() {
        let scorer = HybridScorer::default();
        let result = scorer.score(None, None, None, 0.9, Some(0.5));
        assert_eq!(result.final_score, 0.0);
    }

    #[test]
    fn nil_relevance_zeros_context_component() {
        let scorer = HybridScorer::default();
        let b = Behavior::new("b1", "b1", BehaviorKind::Directive, "x");
        let result = scorer.score(Some(&b), None, None, 0.5, Some(0.5));
        assert_eq!(result.context_score, 0.0);
    }

    #[test]
    fn batch_sorts_descending() {
        let scorer = HybridScorer::default();
        let behaviors = vec![
            Behavior::new("low", "low", BehaviorKind::Directive, "x"),
            Behavior::new("high", "high", BehaviorKind::Directive, "y"),
        ];
        let mut activations = HashMap::new();
        activations.insert("low".to_string(), 0.1);
        activations.insert("high".to_string(), 0.9);
        let results = scorer.score_batch(&behaviors, None, None, &activations, &HashMap::new());
        assert_eq!(results[0].id, "high");
    }
}
