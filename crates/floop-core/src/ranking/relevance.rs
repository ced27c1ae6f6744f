//! Multi-signal relevance scorer: context match, usage, recency,
//! confidence, and priority, combined and multiplied by a kind boost.

use std::collections::HashMap;

use chrono::Utc;

use crate::model::{Behavior, BehaviorKind, Context};

use super::decay::{decay_from, exponential};

#[derive(Debug, Clone, Copy)]
pub struct RelevanceWeights {
    pub context: f64,
    pub usage: f64,
    pub recency: f64,
    pub confidence: f64,
    pub priority: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            context: 0.25,
            usage: 0.25,
            recency: 0.15,
            confidence: 0.15,
            priority: 0.20,
        }
    }
}

impl RelevanceWeights {
    /// Normalize the five weights to sum to 1.
    pub fn normalized(&self) -> Self {
        let sum = self.context + self.usage + self.recency + self.confidence + self.priority;
        if sum <= 0.0 {
            return *self;
        }
        Self {
            context: self.context / sum,
            usage: self.usage / sum,
            recency: self.recency / sum,
            confidence: self.confidence / sum,
            priority: self.priority / sum,
        }
    }

    pub fn min_weight(&self) -> f64 {
        [self.context, self.usage, self.recency, self.confidence, self.priority]
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone)]
pub struct KindBoost {
    pub constraint: f64,
    pub directive: f64,
    pub procedure: f64,
    pub preference: f64,
    pub custom: HashMap<String, f64>,
}

impl Default for KindBoost {
    fn default() -> Self {
        Self {
            constraint: 2.0,
            directive: 1.5,
            procedure: 1.2,
            preference: 1.0,
            custom: HashMap::new(),
        }
    }
}

impl KindBoost {
    pub fn for_kind(&self, kind: BehaviorKind) -> f64 {
        match kind {
            BehaviorKind::Constraint => self.constraint,
            BehaviorKind::Directive => self.directive,
            BehaviorKind::Procedure => self.procedure,
            BehaviorKind::Preference => self.preference,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    pub weights: RelevanceWeights,
    pub kind_boost: KindBoost,
    pub recency_half_life_days: f64,
}

impl RelevanceScorer {
    pub fn new(weights: RelevanceWeights, kind_boost: KindBoost) -> Self {
        Self {
            weights,
            kind_boost,
            recency_half_life_days: 7.0,
        }
    }

    pub fn score(&self, behavior: &Behavior, context: Option<&Context>) -> f64 {
        let w = self.weights.normalized();

        let context_score = match context {
            None => 0.5,
            Some(ctx) => self.context_match(behavior, ctx),
        };
        let usage_score = self.usage_score(behavior);
        let recency_score = self.recency_score(behavior);
        let confidence_score = behavior.metadata.clamped_confidence();
        let priority_score = behavior.metadata.clamped_priority() as f64 / 10.0;

        let weighted = w.context * context_score
            + w.usage * usage_score
            + w.recency * recency_score
            + w.confidence * confidence_score
            + w.priority * priority_score;

        weighted * self.kind_boost.for_kind(behavior.kind)
    }

    fn context_match(&self, behavior: &Behavior, ctx: &Context) -> f64 {
        if behavior.when.is_empty() {
            return 0.5;
        }
        let total = behavior.when.len() as f64;
        let matches = behavior
            .when
            .keys()
            .filter(|key| ctx.lookup(key).map(|v| !v.is_empty()).unwrap_or(false))
            .count() as f64;
        let score = matches / total + (0.1 * total).min(0.3);
        score.clamp(0.0, 1.0)
    }

    fn usage_score(&self, behavior: &Behavior) -> f64 {
        let activated = behavior.stats.times_activated;
        if activated == 0 {
            return 0.5;
        }
        let followed = behavior.stats.times_followed;
        let confirmed = behavior.stats.times_confirmed;
        let overridden = behavior.stats.times_overridden;
        if followed == 0 && confirmed == 0 && overridden == 0 {
            return 0.5;
        }
        let a = activated as f64;
        let score = (followed + confirmed) as f64 / a - 0.5 * overridden as f64 / a;
        score.clamp(0.0, 1.0)
    }

    fn recency_score(&self, behavior: &Behavior) -> f64 {
        let now = Utc::now();
        let candidate = [
            behavior.stats.last_confirmed,
            behavior.stats.last_activated,
            Some(behavior.stats.updated_at),
            Some(behavior.stats.created_at),
        ]
        .into_iter()
        .flatten()
        .max();
        decay_from(candidate, now, |e| exponential(e, self.recency_half_life_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn behavior(kind: BehaviorKind) -> Behavior {
        Behavior::new("b1", "b1", kind, "Use context.Context")
    }

    #[test]
    fn no_when_predicates_hits_floor() {
        let scorer = RelevanceScorer::default();
        let b = behavior(BehaviorKind::Constraint);
        let score = scorer.score(&b, None);
        let min_w = scorer.weights.normalized().min_weight();
        assert!(score >= min_w * 0.5 * scorer.kind_boost.for_kind(b.kind) - 1e-9);
    }

    #[test]
    fn kind_boost_orders_constraint_above_preference() {
        let scorer = RelevanceScorer::default();
        let constraint = scorer.score(&behavior(BehaviorKind::Constraint), None);
        let directive = scorer.score(&behavior(BehaviorKind::Directive), None);
        let procedure = scorer.score(&behavior(BehaviorKind::Procedure), None);
        let preference = scorer.score(&behavior(BehaviorKind::Preference), None);
        assert!(constraint > directive);
        assert!(directive > procedure);
        assert!(procedure > preference);
    }
}
