//! Converts per-behavior activation into a token-budgeted injection plan.

use std::collections::HashMap;

use crate::model::{Behavior, BehaviorKind};

use super::summarizer::Summarizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Full,
    Summary,
    NameOnly,
    Omitted,
}

impl Tier {
    fn demote(self) -> Self {
        match self {
            Tier::Full => Tier::Summary,
            Tier::Summary => Tier::NameOnly,
            Tier::NameOnly => Tier::Omitted,
            Tier::Omitted => Tier::Omitted,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TierThresholds {
    pub full: f64,
    pub summary: f64,
    pub name_only: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            full: 0.7,
            summary: 0.3,
            name_only: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    pub thresholds: TierThresholds,
    pub constraint_min_tier: Tier,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            constraint_min_tier: Tier::Summary,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannedEntry {
    pub id: String,
    pub tier: Tier,
    pub activation: f64,
    pub content: String,
    pub token_cost: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InjectionPlan {
    pub full: Vec<PlannedEntry>,
    pub summarized: Vec<PlannedEntry>,
    pub name_only: Vec<PlannedEntry>,
    pub omitted: Vec<PlannedEntry>,
    pub total_tokens: usize,
}

fn token_estimate(content: &str) -> usize {
    content.len().div_ceil(4)
}

fn map_tier(activation: f64, kind: BehaviorKind, thresholds: &TierThresholds, floor: Tier) -> Tier {
    let mut tier = if activation >= thresholds.full {
        Tier::Full
    } else if activation >= thresholds.summary {
        Tier::Summary
    } else if activation >= thresholds.name_only {
        Tier::NameOnly
    } else {
        Tier::Omitted
    };
    if kind == BehaviorKind::Constraint && tier > floor {
        tier = floor;
    }
    tier
}

const SUMMARY_TIER_TRUNCATE_AT: usize = 57;

/// Summary-tier content: the stored summary if the behavior has one,
/// otherwise the canonical text cut to 57 chars with an ellipsis appended.
/// Unrelated to [`Summarizer`], which drives the separate compression
/// pipeline used elsewhere.
fn summary_tier_content(behavior: &Behavior) -> String {
    match &behavior.content.summary {
        Some(summary) => summary.clone(),
        None => {
            let canonical = &behavior.content.canonical;
            if canonical.chars().count() <= SUMMARY_TIER_TRUNCATE_AT {
                canonical.clone()
            } else {
                let truncated: String = canonical.chars().take(SUMMARY_TIER_TRUNCATE_AT).collect();
                format!("{truncated}…")
            }
        }
    }
}

fn render(behavior: &Behavior, tier: Tier) -> String {
    match tier {
        Tier::Full => behavior.content.canonical.clone(),
        Tier::Summary => summary_tier_content(behavior),
        Tier::NameOnly => {
            let tags: String = behavior.content.tags.iter().map(|t| format!(" #{t}")).collect();
            format!("`{}` [{}]{}", behavior.name, behavior.kind, tags)
        }
        Tier::Omitted => String::new(),
    }
}

/// Activation-threshold allocator with budget-first demotion.
pub struct TierPlanner {
    pub config: PlannerConfig,
    pub summarizer: Summarizer,
}

impl Default for TierPlanner {
    fn default() -> Self {
        Self {
            config: PlannerConfig::default(),
            summarizer: Summarizer::default(),
        }
    }
}

impl TierPlanner {
    pub fn new(config: PlannerConfig, summarizer: Summarizer) -> Self {
        Self { config, summarizer }
    }

    pub fn plan(
        &self,
        activations: &[(String, f64)],
        lookup: &HashMap<String, Behavior>,
        budget: usize,
    ) -> InjectionPlan {
        struct Working {
            id: String,
            activation: f64,
            tier: Tier,
            floor: Tier,
        }

        let mut working: Vec<Working> = activations
            .iter()
            .filter_map(|(id, activation)| {
                let behavior = lookup.get(id)?;
                let floor = if behavior.kind == BehaviorKind::Constraint {
                    self.config.constraint_min_tier
                } else {
                    Tier::Omitted
                };
                let tier = map_tier(*activation, behavior.kind, &self.config.thresholds, floor);
                Some(Working {
                    id: id.clone(),
                    activation: *activation,
                    tier,
                    floor,
                })
            })
            .collect();

        let render_and_cost = |id: &str, tier: Tier| -> (String, usize) {
            let behavior = &lookup[id];
            let content = render(behavior, tier);
            let cost = token_estimate(&content);
            (content, cost)
        };

        let costs: HashMap<String, usize> = working
            .iter()
            .map(|w| (w.id.clone(), render_and_cost(&w.id, w.tier).1))
            .collect();
        let mut total: usize = costs.values().sum();

        if total > budget {
            working.sort_by(|a, b| a.activation.partial_cmp(&b.activation).unwrap_or(std::cmp::Ordering::Equal));
            loop {
                // Lowest-activation entry that can still be demoted (tier
                // strictly below its floor in the ordering Full>Summary>
                // NameOnly>Omitted, i.e. `tier < floor` numerically since
                // Full=0 sorts before Omitted=3).
                let target = working.iter().position(|w| w.tier < w.floor);
                let Some(idx) = target else {
                    break;
                };
                working[idx].tier = working[idx].tier.demote();

                total = working.iter().map(|w| render_and_cost(&w.id, w.tier).1).sum();
                if total <= budget {
                    break;
                }
            }
        }

        let mut plan = InjectionPlan::default();
        for w in &working {
            let (content, cost) = render_and_cost(&w.id, w.tier);
            let entry = PlannedEntry {
                id: w.id.clone(),
                tier: w.tier,
                activation: w.activation,
                content,
                token_cost: cost,
            };
            match w.tier {
                Tier::Full => plan.full.push(entry),
                Tier::Summary => plan.summarized.push(entry),
                Tier::NameOnly => plan.name_only.push(entry),
                Tier::Omitted => plan.omitted.push(entry),
            }
        }
        plan.total_tokens = plan
            .full
            .iter()
            .chain(plan.summarized.iter())
            .chain(plan.name_only.iter())
            .map(|e| e.token_cost)
            .sum();
        plan
    }
}

/// Budget-proportional allocator: fixed percentages (60% full / 30%
/// summary / 10% overhead) with a constraints-always-full guarantee and a
/// minimum full-tier count.
pub struct BudgetFirstAllocator {
    pub full_share: f64,
    pub summary_share: f64,
    pub min_full: usize,
    pub summarizer: Summarizer,
}

impl Default for BudgetFirstAllocator {
    fn default() -> Self {
        Self {
            full_share: 0.6,
            summary_share: 0.3,
            min_full: 1,
            summarizer: Summarizer::default(),
        }
    }
}

impl BudgetFirstAllocator {
    pub fn plan(
        &self,
        activations: &[(String, f64)],
        lookup: &HashMap<String, Behavior>,
        budget: usize,
    ) -> InjectionPlan {
        let mut sorted: Vec<&(String, f64)> = activations.iter().collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let full_budget = (budget as f64 * self.full_share) as usize;
        let summary_budget = (budget as f64 * self.summary_share) as usize;

        let mut plan = InjectionPlan::default();
        let mut full_spent = 0usize;
        let mut summary_spent = 0usize;

        for (idx, (id, activation)) in sorted.iter().enumerate() {
            let Some(behavior) = lookup.get(id) else { continue };
            let is_constraint = behavior.kind == BehaviorKind::Constraint;
            let must_be_full = is_constraint || idx < self.min_full;

            let full_content = behavior.content.canonical.clone();
            let full_cost = token_estimate(&full_content);

            if must_be_full || full_spent + full_cost <= full_budget {
                full_spent += full_cost;
                plan.full.push(PlannedEntry {
                    id: id.clone(),
                    tier: Tier::Full,
                    activation: *activation,
                    content: full_content,
                    token_cost: full_cost,
                });
                continue;
            }

            let summary = self.summarizer.summarize(behavior);
            let summary_cost = token_estimate(&summary);
            if summary_spent + summary_cost <= summary_budget {
                summary_spent += summary_cost;
                plan.summarized.push(PlannedEntry {
                    id: id.clone(),
                    tier: Tier::Summary,
                    activation: *activation,
                    content: summary,
                    token_cost: summary_cost,
                });
                continue;
            }

            let name_only = render(behavior, Tier::NameOnly);
            let cost = token_estimate(&name_only);
            plan.name_only.push(PlannedEntry {
                id: id.clone(),
                tier: Tier::NameOnly,
                activation: *activation,
                content: name_only,
                token_cost: cost,
            });
        }

        plan.total_tokens = plan
            .full
            .iter()
            .chain(plan.summarized.iter())
            .chain(plan.name_only.iter())
            .map(|e| e.token_cost)
            .sum();
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Behavior;

    fn behavior(id: &str, kind: BehaviorKind) -> Behavior {
        let mut b = Behavior::new(id, id, kind, &"x".repeat(80));
        b.content.tags = vec!["t1".to_string()];
        b
    }

    #[test]
    fn unbounded_budget_matches_tier_mapping() {
        let planner = TierPlanner::default();
        let mut lookup = HashMap::new();
        lookup.insert("a".to_string(), behavior("a", BehaviorKind::Directive));
        let activations = vec![("a".to_string(), 0.8)];
        let plan = planner.plan(&activations, &lookup, usize::MAX);
        assert_eq!(plan.full.len(), 1);
    }

    #[test]
    fn demotes_under_tight_budget() {
        let planner = TierPlanner::default();
        let mut lookup = HashMap::new();
        lookup.insert("a".to_string(), behavior("a", BehaviorKind::Directive));
        lookup.insert("b".to_string(), behavior("b", BehaviorKind::Directive));
        lookup.insert("c".to_string(), behavior("c", BehaviorKind::Directive));
        let activations = vec![
            ("a".to_string(), 0.9),
            ("b".to_string(), 0.8),
            ("c".to_string(), 0.7),
        ];
        let plan = planner.plan(&activations, &lookup, 30);
        assert!(plan.total_tokens <= 30);
        assert!(plan.full.len() < 3);
    }

    #[test]
    fn constraint_never_drops_below_floor() {
        let planner = TierPlanner::default();
        let mut lookup = HashMap::new();
        lookup.insert("c1".to_string(), behavior("c1", BehaviorKind::Constraint));
        let activations = vec![("c1".to_string(), 0.01)];
        let plan = planner.plan(&activations, &lookup, 1);
        assert_eq!(plan.summarized.len(), 1);
        assert!(plan.omitted.is_empty());
    }
}
