//! The `Edge` entity: a directed, typed, weighted link between behaviors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Requires,
    Overrides,
    Conflicts,
    SimilarTo,
    LearnedFrom,
    CoActivated,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Requires => "requires",
            EdgeKind::Overrides => "overrides",
            EdgeKind::Conflicts => "conflicts",
            EdgeKind::SimilarTo => "similar-to",
            EdgeKind::LearnedFrom => "learned-from",
            EdgeKind::CoActivated => "co-activated",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "requires" => Some(EdgeKind::Requires),
            "overrides" => Some(EdgeKind::Overrides),
            "conflicts" => Some(EdgeKind::Conflicts),
            "similar-to" => Some(EdgeKind::SimilarTo),
            "learned-from" => Some(EdgeKind::LearnedFrom),
            "co-activated" => Some(EdgeKind::CoActivated),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
    Both,
}

/// A directed, typed, weighted link between two behavior ids. Primary key
/// is `(source, target, kind)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            weight,
            created_at: Utc::now(),
            last_activated: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Validate the edge invariant `0 < weight <= 1 && created_at != 0`.
    /// Enforced uniformly by every backend — see the Open Questions
    /// resolution in `DESIGN.md` for why this departs from the source's
    /// inconsistent per-backend behavior.
    pub fn validate(&self) -> StoreResult<()> {
        if !(self.weight > 0.0 && self.weight <= 1.0) {
            return Err(StoreError::InvalidEdgeWeight);
        }
        if self.created_at.timestamp() == 0 {
            return Err(StoreError::InvalidEdgeCreatedAt);
        }
        Ok(())
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_over_one_weight() {
        let mut e = Edge::new("a", "b", EdgeKind::Requires, 0.0);
        assert!(e.validate().is_err());
        e.weight = 1.5;
        assert!(e.validate().is_err());
        e.weight = 1.0;
        assert!(e.validate().is_ok());
    }

    #[test]
    fn kind_as_str_uses_kebab_case() {
        assert_eq!(EdgeKind::SimilarTo.as_str(), "similar-to");
        assert_eq!(EdgeKind::CoActivated.as_str(), "co-activated");
    }
}
