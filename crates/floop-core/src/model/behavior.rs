//! The `Behavior` entity: a single rule the agent should consider.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::Value;

/// The four authorable kinds plus the three lifecycle variants a behavior
/// can transition into. Lifecycle transitions are explicit metadata writes,
/// not automatic — see [`Metadata::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Directive,
    Constraint,
    Procedure,
    Preference,
}

impl BehaviorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorKind::Directive => "directive",
            BehaviorKind::Constraint => "constraint",
            BehaviorKind::Procedure => "procedure",
            BehaviorKind::Preference => "preference",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "directive" => Some(BehaviorKind::Directive),
            "constraint" => Some(BehaviorKind::Constraint),
            "procedure" => Some(BehaviorKind::Procedure),
            "preference" => Some(BehaviorKind::Preference),
            _ => None,
        }
    }
}

impl std::fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A behavior's lifecycle state. `Live` behaviors are eligible for normal
/// ranking; the other three are terminal-ish markers applied by explicit
/// writes. Content is retained for audit in every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Live,
    Forgotten,
    Deprecated,
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Local,
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "global",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `when` predicate value: a literal, a list of alternatives, or a glob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhenValue {
    Literal(String),
    List(Vec<String>),
    Glob(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    pub canonical: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub requires: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub overrides: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub conflicts: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub times_activated: i64,
    #[serde(default)]
    pub times_followed: i64,
    #[serde(default)]
    pub times_confirmed: i64,
    #[serde(default)]
    pub times_overridden: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_confirmed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Stats {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            times_activated: 0,
            times_followed: 0,
            times_confirmed: 0,
            times_overridden: 0,
            last_activated: None,
            last_confirmed: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub confidence: f64,
    pub priority: i64,
    pub scope: Scope,
    #[serde(default)]
    pub lifecycle: LifecycleState,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            confidence: 0.6,
            priority: 0,
            scope: Scope::Local,
            lifecycle: LifecycleState::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl Metadata {
    /// Confidence clamped to `[0, 1]` per the stored-value invariant.
    pub fn clamped_confidence(&self) -> f64 {
        self.confidence.clamp(0.0, 1.0)
    }

    /// Priority clamped to `[0, 10]` for scoring purposes only; the stored
    /// value itself is not rewritten.
    pub fn clamped_priority(&self) -> i64 {
        self.priority.clamp(0, 10)
    }
}

/// The primary entity: a single rule the agent should follow, its
/// applicability predicates, relationships to other behaviors, and the
/// usage statistics that drive ranking.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    pub id: String,
    pub name: String,
    pub kind: BehaviorKind,
    pub content: Content,
    #[serde(default)]
    pub when: BTreeMap<String, WhenValue>,
    pub provenance: Provenance,
    #[serde(default)]
    pub relationships: Relationships,
    pub metadata: Metadata,
    pub stats: Stats,
    pub content_hash: String,
}

impl Behavior {
    /// Build a new behavior with zeroed stats and a freshly computed
    /// content hash. Callers typically fill in `when`/`relationships`
    /// afterward.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: BehaviorKind, canonical: impl Into<String>) -> Self {
        let canonical = canonical.into();
        let content_hash = content_hash(&canonical);
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            content: Content {
                canonical,
                ..Default::default()
            },
            when: BTreeMap::new(),
            provenance: Provenance::default(),
            relationships: Relationships::default(),
            metadata: Metadata::default(),
            stats: Stats::default(),
            content_hash,
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self.kind, BehaviorKind::Constraint)
    }

    pub fn is_live(&self) -> bool {
        matches!(self.metadata.lifecycle, LifecycleState::Live)
    }

    /// Recompute `content_hash` from the current canonical text. Called by
    /// the store before an insert/update to keep the digest trustworthy.
    pub fn recompute_content_hash(&mut self) {
        self.content_hash = content_hash(&self.content.canonical);
    }
}

/// Stable digest of canonical behavior text, used for store-wide
/// deduplication. SHA-256, truncated to 16 hex bytes for compactness.
pub fn content_hash(canonical: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_hashes_the_same() {
        assert_eq!(content_hash("Use context.Context"), content_hash("Use context.Context"));
        assert_ne!(content_hash("a"), content_hash("b"));
    }

    #[test]
    fn new_behavior_has_zeroed_stats() {
        let b = Behavior::new("b1", "b1", BehaviorKind::Directive, "Use context.Context");
        assert_eq!(b.stats.times_activated, 0);
        assert_eq!(b.metadata.confidence, 0.6);
        assert!(b.is_live());
    }

    #[test]
    fn kind_round_trips_via_serde() {
        let json = serde_json::to_string(&BehaviorKind::Constraint).unwrap();
        assert_eq!(json, "\"constraint\"");
        let back: BehaviorKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BehaviorKind::Constraint);
    }
}
