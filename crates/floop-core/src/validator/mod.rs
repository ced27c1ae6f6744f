//! Referential integrity and cycle detection over a behavior graph.
//!
//! Validation is advisory: it returns a batch of issues and never aborts
//! an operation. Grounded on the iterative-traversal design note — cycle
//! detection here is DFS with explicit white/gray/black coloring rather
//! than recursion, so pathological graphs cannot blow the stack.

use std::collections::{HashMap, HashSet};

use crate::model::{Behavior, Edge};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    SelfReference,
    Dangling,
    Cycle,
    EdgeSourceDangling,
    EdgeTargetDangling,
    ZeroWeight,
    ZeroCreatedAt,
}

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub behavior_id: String,
    pub field: String,
    pub ref_id: Option<String>,
    pub issue: IssueKind,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Validate a full behavior + edge set. `external_ids` augments the known
/// id set so cross-store edges are not flagged as dangling by a single
/// store's validator.
pub fn validate(
    behaviors: &[Behavior],
    edges: &[Edge],
    external_ids: &HashSet<String>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let known: HashSet<&str> = behaviors.iter().map(|b| b.id.as_str()).collect();
    let is_known = |id: &str| known.contains(id) || external_ids.contains(id);

    let mut requires_graph: HashMap<&str, Vec<&str>> = HashMap::new();

    for b in behaviors {
        for (field, set) in [
            ("requires", &b.relationships.requires),
            ("overrides", &b.relationships.overrides),
            ("conflicts", &b.relationships.conflicts),
        ] {
            for target in set {
                if target == &b.id {
                    issues.push(ValidationIssue {
                        behavior_id: b.id.clone(),
                        field: field.to_string(),
                        ref_id: Some(target.clone()),
                        issue: IssueKind::SelfReference,
                    });
                    continue;
                }
                if !is_known(target) {
                    issues.push(ValidationIssue {
                        behavior_id: b.id.clone(),
                        field: field.to_string(),
                        ref_id: Some(target.clone()),
                        issue: IssueKind::Dangling,
                    });
                    continue;
                }
                if field == "requires" {
                    requires_graph
                        .entry(b.id.as_str())
                        .or_default()
                        .push(target.as_str());
                }
            }
        }
    }

    for e in edges {
        if !is_known(&e.source) {
            issues.push(ValidationIssue {
                behavior_id: e.source.clone(),
                field: "edge-source".to_string(),
                ref_id: Some(e.source.clone()),
                issue: IssueKind::EdgeSourceDangling,
            });
        }
        if !is_known(&e.target) {
            issues.push(ValidationIssue {
                behavior_id: e.target.clone(),
                field: "edge-target".to_string(),
                ref_id: Some(e.target.clone()),
                issue: IssueKind::EdgeTargetDangling,
            });
        }
        if e.weight <= 0.0 {
            issues.push(ValidationIssue {
                behavior_id: e.source.clone(),
                field: "edge-weight".to_string(),
                ref_id: Some(e.target.clone()),
                issue: IssueKind::ZeroWeight,
            });
        }
        if e.created_at.timestamp() == 0 {
            issues.push(ValidationIssue {
                behavior_id: e.source.clone(),
                field: "edge-created-at".to_string(),
                ref_id: Some(e.target.clone()),
                issue: IssueKind::ZeroCreatedAt,
            });
        }
    }

    issues.extend(detect_cycles(&requires_graph));
    issues
}

/// Iterative DFS cycle detection with white/gray/black coloring. Each
/// back-edge found produces one cycle issue naming the two adjacent nodes.
fn detect_cycles(graph: &HashMap<&str, Vec<&str>>) -> Vec<ValidationIssue> {
    let mut color: HashMap<&str, Color> = HashMap::new();
    for (&node, targets) in graph {
        color.entry(node).or_insert(Color::White);
        for &t in targets {
            color.entry(t).or_insert(Color::White);
        }
    }

    let mut issues = Vec::new();
    let nodes: Vec<&str> = color.keys().copied().collect();

    for start in nodes {
        if color[start] != Color::White {
            continue;
        }
        // (node, child-index) frames, explicit stack — no recursion.
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        color.insert(start, Color::Gray);

        while let Some(&mut (node, ref mut idx)) = stack.last_mut() {
            let children = graph.get(node).map(|v| v.as_slice()).unwrap_or(&[]);
            if *idx < children.len() {
                let child = children[*idx];
                *idx += 1;
                match color.get(child).copied().unwrap_or(Color::White) {
                    Color::White => {
                        color.insert(child, Color::Gray);
                        stack.push((child, 0));
                    }
                    Color::Gray => {
                        issues.push(ValidationIssue {
                            behavior_id: node.to_string(),
                            field: "requires".to_string(),
                            ref_id: Some(child.to_string()),
                            issue: IssueKind::Cycle,
                        });
                    }
                    Color::Black => {}
                }
            } else {
                color.insert(node, Color::Black);
                stack.pop();
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BehaviorKind;

    fn behavior(id: &str) -> Behavior {
        Behavior::new(id, id, BehaviorKind::Directive, "x")
    }

    #[test]
    fn mutual_requires_yields_a_cycle() {
        let mut a = behavior("a");
        a.relationships.requires.insert("b".to_string());
        let mut b = behavior("b");
        b.relationships.requires.insert("a".to_string());
        let issues = validate(&[a, b], &[], &HashSet::new());
        assert!(issues.iter().any(|i| i.issue == IssueKind::Cycle));
    }

    #[test]
    fn self_ref_is_not_a_cycle() {
        let mut a = behavior("a");
        a.relationships.requires.insert("a".to_string());
        let issues = validate(&[a], &[], &HashSet::new());
        assert!(issues.iter().any(|i| i.issue == IssueKind::SelfReference));
        assert!(!issues.iter().any(|i| i.issue == IssueKind::Cycle));
    }

    #[test]
    fn dangling_target_resolved_by_external_ids() {
        let mut a = behavior("a");
        a.relationships.requires.insert("ghost".to_string());
        let issues = validate(&[a.clone()], &[], &HashSet::new());
        assert!(issues.iter().any(|i| i.issue == IssueKind::Dangling));

        let mut external = HashSet::new();
        external.insert("ghost".to_string());
        let issues = validate(&[a], &[], &external);
        assert!(!issues.iter().any(|i| i.issue == IssueKind::Dangling));
    }
}
