//! Dirty-set tracking for incremental JSONL export.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyOp {
    Insert,
    Update,
    Delete,
    ReplacedByTrigger,
}

impl DirtyOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirtyOp::Insert => "insert",
            DirtyOp::Update => "update",
            DirtyOp::Delete => "delete",
            DirtyOp::ReplacedByTrigger => "replaced-by-trigger",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(DirtyOp::Insert),
            "update" => Some(DirtyOp::Update),
            "delete" => Some(DirtyOp::Delete),
            "replaced-by-trigger" => Some(DirtyOp::ReplacedByTrigger),
            _ => None,
        }
    }
}

pub type DirtySet = HashMap<String, DirtyOp>;

/// Record a mutation against an id. A delete always wins over a prior
/// insert/update for the same id within one dirty window; an insert
/// followed by an update stays an insert (the id did not exist before
/// this sync cycle).
pub fn record(set: &mut DirtySet, id: &str, op: DirtyOp) {
    match (set.get(id).copied(), op) {
        (Some(DirtyOp::Insert), DirtyOp::Update) => {}
        (_, DirtyOp::Delete) => {
            set.insert(id.to_string(), DirtyOp::Delete);
        }
        _ => {
            set.insert(id.to_string(), op);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_update_stays_insert() {
        let mut set = DirtySet::new();
        record(&mut set, "a", DirtyOp::Insert);
        record(&mut set, "a", DirtyOp::Update);
        assert_eq!(set["a"], DirtyOp::Insert);
    }

    #[test]
    fn delete_always_wins() {
        let mut set = DirtySet::new();
        record(&mut set, "a", DirtyOp::Insert);
        record(&mut set, "a", DirtyOp::Delete);
        assert_eq!(set["a"], DirtyOp::Delete);
    }
}
