//! JSONL log export/import: `nodes.jsonl` and `edges.jsonl`.
//!
//! Models the export log as an append-and-rewrite state machine keyed by
//! the dirty set rather than a stream of events. Writes are atomic
//! (write to a temp file, then rename into place).

use std::collections::HashMap;
use std::path::Path;

use crate::model::{Behavior, Edge};

use super::dirty::{DirtyOp, DirtySet};

#[derive(Debug, Clone)]
pub struct LoadError {
    pub line_number: usize,
    pub message: String,
}

fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_nodes(path: &Path) -> (Vec<Behavior>, Vec<LoadError>) {
    read_lines(path)
}

pub fn read_edges(path: &Path) -> (Vec<Edge>, Vec<LoadError>) {
    read_lines(path)
}

fn read_lines<T: serde::de::DeserializeOwned>(path: &Path) -> (Vec<T>, Vec<LoadError>) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return (Vec::new(), Vec::new());
    };
    let mut items = Vec::new();
    let mut errors = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(item) => items.push(item),
            Err(e) => errors.push(LoadError {
                line_number: idx + 1,
                message: e.to_string(),
            }),
        }
    }
    (items, errors)
}

pub fn full_export_nodes(path: &Path, behaviors: &[Behavior]) -> std::io::Result<()> {
    let body = behaviors
        .iter()
        .map(|b| serde_json::to_string(b).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    write_atomic(path, &body)
}

pub fn full_export_edges(path: &Path, edges: &[Edge]) -> std::io::Result<()> {
    let body = edges
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    write_atomic(path, &body)
}

/// Apply only the dirty set against the existing `nodes.jsonl`, rewriting
/// it atomically. Falls back to a full export on any I/O failure so the
/// log is never left partial.
pub fn incremental_export_nodes(
    path: &Path,
    dirty: &DirtySet,
    fetch: impl Fn(&str) -> Option<Behavior>,
    full_fallback: &[Behavior],
) -> std::io::Result<()> {
    match try_incremental_export_nodes(path, dirty, &fetch) {
        Ok(()) => Ok(()),
        Err(_) => full_export_nodes(path, full_fallback),
    }
}

fn try_incremental_export_nodes(
    path: &Path,
    dirty: &DirtySet,
    fetch: &impl Fn(&str) -> Option<Behavior>,
) -> std::io::Result<()> {
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, String> = HashMap::new();

    for line in existing.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
                if !by_id.contains_key(id) {
                    order.push(id.to_string());
                }
                by_id.insert(id.to_string(), line.to_string());
            }
        }
    }

    for (id, op) in dirty {
        match op {
            DirtyOp::Delete => {
                by_id.remove(id);
            }
            DirtyOp::Insert | DirtyOp::Update | DirtyOp::ReplacedByTrigger => {
                if let Some(behavior) = fetch(id) {
                    let line = serde_json::to_string(&behavior)?;
                    if !by_id.contains_key(id) {
                        order.push(id.clone());
                    }
                    by_id.insert(id.clone(), line);
                } else {
                    by_id.remove(id);
                }
            }
        }
    }

    let body = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect::<Vec<_>>()
        .join("\n");
    write_atomic(path, &body)
}
