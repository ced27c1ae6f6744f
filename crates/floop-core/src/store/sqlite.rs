//! SQLite-backed persistent [`GraphStore`] implementation.
//!
//! Uses a split reader/writer connection pair in WAL mode: readers share
//! the `reader` connection under a `Mutex`, writers serialize on `writer`.
//! Both connections live behind `&self` so the store itself is `Send +
//! Sync` and callers share it via `Arc<SqliteStore>` rather than taking
//! `&mut self` everywhere.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{StoreError, StoreResult};
use crate::model::{
    Behavior, BehaviorKind, Content, Direction, Edge, EdgeKind, LifecycleState, Metadata,
    Provenance, Relationships, Scope, Stats, WhenValue,
};
use crate::validator::{self, ValidationIssue};

use super::dirty::{self, DirtyOp, DirtySet};
use super::export;
use super::migrations::apply_migrations;
use super::{CancellationToken, EmbeddingSink, GraphStore, NodeQuery, StatsStore};

pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    db_path: PathBuf,
    nodes_log: PathBuf,
    edges_log: PathBuf,
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "cache_size", -20000)?;
    conn.pragma_update(None, "mmap_size", 268_435_456i64)?;
    Ok(())
}

impl SqliteStore {
    /// Open (creating if needed) a store rooted at `dir`, containing
    /// `floop.db`, `nodes.jsonl`, and `edges.jsonl`. The directory is
    /// created with user-only permissions on Unix.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        super::paths::Paths::ensure_dir(dir)?;
        let db_path = dir.join("floop.db");
        let nodes_log = dir.join("nodes.jsonl");
        let edges_log = dir.join("edges.jsonl");

        let db_existed = db_path.exists();
        let mut writer = Connection::open(&db_path)?;
        configure_connection(&writer)?;

        #[cfg(unix)]
        if !db_existed {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&db_path, std::fs::Permissions::from_mode(0o600));
        }

        let integrity: String = writer.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(StoreError::IntegrityFailure(integrity));
        }

        apply_migrations(&mut writer)?;

        let reader = Connection::open(&db_path)?;
        configure_connection(&reader)?;

        let store = Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            db_path,
            nodes_log,
            edges_log,
        };

        store.import_logs_if_newer()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn import_logs_if_newer(&self) -> StoreResult<()> {
        let db_mtime = std::fs::metadata(&self.db_path).and_then(|m| m.modified()).ok();
        let log_mtime = std::fs::metadata(&self.nodes_log).and_then(|m| m.modified()).ok();

        let should_import = match (db_mtime, log_mtime) {
            (Some(db), Some(log)) => log > db,
            (None, Some(_)) => true,
            _ => false,
        };
        if !should_import {
            return Ok(());
        }

        let (behaviors, errors) = export::read_nodes(&self.nodes_log);
        for err in &errors {
            tracing::warn!(line = err.line_number, error = %err.message, "skipped malformed nodes.jsonl line");
        }
        for behavior in behaviors {
            self.upsert_behavior_row(&behavior)?;
        }

        let (edges, errors) = export::read_edges(&self.edges_log);
        for err in &errors {
            tracing::warn!(line = err.line_number, error = %err.message, "skipped malformed edges.jsonl line");
        }
        for edge in edges {
            if edge.validate().is_ok() {
                let _ = self.upsert_edge_row(&edge);
            }
        }
        Ok(())
    }

    fn upsert_behavior_row(&self, b: &Behavior) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        write_behavior_row(&conn, b)
    }

    fn upsert_edge_row(&self, e: &Edge) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        write_edge_row(&conn, e)
    }

    /// Merge `op` into the persisted dirty set for `id`, following the
    /// same insert/update/delete precedence as [`dirty::record`]. Persisted
    /// in `dirty_behaviors` rather than held in memory, so an unclean
    /// shutdown between a write and the next `sync()` does not lose the
    /// export-pending marker.
    fn mark_dirty(&self, id: &str, op: DirtyOp) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let existing = conn
            .query_row("SELECT op FROM dirty_behaviors WHERE behavior_id = ?1", params![id], |row| row.get::<_, String>(0))
            .optional()?
            .and_then(|s| DirtyOp::parse_name(&s));

        let mut scratch = DirtySet::new();
        if let Some(existing) = existing {
            scratch.insert(id.to_string(), existing);
        }
        dirty::record(&mut scratch, id, op);
        let merged = scratch[id];

        conn.execute(
            "INSERT INTO dirty_behaviors (behavior_id, op) VALUES (?1, ?2)
             ON CONFLICT(behavior_id) DO UPDATE SET op = excluded.op",
            params![id, merged.as_str()],
        )?;
        Ok(())
    }

    /// Atomically read and clear the persisted dirty set, mirroring
    /// `mem::take` over an in-memory set but against `dirty_behaviors`.
    fn take_dirty_set(&self) -> StoreResult<DirtySet> {
        let conn = self.writer.lock().unwrap();
        let set: DirtySet = {
            let mut stmt = conn.prepare("SELECT behavior_id, op FROM dirty_behaviors")?;
            stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .filter_map(|r| r.ok())
                .filter_map(|(id, op)| DirtyOp::parse_name(&op).map(|op| (id, op)))
                .collect()
        };
        conn.execute("DELETE FROM dirty_behaviors", [])?;
        Ok(set)
    }

    fn read_all_behaviors(conn: &Connection) -> StoreResult<Vec<Behavior>> {
        let mut stmt = conn.prepare("SELECT id FROM behaviors")?;
        let ids: Vec<String> = stmt.query_map([], |row| row.get(0))?.collect::<Result<_, _>>()?;
        drop(stmt);
        ids.into_iter()
            .filter_map(|id| Self::read_behavior(conn, &id).transpose())
            .collect()
    }

    fn read_behavior(conn: &Connection, id: &str) -> StoreResult<Option<Behavior>> {
        let row = conn
            .query_row(
                "SELECT id, name, kind, lifecycle, canonical, expanded, summary, structured, tags,
                        source_type, correction_id, provenance_created_at,
                        requires, overrides, conflicts, confidence, priority, scope, extra, content_hash
                 FROM behaviors WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, Option<String>>(9)?,
                        row.get::<_, Option<String>>(10)?,
                        row.get::<_, Option<String>>(11)?,
                        row.get::<_, String>(12)?,
                        row.get::<_, String>(13)?,
                        row.get::<_, String>(14)?,
                        row.get::<_, f64>(15)?,
                        row.get::<_, i64>(16)?,
                        row.get::<_, String>(17)?,
                        row.get::<_, String>(18)?,
                        row.get::<_, String>(19)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            id, name, kind, lifecycle, canonical, expanded, summary, structured, tags,
            source_type, correction_id, provenance_created_at,
            requires, overrides, conflicts, confidence, priority, scope, extra, content_hash,
        )) = row
        else {
            return Ok(None);
        };

        let when = Self::read_when(conn, &id)?;
        let stats = Self::read_stats(conn, &id)?;

        Ok(Some(Behavior {
            id,
            name,
            kind: BehaviorKind::parse_name(&kind).unwrap_or(BehaviorKind::Directive),
            content: Content {
                canonical,
                expanded,
                summary,
                structured: structured.and_then(|s| serde_json::from_str(&s).ok()),
                tags: serde_json::from_str(&tags).unwrap_or_default(),
            },
            when,
            provenance: Provenance {
                source_type,
                correction_id,
                created_at: provenance_created_at.and_then(|s| s.parse().ok()),
            },
            relationships: Relationships {
                requires: serde_json::from_str(&requires).unwrap_or_default(),
                overrides: serde_json::from_str(&overrides).unwrap_or_default(),
                conflicts: serde_json::from_str(&conflicts).unwrap_or_default(),
            },
            metadata: Metadata {
                confidence,
                priority,
                scope: if scope == "global" { Scope::Global } else { Scope::Local },
                lifecycle: parse_lifecycle(&lifecycle),
                extra: serde_json::from_str(&extra).unwrap_or_default(),
            },
            stats,
            content_hash,
        }))
    }

    fn read_when(conn: &Connection, id: &str) -> StoreResult<BTreeMap<String, WhenValue>> {
        let mut stmt = conn.prepare("SELECT predicate_key, predicate_value FROM behavior_when WHERE behavior_id = ?1")?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            if let Ok(parsed) = serde_json::from_str::<WhenValue>(&value) {
                map.insert(key, parsed);
            }
        }
        Ok(map)
    }

    fn read_stats(conn: &Connection, id: &str) -> StoreResult<Stats> {
        let row = conn
            .query_row(
                "SELECT times_activated, times_followed, times_confirmed, times_overridden,
                        last_activated, last_confirmed, created_at, updated_at
                 FROM behavior_stats WHERE behavior_id = ?1",
                params![id],
                |row| {
                    Ok(Stats {
                        times_activated: row.get(0)?,
                        times_followed: row.get(1)?,
                        times_confirmed: row.get(2)?,
                        times_overridden: row.get(3)?,
                        last_activated: row.get::<_, Option<String>>(4)?.and_then(|s| s.parse().ok()),
                        last_confirmed: row.get::<_, Option<String>>(5)?.and_then(|s| s.parse().ok()),
                        created_at: row.get::<_, String>(6)?.parse().unwrap_or_else(|_| Utc::now()),
                        updated_at: row.get::<_, String>(7)?.parse().unwrap_or_else(|_| Utc::now()),
                    })
                },
            )
            .optional()?;
        Ok(row.unwrap_or_default())
    }
}

fn parse_lifecycle(s: &str) -> LifecycleState {
    match s {
        "forgotten" => LifecycleState::Forgotten,
        "deprecated" => LifecycleState::Deprecated,
        "merged" => LifecycleState::Merged,
        _ => LifecycleState::Live,
    }
}

fn lifecycle_str(l: LifecycleState) -> &'static str {
    match l {
        LifecycleState::Live => "live",
        LifecycleState::Forgotten => "forgotten",
        LifecycleState::Deprecated => "deprecated",
        LifecycleState::Merged => "merged",
    }
}

fn write_behavior_row(conn: &Connection, b: &Behavior) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO behaviors (id, name, kind, lifecycle, canonical, expanded, summary, structured, tags,
                                 source_type, correction_id, provenance_created_at,
                                 requires, overrides, conflicts, confidence, priority, scope, extra, content_hash)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)
         ON CONFLICT(id) DO UPDATE SET
            name=excluded.name, kind=excluded.kind, lifecycle=excluded.lifecycle,
            canonical=excluded.canonical, expanded=excluded.expanded, summary=excluded.summary,
            structured=excluded.structured, tags=excluded.tags, source_type=excluded.source_type,
            correction_id=excluded.correction_id, provenance_created_at=excluded.provenance_created_at,
            requires=excluded.requires, overrides=excluded.overrides, conflicts=excluded.conflicts,
            confidence=excluded.confidence, priority=excluded.priority, scope=excluded.scope,
            extra=excluded.extra, content_hash=excluded.content_hash",
        params![
            b.id,
            b.name,
            b.kind.as_str(),
            lifecycle_str(b.metadata.lifecycle),
            b.content.canonical,
            b.content.expanded,
            b.content.summary,
            b.content.structured.as_ref().map(|s| serde_json::to_string(s).unwrap()),
            serde_json::to_string(&b.content.tags).unwrap(),
            b.provenance.source_type,
            b.provenance.correction_id,
            b.provenance.created_at.map(|d| d.to_rfc3339()),
            serde_json::to_string(&b.relationships.requires).unwrap(),
            serde_json::to_string(&b.relationships.overrides).unwrap(),
            serde_json::to_string(&b.relationships.conflicts).unwrap(),
            b.metadata.clamped_confidence(),
            b.metadata.clamped_priority(),
            b.metadata.scope.as_str(),
            serde_json::to_string(&b.metadata.extra).unwrap(),
            b.content_hash,
        ],
    )?;

    conn.execute("DELETE FROM behavior_when WHERE behavior_id = ?1", params![b.id])?;
    for (key, value) in &b.when {
        conn.execute(
            "INSERT INTO behavior_when (behavior_id, predicate_key, predicate_value) VALUES (?1, ?2, ?3)",
            params![b.id, key, serde_json::to_string(value).unwrap()],
        )?;
    }

    conn.execute(
        "INSERT INTO behavior_stats (behavior_id, times_activated, times_followed, times_confirmed,
                                      times_overridden, last_activated, last_confirmed, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
         ON CONFLICT(behavior_id) DO UPDATE SET
            times_activated=excluded.times_activated, times_followed=excluded.times_followed,
            times_confirmed=excluded.times_confirmed, times_overridden=excluded.times_overridden,
            last_activated=excluded.last_activated, last_confirmed=excluded.last_confirmed,
            updated_at=excluded.updated_at",
        params![
            b.id,
            b.stats.times_activated,
            b.stats.times_followed,
            b.stats.times_confirmed,
            b.stats.times_overridden,
            b.stats.last_activated.map(|d| d.to_rfc3339()),
            b.stats.last_confirmed.map(|d| d.to_rfc3339()),
            b.stats.created_at.to_rfc3339(),
            b.stats.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn write_edge_row(conn: &Connection, e: &Edge) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO edges (source, target, kind, weight, created_at, last_activated, metadata)
         VALUES (?1,?2,?3,?4,?5,?6,?7)
         ON CONFLICT(source, target, kind) DO UPDATE SET
            weight=excluded.weight, created_at=excluded.created_at,
            last_activated=excluded.last_activated, metadata=excluded.metadata",
        params![
            e.source,
            e.target,
            e.kind.as_str(),
            e.weight,
            e.created_at.to_rfc3339(),
            e.last_activated.map(|d| d.to_rfc3339()),
            serde_json::to_string(&e.metadata).unwrap(),
        ],
    )?;
    Ok(())
}

fn read_edge_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
    let kind: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    let last_activated: Option<String> = row.get(5)?;
    let metadata: String = row.get(6)?;
    Ok(Edge {
        source: row.get(0)?,
        target: row.get(1)?,
        kind: EdgeKind::parse_name(&kind).unwrap_or(EdgeKind::Requires),
        weight: row.get(3)?,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        last_activated: last_activated.and_then(|s| s.parse().ok()),
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
    })
}

impl GraphStore for SqliteStore {
    fn add_node(&self, mut node: Behavior) -> StoreResult<String> {
        if node.id.is_empty() {
            return Err(StoreError::MissingId);
        }
        node.recompute_content_hash();

        let conn = self.writer.lock().unwrap();
        let existing_owner: Option<String> = conn
            .query_row(
                "SELECT id FROM behaviors WHERE content_hash = ?1 AND id != ?2",
                params![node.content_hash, node.id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(owner) = existing_owner {
            return Err(StoreError::DuplicateContent(owner));
        }

        let is_update: bool = conn
            .query_row("SELECT 1 FROM behaviors WHERE id = ?1", params![node.id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);

        write_behavior_row(&conn, &node)?;
        drop(conn);
        self.mark_dirty(&node.id, if is_update { DirtyOp::Update } else { DirtyOp::Insert })?;
        Ok(node.id)
    }

    fn update_node(&self, mut node: Behavior) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let prior = Self::read_behavior(&conn, &node.id)?.ok_or(StoreError::NotFound)?;
        node.recompute_content_hash();
        node.stats = prior.stats;
        write_behavior_row(&conn, &node)?;
        drop(conn);
        self.mark_dirty(&node.id, DirtyOp::Update)?;
        Ok(())
    }

    fn get_node(&self, id: &str) -> StoreResult<Option<Behavior>> {
        let conn = self.reader.lock().unwrap();
        Self::read_behavior(&conn, id)
    }

    fn delete_node(&self, id: &str) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        conn.execute("DELETE FROM behaviors WHERE id = ?1", params![id])?;
        conn.execute("DELETE FROM behavior_when WHERE behavior_id = ?1", params![id])?;
        conn.execute("DELETE FROM behavior_stats WHERE behavior_id = ?1", params![id])?;
        conn.execute("DELETE FROM edges WHERE source = ?1 OR target = ?1", params![id])?;
        drop(conn);
        self.mark_dirty(id, DirtyOp::Delete)?;
        Ok(())
    }

    fn query_nodes(&self, query: &NodeQuery) -> StoreResult<Vec<Behavior>> {
        let conn = self.reader.lock().unwrap();
        let all = Self::read_all_behaviors(&conn)?;
        Ok(all
            .into_iter()
            .filter(|b| query.kind.map(|k| k == b.kind).unwrap_or(true))
            .filter(|b| query.id.as_deref().map(|id| id == b.id).unwrap_or(true))
            .filter(|b| query.scope.map(|s| s.as_str() == b.metadata.scope.as_str()).unwrap_or(true))
            .collect())
    }

    fn add_edge(&self, edge: Edge) -> StoreResult<()> {
        edge.validate()?;
        let conn = self.writer.lock().unwrap();
        write_edge_row(&conn, &edge)?;
        Ok(())
    }

    fn remove_edge(&self, source: &str, target: &str, kind: EdgeKind) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        conn.execute(
            "DELETE FROM edges WHERE source = ?1 AND target = ?2 AND kind = ?3",
            params![source, target, kind.as_str()],
        )?;
        Ok(())
    }

    fn get_edges(&self, node_id: &str, direction: Direction, kind: Option<EdgeKind>) -> StoreResult<Vec<Edge>> {
        let conn = self.reader.lock().unwrap();
        let mut edges = Vec::new();

        if matches!(direction, Direction::Outbound | Direction::Both) {
            let mut stmt = conn.prepare("SELECT source, target, kind, weight, created_at, last_activated, metadata FROM edges WHERE source = ?1")?;
            let rows = stmt.query_map(params![node_id], read_edge_row)?;
            for row in rows {
                edges.push(row?);
            }
        }
        if matches!(direction, Direction::Inbound | Direction::Both) {
            let mut stmt = conn.prepare("SELECT source, target, kind, weight, created_at, last_activated, metadata FROM edges WHERE target = ?1")?;
            let rows = stmt.query_map(params![node_id], read_edge_row)?;
            for row in rows {
                edges.push(row?);
            }
        }
        if let Some(k) = kind {
            edges.retain(|e| e.kind == k);
        }
        Ok(edges)
    }

    fn traverse(
        &self,
        start: &str,
        kinds: &[EdgeKind],
        direction: Direction,
        max_depth: usize,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<String>> {
        let conn = self.reader.lock().unwrap();
        let mut stmt = conn.prepare("SELECT source, target, kind, weight, created_at, last_activated, metadata FROM edges")?;
        let all_edges: Vec<Edge> = stmt
            .query_map([], read_edge_row)?
            .collect::<Result<_, _>>()?;
        drop(stmt);
        drop(conn);

        let mut visited = HashSet::new();
        visited.insert(start.to_string());
        let mut queue: std::collections::VecDeque<(String, usize)> = std::collections::VecDeque::new();
        queue.push_back((start.to_string(), 0));

        while let Some((node, depth)) = queue.pop_front() {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                break;
            }
            if depth >= max_depth {
                continue;
            }
            for edge in &all_edges {
                if !kinds.is_empty() && !kinds.contains(&edge.kind) {
                    continue;
                }
                let next = match direction {
                    Direction::Outbound if edge.source == node => Some(edge.target.clone()),
                    Direction::Inbound if edge.target == node => Some(edge.source.clone()),
                    Direction::Both if edge.source == node => Some(edge.target.clone()),
                    Direction::Both if edge.target == node => Some(edge.source.clone()),
                    _ => None,
                };
                if let Some(next_id) = next {
                    if visited.insert(next_id.clone()) {
                        queue.push_back((next_id, depth + 1));
                    }
                }
            }
        }

        Ok(visited.into_iter().collect())
    }

    fn sync(&self) -> StoreResult<()> {
        let dirty = self.take_dirty_set()?;

        let conn = self.reader.lock().unwrap();
        let all = Self::read_all_behaviors(&conn)?;
        let all_edges: Vec<Edge> = {
            let mut stmt = conn.prepare("SELECT source, target, kind, weight, created_at, last_activated, metadata FROM edges")?;
            stmt.query_map([], read_edge_row)?.collect::<Result<_, _>>()?
        };
        drop(conn);

        if !dirty.is_empty() {
            let fetch = |id: &str| self.get_node(id).ok().flatten();
            export::incremental_export_nodes(&self.nodes_log, &dirty, fetch, &all)?;
        } else if !self.nodes_log.exists() {
            export::full_export_nodes(&self.nodes_log, &all)?;
        }

        export::full_export_edges(&self.edges_log, &all_edges)?;

        tracing::info!(count = dirty.len(), "synced dirty behaviors to log");
        Ok(())
    }

    fn close(&self) {
        if let Err(e) = self.sync() {
            tracing::warn!(error = %e, "sync on close failed");
        }
    }

    fn as_stats_store(&self) -> Option<&dyn StatsStore> {
        Some(self)
    }

    fn as_embedding_sink(&self) -> Option<&dyn EmbeddingSink> {
        Some(self)
    }
}

impl StatsStore for SqliteStore {
    fn update_confidence(&self, id: &str, confidence: f64) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let changed = conn.execute(
            "UPDATE behaviors SET confidence = ?1 WHERE id = ?2",
            params![confidence.clamp(0.0, 1.0), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        drop(conn);
        self.mark_dirty(id, DirtyOp::Update)
    }

    fn record_activation_hit(&self, id: &str) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE behavior_stats SET times_activated = times_activated + 1, last_activated = ?1, updated_at = ?1 WHERE behavior_id = ?2",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        drop(conn);
        self.mark_dirty(id, DirtyOp::Update)
    }

    fn record_confirmed(&self, id: &str) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE behavior_stats SET times_confirmed = times_confirmed + 1, times_followed = times_followed + 1, last_confirmed = ?1, updated_at = ?1 WHERE behavior_id = ?2",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        drop(conn);
        self.mark_dirty(id, DirtyOp::Update)
    }

    fn record_overridden(&self, id: &str) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE behavior_stats SET times_overridden = times_overridden + 1, updated_at = ?1 WHERE behavior_id = ?2",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        drop(conn);
        self.mark_dirty(id, DirtyOp::Update)
    }

    fn touch_edges(&self, ids: &[(String, String, EdgeKind)]) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        for (source, target, kind) in ids {
            conn.execute(
                "UPDATE edges SET last_activated = ?1 WHERE source = ?2 AND target = ?3 AND kind = ?4",
                params![now, source, target, kind.as_str()],
            )?;
        }
        Ok(())
    }

    fn batch_update_edge_weights(&self, updates: &[(String, String, EdgeKind, f64)]) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        for (source, target, kind, weight) in updates {
            if !(*weight > 0.0 && *weight <= 1.0) {
                return Err(StoreError::InvalidEdgeWeight);
            }
            conn.execute(
                "UPDATE edges SET weight = ?1 WHERE source = ?2 AND target = ?3 AND kind = ?4",
                params![weight, source, target, kind.as_str()],
            )?;
        }
        Ok(())
    }

    fn prune_weak_edges(&self, kind: EdgeKind, threshold: f64) -> StoreResult<usize> {
        let conn = self.writer.lock().unwrap();
        let count = conn.execute(
            "DELETE FROM edges WHERE kind = ?1 AND weight <= ?2",
            params![kind.as_str(), threshold],
        )?;
        Ok(count)
    }

    fn validate_behavior_graph(&self, external_ids: &HashSet<String>) -> StoreResult<Vec<ValidationIssue>> {
        let conn = self.reader.lock().unwrap();
        let behaviors = Self::read_all_behaviors(&conn)?;
        let mut stmt = conn.prepare("SELECT source, target, kind, weight, created_at, last_activated, metadata FROM edges")?;
        let edges: Vec<Edge> = stmt.query_map([], read_edge_row)?.collect::<Result<_, _>>()?;
        Ok(validator::validate(&behaviors, &edges, external_ids))
    }

    fn record_co_activation(&self, pair_key: &str) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        conn.execute(
            "INSERT INTO co_activations (pair_key, activated_at) VALUES (?1, ?2)",
            params![pair_key, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn co_activations_for(&self, pair_key: &str) -> StoreResult<Vec<DateTime<Utc>>> {
        let conn = self.reader.lock().unwrap();
        let mut stmt = conn.prepare("SELECT activated_at FROM co_activations WHERE pair_key = ?1 ORDER BY activated_at")?;
        let rows = stmt.query_map(params![pair_key], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            if let Ok(ts) = row?.parse() {
                out.push(ts);
            }
        }
        Ok(out)
    }

    fn prune_co_activations_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.writer.lock().unwrap();
        let count = conn.execute("DELETE FROM co_activations WHERE activated_at < ?1", params![cutoff.to_rfc3339()])?;
        Ok(count)
    }
}

impl EmbeddingSink for SqliteStore {
    fn store_embedding(&self, id: &str, vector: &[f32]) -> StoreResult<()> {
        let conn = self.writer.lock().unwrap();
        let blob: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS embeddings (behavior_id TEXT PRIMARY KEY, vector BLOB NOT NULL)",
            [],
        )?;
        conn.execute(
            "INSERT INTO embeddings (behavior_id, vector) VALUES (?1, ?2)
             ON CONFLICT(behavior_id) DO UPDATE SET vector = excluded.vector",
            params![id, blob],
        )?;
        Ok(())
    }

    fn get_embedding(&self, id: &str) -> StoreResult<Option<Vec<f32>>> {
        let conn = self.reader.lock().unwrap();
        let blob: Option<Vec<u8>> = conn
            .query_row("SELECT vector FROM embeddings WHERE behavior_id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(blob.map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BehaviorKind;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn add_then_get_round_trips() {
        let (_dir, store) = open_store();
        let b = Behavior::new("b1", "b1", BehaviorKind::Directive, "Use context.Context");
        store.add_node(b.clone()).unwrap();
        let fetched = store.get_node("b1").unwrap().unwrap();
        assert_eq!(fetched.content.canonical, "Use context.Context");
    }

    #[test]
    fn duplicate_content_hash_is_rejected() {
        let (_dir, store) = open_store();
        store.add_node(Behavior::new("b1", "b1", BehaviorKind::Directive, "Same")).unwrap();
        let err = store.add_node(Behavior::new("b2", "b2", BehaviorKind::Directive, "Same")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateContent(ref id) if id == "b1"));
        assert_eq!(store.get_node("b1").unwrap().unwrap().name, "b1");
    }

    #[test]
    fn delete_cascades_to_edges() {
        let (_dir, store) = open_store();
        store.add_node(Behavior::new("a", "a", BehaviorKind::Directive, "a")).unwrap();
        store.add_node(Behavior::new("b", "b", BehaviorKind::Directive, "b")).unwrap();
        store.add_edge(Edge::new("a", "b", EdgeKind::Requires, 1.0)).unwrap();
        store.delete_node("a").unwrap();
        assert!(store.get_node("a").unwrap().is_none());
        assert!(store.get_edges("b", Direction::Inbound, None).unwrap().is_empty());
    }

    #[test]
    fn traverse_respects_depth() {
        let (_dir, store) = open_store();
        for id in ["a", "b", "c"] {
            store.add_node(Behavior::new(id, id, BehaviorKind::Directive, id)).unwrap();
        }
        store.add_edge(Edge::new("a", "b", EdgeKind::Requires, 1.0)).unwrap();
        store.add_edge(Edge::new("b", "c", EdgeKind::Requires, 1.0)).unwrap();

        let depth2 = store.traverse("a", &[EdgeKind::Requires], Direction::Outbound, 2, None).unwrap();
        let mut depth2_sorted = depth2.clone();
        depth2_sorted.sort();
        assert_eq!(depth2_sorted, vec!["a", "b", "c"]);

        let depth1 = store.traverse("a", &[EdgeKind::Requires], Direction::Outbound, 1, None).unwrap();
        let mut depth1_sorted = depth1.clone();
        depth1_sorted.sort();
        assert_eq!(depth1_sorted, vec!["a", "b"]);
    }

    #[test]
    fn sync_then_reopen_round_trips() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::open(dir.path()).unwrap();
            store.add_node(Behavior::new("a", "a", BehaviorKind::Directive, "x")).unwrap();
            store.sync().unwrap();
        }
        let reopened = SqliteStore::open(dir.path()).unwrap();
        assert!(reopened.get_node("a").unwrap().is_some());
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, store) = open_store();
        store.add_node(Behavior::new("a", "a", BehaviorKind::Directive, "x")).unwrap();
        store.delete_node("a").unwrap();
        store.delete_node("a").unwrap();
        assert!(store.get_node("a").unwrap().is_none());
    }
}
