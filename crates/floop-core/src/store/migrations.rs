//! Additive, idempotent, transactional schema migrations.
//!
//! Each migration introspects the current shape before applying and is
//! wrapped in its own transaction so a failure rolls back to the
//! pre-migration version — stronger than a bare `execute_batch`, required
//! so `MigrationFailed` carries a well-defined rollback point.

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "behaviors, behavior_when, behavior_stats, edges",
        up: r#"
            CREATE TABLE IF NOT EXISTS behaviors (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                lifecycle TEXT NOT NULL DEFAULT 'live',
                canonical TEXT NOT NULL,
                expanded TEXT,
                summary TEXT,
                structured TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                source_type TEXT,
                correction_id TEXT,
                provenance_created_at TEXT,
                requires TEXT NOT NULL DEFAULT '[]',
                overrides TEXT NOT NULL DEFAULT '[]',
                conflicts TEXT NOT NULL DEFAULT '[]',
                confidence REAL NOT NULL DEFAULT 0.6,
                priority INTEGER NOT NULL DEFAULT 0,
                scope TEXT NOT NULL DEFAULT 'local',
                extra TEXT NOT NULL DEFAULT '{}',
                content_hash TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_behaviors_content_hash ON behaviors(content_hash);
            CREATE INDEX IF NOT EXISTS idx_behaviors_kind ON behaviors(kind);
            CREATE INDEX IF NOT EXISTS idx_behaviors_scope ON behaviors(scope);

            CREATE TABLE IF NOT EXISTS behavior_when (
                behavior_id TEXT NOT NULL,
                predicate_key TEXT NOT NULL,
                predicate_value TEXT NOT NULL,
                PRIMARY KEY (behavior_id, predicate_key),
                FOREIGN KEY (behavior_id) REFERENCES behaviors(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS behavior_stats (
                behavior_id TEXT PRIMARY KEY,
                times_activated INTEGER NOT NULL DEFAULT 0,
                times_followed INTEGER NOT NULL DEFAULT 0,
                times_confirmed INTEGER NOT NULL DEFAULT 0,
                times_overridden INTEGER NOT NULL DEFAULT 0,
                last_activated TEXT,
                last_confirmed TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (behavior_id) REFERENCES behaviors(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS edges (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                kind TEXT NOT NULL,
                weight REAL NOT NULL,
                created_at TEXT NOT NULL,
                last_activated TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                PRIMARY KEY (source, target, kind)
            );
            CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
            CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
        "#,
    },
    Migration {
        version: 2,
        description: "corrections, co_activations",
        up: r#"
            CREATE TABLE IF NOT EXISTS corrections (
                id TEXT PRIMARY KEY,
                behavior_id TEXT,
                note TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS co_activations (
                pair_key TEXT NOT NULL,
                activated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_co_activations_pair ON co_activations(pair_key);
        "#,
    },
    Migration {
        version: 3,
        description: "dirty_behaviors, export_state, config",
        up: r#"
            CREATE TABLE IF NOT EXISTS dirty_behaviors (
                behavior_id TEXT PRIMARY KEY,
                op TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS export_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
    },
];

/// Read the persisted schema version. Tables present with no version
/// record are treated as pre-versioning (version 1).
pub fn get_current_version(conn: &Connection) -> StoreResult<i64> {
    let has_version_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |_| Ok(true),
        )
        .unwrap_or(false);

    if !has_version_table {
        let has_any_table: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name='behaviors'",
                [],
                |_| Ok(true),
            )
            .unwrap_or(false);
        return Ok(if has_any_table { 1 } else { 0 });
    }

    let version: Option<i64> = conn
        .query_row("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1", [], |row| row.get(0))
        .ok();
    Ok(version.unwrap_or(1))
}

/// Apply every migration whose version is greater than the current
/// version, in order, each inside its own transaction.
pub fn apply_migrations(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;

    let current = get_current_version(conn)?;

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        let tx = conn.transaction().map_err(|e| StoreError::MigrationFailed {
            from: current,
            to: migration.version,
            cause: e.to_string(),
        })?;

        let applied = (|| -> rusqlite::Result<()> {
            tx.execute_batch(migration.up)?;
            tx.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                rusqlite::params![migration.version],
            )?;
            Ok(())
        })();

        match applied {
            Ok(()) => {
                tx.commit().map_err(|e| StoreError::MigrationFailed {
                    from: current,
                    to: migration.version,
                    cause: e.to_string(),
                })?;
                tracing::info!(version = migration.version, description = migration.description, "applied migration");
            }
            Err(e) => {
                return Err(StoreError::MigrationFailed {
                    from: current,
                    to: migration.version,
                    cause: e.to_string(),
                });
            }
        }
    }

    Ok(())
}
