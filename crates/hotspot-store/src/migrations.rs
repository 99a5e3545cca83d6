//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use hotspot_core::Result;

use crate::db::storage_err;

/// Apply every migration newer than the recorded schema version.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(storage_err("Failed to create migrations table"))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(storage_err("Failed to query migration version"))?;

    if current_version < 1 {
        let tx = conn
            .transaction()
            .map_err(storage_err("Failed to begin migration"))?;
        apply_v1(&tx)?;
        tx.commit().map_err(storage_err("Failed to commit migration"))?;
        info!("Applied migration v1: tracking_schema");
    }

    Ok(())
}

/// Version 1: event log and session table.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Append-only event log. `body` holds the event in wire format.
        CREATE TABLE IF NOT EXISTS events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            kind        TEXT NOT NULL,
            timestamp   INTEGER NOT NULL,
            session_id  TEXT NOT NULL,
            user_id     TEXT NOT NULL DEFAULT '',
            path        TEXT NOT NULL DEFAULT '',
            body        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_kind_path
            ON events (kind, path);

        CREATE INDEX IF NOT EXISTS idx_events_session
            ON events (session_id, timestamp ASC);

        -- One row per session, rewritten on every batch.
        CREATE TABLE IF NOT EXISTS sessions (
            session_id          TEXT PRIMARY KEY NOT NULL,
            user_id             TEXT NOT NULL DEFAULT '',
            start_time          INTEGER NOT NULL,
            end_time            INTEGER NOT NULL,
            duration            INTEGER NOT NULL DEFAULT 0,
            page_views          INTEGER NOT NULL DEFAULT 0,
            total_clicks        INTEGER NOT NULL DEFAULT 0,
            rage_clicks         INTEGER NOT NULL DEFAULT 0,
            max_scroll_depth    INTEGER NOT NULL DEFAULT 0,
            pages_visited       TEXT NOT NULL DEFAULT '[]',
            user_agent          TEXT NOT NULL DEFAULT '',
            screen_resolution   TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_start
            ON sessions (start_time DESC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'tracking_schema');
        ",
    )
    .map_err(storage_err("Failed to apply migration v1"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_schema_tables_exist() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert!(tables.contains(&"events".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }
}
