//! Persistent SQLite backend.

use std::path::Path;

use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

use hotspot_core::events::TrackingEvent;
use hotspot_core::types::SessionSummary;
use hotspot_core::Result;

use crate::backend::{eviction_size, EventFilter, StorageBackend};
use crate::db::{storage_err, Database};

/// Events are stored as wire JSON next to indexed kind/path/session columns.
#[derive(Debug)]
pub struct SqliteBackend {
    db: Database,
    max_events: usize,
    len: usize,
}

impl SqliteBackend {
    pub fn open(path: &Path, max_events: usize) -> Result<Self> {
        Self::with_database(Database::open(path)?, max_events)
    }

    pub fn in_memory(max_events: usize) -> Result<Self> {
        Self::with_database(Database::in_memory()?, max_events)
    }

    fn with_database(db: Database, max_events: usize) -> Result<Self> {
        let len: i64 = db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
                .map_err(storage_err("Failed to count events"))
        })?;
        Ok(Self {
            db,
            max_events: max_events.max(1),
            len: usize::try_from(len).unwrap_or_default(),
        })
    }
}

const SESSION_COLUMNS: &str = "session_id, user_id, start_time, end_time, duration, page_views, \
     total_clicks, rage_clicks, max_scroll_depth, pages_visited, user_agent, screen_resolution";

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<SessionSummary> {
    let pages: String = row.get(9)?;
    Ok(SessionSummary {
        session_id: row.get(0)?,
        user_id: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        duration: row.get(4)?,
        page_views: row.get::<_, i64>(5)? as u64,
        total_clicks: row.get::<_, i64>(6)? as u64,
        rage_clicks: row.get::<_, i64>(7)? as u64,
        max_scroll_depth: row.get::<_, i64>(8)? as u32,
        pages_visited: serde_json::from_str(&pages).unwrap_or_default(),
        user_agent: row.get(10)?,
        screen_resolution: row.get(11)?,
    })
}

impl StorageBackend for SqliteBackend {
    fn ingest(&mut self, session: &SessionSummary, events: &[TrackingEvent]) -> Result<usize> {
        let max_events = self.max_events;
        let mut len = self.len;

        let evicted = self.db.with_conn_mut(|conn| {
            let tx = conn
                .transaction()
                .map_err(storage_err("Failed to begin batch"))?;

            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO sessions ({SESSION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    session.session_id,
                    session.user_id,
                    session.start_time,
                    session.end_time,
                    session.duration,
                    session.page_views as i64,
                    session.total_clicks as i64,
                    session.rage_clicks as i64,
                    session.max_scroll_depth as i64,
                    serde_json::to_string(&session.pages_visited)?,
                    session.user_agent,
                    session.screen_resolution,
                ],
            )
            .map_err(storage_err("Failed to save session"))?;

            let mut evicted = 0;
            {
                let mut insert = tx
                    .prepare_cached(
                        "INSERT INTO events (kind, timestamp, session_id, user_id, path, body)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    )
                    .map_err(storage_err("Failed to prepare insert"))?;

                for event in events {
                    if len >= max_events {
                        let drop = eviction_size(max_events).min(len);
                        tx.execute(
                            "DELETE FROM events WHERE id IN
                               (SELECT id FROM events ORDER BY id ASC LIMIT ?1)",
                            params![drop as i64],
                        )
                        .map_err(storage_err("Failed to evict events"))?;
                        len -= drop;
                        evicted += drop;
                    }

                    insert
                        .execute(params![
                            event.kind().as_str(),
                            event.timestamp,
                            event.session_id,
                            event.user_id,
                            event.path,
                            serde_json::to_string(event)?,
                        ])
                        .map_err(storage_err("Failed to insert event"))?;
                    len += 1;
                }
            }

            tx.commit().map_err(storage_err("Failed to commit batch"))?;
            Ok(evicted)
        })?;

        self.len = len;
        Ok(evicted)
    }

    fn scan(&self, filter: &EventFilter, visit: &mut dyn FnMut(&TrackingEvent)) -> Result<()> {
        let mut sql = String::from("SELECT body FROM events WHERE 1 = 1");
        let mut args: Vec<String> = Vec::new();

        if !filter.kinds.is_empty() {
            let placeholders: Vec<String> = filter
                .kinds
                .iter()
                .map(|kind| {
                    args.push(kind.as_str().to_string());
                    format!("?{}", args.len())
                })
                .collect();
            sql.push_str(&format!(" AND kind IN ({})", placeholders.join(", ")));
        }
        if let Some(path) = &filter.path {
            args.push(path.clone());
            sql.push_str(&format!(" AND path = ?{}", args.len()));
        }
        if let Some(session_id) = &filter.session_id {
            args.push(session_id.clone());
            sql.push_str(&format!(" AND session_id = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY id ASC");

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(storage_err("Failed to prepare scan"))?;
            let mut rows = stmt
                .query(rusqlite::params_from_iter(args.iter()))
                .map_err(storage_err("Failed to scan events"))?;

            while let Some(row) = rows.next().map_err(storage_err("Failed to read event"))? {
                let body: String = row.get(0).map_err(storage_err("Failed to read body"))?;
                match serde_json::from_str::<TrackingEvent>(&body) {
                    Ok(event) => visit(&event),
                    Err(e) => warn!(error = %e, "Skipping undecodable stored event"),
                }
            }
            Ok(())
        })
    }

    fn session(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1"),
                params![session_id],
                row_to_session,
            )
            .optional()
            .map_err(storage_err("Failed to load session"))
        })
    }

    fn sessions(&self) -> Result<Vec<SessionSummary>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions"))
                .map_err(storage_err("Failed to prepare session list"))?;
            let rows = stmt
                .query_map([], row_to_session)
                .map_err(storage_err("Failed to list sessions"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err("Failed to read session"))
        })
    }

    fn event_count(&self) -> Result<u64> {
        Ok(self.len as u64)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
