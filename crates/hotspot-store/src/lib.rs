//! Hotspot storage crate: the server-side event log and its aggregations.
//!
//! Incoming batches are appended to a capped event log (in memory or in a
//! WAL-mode SQLite database) while a per-session rollup is maintained
//! incrementally. Heatmaps, scroll histograms, page statistics and element
//! rankings are recomputed from the log on every query.

pub mod aggregate;
pub mod backend;
pub mod db;
pub mod memory;
pub mod migrations;
pub mod session;
pub mod sqlite;
pub mod store;

pub use backend::{EventFilter, StorageBackend};
pub use db::Database;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use store::{AnalyticsStore, IngestOutcome};
