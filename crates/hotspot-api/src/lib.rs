//! Hotspot API crate - axum HTTP service for batch ingestion and dashboard queries.
//!
//! `POST /api/tracking` accepts tracker batches (JSON or untyped beacon
//! bodies), `GET /api/tracking?q=<query>` serves the read-side aggregations
//! and `GET /health` reports liveness.

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod query;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
