//! Incremental session rollups.

use hotspot_core::events::{Batch, EventData};
use hotspot_core::types::SessionSummary;

/// Fresh row for a session first seen in `batch`.
pub fn new_session(batch: &Batch) -> SessionSummary {
    SessionSummary {
        session_id: batch.session_id.clone(),
        user_id: batch.user_id.clone(),
        start_time: batch.timestamp,
        end_time: batch.timestamp,
        duration: 0,
        page_views: 0,
        total_clicks: 0,
        rage_clicks: 0,
        max_scroll_depth: 0,
        pages_visited: Vec::new(),
        user_agent: batch.user_agent.clone(),
        screen_resolution: batch.screen_resolution.clone(),
    }
}

/// Fold `batch` into `session`.
///
/// Every field only moves forward: `end_time` takes the later timestamp,
/// counters increase, `max_scroll_depth` only rises and `pages_visited` only
/// grows (unique paths, first-visit order).
pub fn apply_batch(session: &mut SessionSummary, batch: &Batch) {
    session.end_time = session.end_time.max(batch.timestamp);
    session.duration = session.end_time - session.start_time;

    for event in &batch.events {
        match &event.data {
            EventData::Click(_) => session.total_clicks += 1,
            EventData::RageClick(_) => session.rage_clicks += 1,
            EventData::PageView(_) => {
                session.page_views += 1;
                if !event.path.is_empty() && !session.pages_visited.contains(&event.path) {
                    session.pages_visited.push(event.path.clone());
                }
            }
            EventData::Scroll(scroll) => {
                if let Some(depth) = scroll.max_depth {
                    session.max_scroll_depth = session.max_scroll_depth.max(depth);
                }
            }
            _ => {}
        }
    }
}
