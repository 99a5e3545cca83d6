use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, as produced by the tracker's clock.
pub type EpochMillis = i64;

// =============================================================================
// Spatial snapshots
// =============================================================================

/// Viewport and document geometry attached to every event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportSnapshot {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub doc_height: f64,
    pub doc_width: f64,
}

impl ViewportSnapshot {
    /// Vertical distance the document can scroll, never negative.
    pub fn scrollable_height(&self) -> f64 {
        (self.doc_height - self.height).max(0.0)
    }
}

/// Bounding box of an element in viewport coordinates, rounded to pixels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Snapshot of "what" was interacted with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementMeta {
    pub tag: String,
    pub id: Option<String>,
    /// First three classes at most.
    pub classes: Vec<String>,
    /// Trimmed text content, first 100 characters.
    pub text: String,
    pub href: Option<String>,
    /// Best-effort CSS-like fingerprint; not guaranteed unique.
    pub selector: String,
    pub rect: Option<Rect>,
}

/// One sampled pointer position inside a `mouse_trail` event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrailPoint {
    pub x: f64,
    pub y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub t: EpochMillis,
}

// =============================================================================
// Server-derived aggregates
// =============================================================================

/// Per-session rollup maintained incrementally by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub start_time: EpochMillis,
    pub end_time: EpochMillis,
    pub duration: i64,
    pub page_views: u64,
    pub total_clicks: u64,
    pub rage_clicks: u64,
    pub max_scroll_depth: u32,
    /// Unique paths in first-visit order.
    pub pages_visited: Vec<String>,
    pub user_agent: String,
    pub screen_resolution: String,
}

/// One heatmap grid bucket. Recomputed on every query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPoint {
    /// Viewport coordinates of the first point observed in the cell.
    pub x: f64,
    pub y: f64,
    /// Cell coordinates on the page grid.
    pub page_x: f64,
    pub page_y: f64,
    pub value: u64,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_selector: Option<String>,
}

/// Scroll-percent histogram bin (`depth` is the lower bound, step 10).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollDepthBucket {
    pub depth: u32,
    pub count: u64,
}

/// Per-path rollup across the whole event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub path: String,
    pub views: u64,
    pub clicks: u64,
    pub avg_scroll_depth: u32,
    pub rage_clicks: u64,
}

/// Click count for one element selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInteraction {
    pub selector: String,
    pub clicks: u64,
    pub text: String,
}

/// Headline numbers for the dashboard landing view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_events: u64,
    pub total_sessions: u64,
    pub unique_users: u64,
    pub pages: Vec<PageStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_wire_names() {
        let viewport = ViewportSnapshot {
            width: 1280.0,
            height: 720.0,
            scroll_x: 0.0,
            scroll_y: 300.0,
            doc_height: 3000.0,
            doc_width: 1280.0,
        };
        let json = serde_json::to_value(&viewport).unwrap();
        assert_eq!(json["scrollY"], 300.0);
        assert_eq!(json["docHeight"], 3000.0);
    }

    #[test]
    fn test_scrollable_height_never_negative() {
        let short_page = ViewportSnapshot {
            height: 900.0,
            doc_height: 600.0,
            ..Default::default()
        };
        assert_eq!(short_page.scrollable_height(), 0.0);
    }

    #[test]
    fn test_heatmap_point_omits_missing_selector() {
        let point = HeatmapPoint {
            x: 10.0,
            y: 20.0,
            page_x: 10.0,
            page_y: 20.0,
            value: 3,
            path: "/".to_string(),
            element_selector: None,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert!(json.get("elementSelector").is_none());
        assert_eq!(json["pageX"], 10.0);
    }

    #[test]
    fn test_element_meta_lenient_parse() {
        let meta: ElementMeta =
            serde_json::from_str(r#"{"tag":"button","selector":"button#submit"}"#).unwrap();
        assert_eq!(meta.tag, "button");
        assert!(meta.classes.is_empty());
        assert!(meta.rect.is_none());
    }
}
