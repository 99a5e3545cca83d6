//! Read-side query surface of `GET /api/tracking`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hotspot_core::events::TrackingEvent;
use hotspot_core::types::{
    ElementInteraction, HeatmapPoint, Overview, ScrollDepthBucket, SessionSummary,
};
use hotspot_store::AnalyticsStore;

use crate::error::ApiError;

/// Query string of `GET /api/tracking`.
#[derive(Debug, Default, Deserialize)]
pub struct TrackingParams {
    /// Query name; absent means `overview`.
    pub q: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    Overview,
    Heatmap,
    RageClicks,
    Sessions,
    SessionEvents,
    Performance,
    Elements,
}

impl FromStr for QueryKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(QueryKind::Overview),
            "heatmap" => Ok(QueryKind::Heatmap),
            "rage-clicks" => Ok(QueryKind::RageClicks),
            "sessions" => Ok(QueryKind::Sessions),
            "session-events" => Ok(QueryKind::SessionEvents),
            "performance" => Ok(QueryKind::Performance),
            "elements" => Ok(QueryKind::Elements),
            other => Err(ApiError::BadRequest(format!(
                "Unknown query '{}'. Must be one of: overview, heatmap, rage-clicks, \
                 sessions, session-events, performance, elements",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapResponse {
    pub clicks: Vec<HeatmapPoint>,
    pub mouse: Vec<HeatmapPoint>,
    pub scroll_depth: Vec<ScrollDepthBucket>,
}

/// Body of a successful query; each variant keeps its own top-level key.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Overview(Overview),
    Heatmap(HeatmapResponse),
    RageClicks {
        #[serde(rename = "rageClicks")]
        rage_clicks: Vec<TrackingEvent>,
    },
    Sessions {
        sessions: Vec<SessionSummary>,
    },
    Events {
        events: Vec<TrackingEvent>,
    },
    Metrics {
        metrics: Vec<TrackingEvent>,
    },
    Elements {
        elements: Vec<ElementInteraction>,
    },
}

/// Resolve and run one query against the store.
pub fn run_query(
    store: &AnalyticsStore,
    params: &TrackingParams,
) -> Result<QueryResponse, ApiError> {
    let kind = match params.q.as_deref() {
        None | Some("") => QueryKind::Overview,
        Some(name) => name.parse::<QueryKind>()?,
    };
    let path = params.path.as_deref().filter(|p| !p.is_empty());

    let response = match kind {
        QueryKind::Overview => QueryResponse::Overview(store.overview()?),
        QueryKind::Heatmap => QueryResponse::Heatmap(HeatmapResponse {
            clicks: store.click_heatmap(path)?,
            mouse: store.mouse_heatmap(path)?,
            scroll_depth: store.scroll_depth_histogram(path)?,
        }),
        QueryKind::RageClicks => QueryResponse::RageClicks {
            rage_clicks: store.rage_clicks(path)?,
        },
        QueryKind::Sessions => QueryResponse::Sessions {
            sessions: store.session_list()?,
        },
        QueryKind::SessionEvents => {
            let session_id = params
                .session_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ApiError::BadRequest("sessionId is required".to_string()))?;
            QueryResponse::Events {
                events: store.session_events(session_id)?,
            }
        }
        QueryKind::Performance => QueryResponse::Metrics {
            metrics: store.performance_data()?,
        },
        QueryKind::Elements => QueryResponse::Elements {
            elements: store.element_interactions(path)?,
        },
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(q: Option<&str>) -> TrackingParams {
        TrackingParams {
            q: q.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_names() {
        assert_eq!("rage-clicks".parse::<QueryKind>().unwrap(), QueryKind::RageClicks);
        assert_eq!(
            "session-events".parse::<QueryKind>().unwrap(),
            QueryKind::SessionEvents
        );
        assert!("bogus".parse::<QueryKind>().is_err());
        assert!("Overview".parse::<QueryKind>().is_err());
    }

    #[test]
    fn test_default_is_overview() {
        let store = AnalyticsStore::in_memory(10);
        let response = run_query(&store, &params(None)).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalEvents"], 0);
        assert_eq!(json["uniqueUsers"], 0);
        assert!(json["pages"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_response_keys() {
        let store = AnalyticsStore::in_memory(10);
        let cases = [
            ("heatmap", "scrollDepth"),
            ("rage-clicks", "rageClicks"),
            ("sessions", "sessions"),
            ("performance", "metrics"),
            ("elements", "elements"),
        ];
        for (q, key) in cases {
            let json = serde_json::to_value(run_query(&store, &params(Some(q))).unwrap()).unwrap();
            assert!(json.get(key).is_some(), "{q} should answer with '{key}'");
        }
    }

    #[test]
    fn test_session_events_requires_id() {
        let store = AnalyticsStore::in_memory(10);
        let err = run_query(&store, &params(Some("session-events"))).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
