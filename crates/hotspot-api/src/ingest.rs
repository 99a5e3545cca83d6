//! Batch validation and lenient per-event parsing.
//!
//! The body is parsed as JSON whatever its content type: beacon delivery
//! sends an untyped blob. The batch envelope is validated strictly
//! (`sessionId` a non-empty string, `events` an array); individual events
//! are parsed one at a time and an unparsable one is skipped and counted
//! rather than failing the batch.

use serde_json::{Map, Value};
use tracing::debug;

use hotspot_core::events::{Batch, TrackingEvent};
use hotspot_core::types::EpochMillis;
use hotspot_core::{HotspotError, Result};

/// A validated batch plus the number of events that could not be parsed.
#[derive(Debug)]
pub struct ParsedBatch {
    pub batch: Batch,
    pub rejected: usize,
}

/// Parse and validate a raw request body.
///
/// `received_at` stands in for a missing batch timestamp.
pub fn parse_batch(body: &[u8], received_at: EpochMillis) -> Result<ParsedBatch> {
    if body.is_empty() {
        return Err(HotspotError::InvalidBatch("Request body is empty".to_string()));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| HotspotError::InvalidBatch(format!("Body is not valid JSON: {}", e)))?;
    let Value::Object(mut root) = value else {
        return Err(HotspotError::InvalidBatch(
            "Batch must be a JSON object".to_string(),
        ));
    };

    let session_id = match root.get("sessionId") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        _ => {
            return Err(HotspotError::InvalidBatch(
                "sessionId is required".to_string(),
            ))
        }
    };
    let raw_events = match root.remove("events") {
        Some(Value::Array(events)) => events,
        _ => {
            return Err(HotspotError::InvalidBatch(
                "events must be an array".to_string(),
            ))
        }
    };

    let user_id = string_field(&root, "userId");
    let timestamp = root
        .get("timestamp")
        .and_then(Value::as_i64)
        .unwrap_or(received_at);

    let mut events = Vec::with_capacity(raw_events.len());
    let mut rejected = 0;
    for raw in raw_events {
        match parse_event(raw, &session_id, &user_id) {
            Ok(event) => events.push(event),
            Err(e) => {
                rejected += 1;
                debug!(session_id = %session_id, error = %e, "Skipping malformed event");
            }
        }
    }

    Ok(ParsedBatch {
        batch: Batch {
            session_id,
            user_id,
            user_agent: string_field(&root, "userAgent"),
            screen_resolution: string_field(&root, "screenResolution"),
            language: string_field(&root, "language"),
            platform: string_field(&root, "platform"),
            timestamp,
            events,
        },
        rejected,
    })
}

/// Events missing their own `sessionId`/`userId` inherit the batch's.
fn parse_event(
    raw: Value,
    session_id: &str,
    user_id: &str,
) -> std::result::Result<TrackingEvent, serde_json::Error> {
    let raw = match raw {
        Value::Object(mut fields) => {
            fields
                .entry("sessionId")
                .or_insert_with(|| Value::String(session_id.to_string()));
            fields
                .entry("userId")
                .or_insert_with(|| Value::String(user_id.to_string()));
            Value::Object(fields)
        }
        other => other,
    };
    serde_json::from_value(raw)
}

fn string_field(root: &Map<String, Value>, key: &str) -> String {
    root.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotspot_core::events::{EventData, EventKind};
    use serde_json::json;

    fn parse(value: Value) -> Result<ParsedBatch> {
        parse_batch(value.to_string().as_bytes(), 42)
    }

    #[test]
    fn test_valid_batch() {
        let parsed = parse(json!({
            "sessionId": "s1",
            "userId": "u1",
            "userAgent": "Mozilla/5.0",
            "screenResolution": "1920x1080",
            "timestamp": 1_000,
            "events": [
                {
                    "type": "page_view", "timestamp": 1_000, "sessionId": "s1", "path": "/",
                    "data": {"title": "Home"}
                },
                {
                    "type": "click", "timestamp": 1_100, "path": "/",
                    "data": {"x": 5, "y": 6, "pageX": 5, "pageY": 6}
                }
            ]
        }))
        .unwrap();

        assert_eq!(parsed.rejected, 0);
        assert_eq!(parsed.batch.session_id, "s1");
        assert_eq!(parsed.batch.screen_resolution, "1920x1080");
        assert_eq!(parsed.batch.events.len(), 2);
        assert_eq!(parsed.batch.events[1].session_id, "s1");
        assert_eq!(parsed.batch.events[1].user_id, "u1");
        assert!(matches!(parsed.batch.events[1].data, EventData::Click(_)));
    }

    #[test]
    fn test_missing_session_id() {
        let err = parse(json!({"events": []})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid batch: sessionId is required");

        let err = parse(json!({"sessionId": "", "events": []})).unwrap_err();
        assert!(matches!(err, HotspotError::InvalidBatch(_)));

        let err = parse(json!({"sessionId": 17, "events": []})).unwrap_err();
        assert!(matches!(err, HotspotError::InvalidBatch(_)));
    }

    #[test]
    fn test_events_must_be_array() {
        let err = parse(json!({"sessionId": "s1", "events": {"0": {}}})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid batch: events must be an array");
        assert!(parse(json!({"sessionId": "s1"})).is_err());
    }

    #[test]
    fn test_not_json() {
        assert!(parse_batch(b"sessionId=s1", 0).is_err());
        assert!(parse_batch(b"", 0).is_err());
        assert!(parse_batch(b"[1, 2]", 0).is_err());
    }

    #[test]
    fn test_malformed_events_are_counted() {
        let parsed = parse(json!({
            "sessionId": "s1",
            "events": [
                "not an event",
                {"type": "click"},
                {"type": "scroll", "timestamp": 5, "data": {"scrollPercent": 40}},
                {"type": "heartbeat", "timestamp": 6, "data": {"beat": 1}}
            ]
        }))
        .unwrap();

        assert_eq!(parsed.rejected, 2);
        assert_eq!(parsed.batch.events.len(), 2);
        assert_eq!(
            parsed.batch.events[1].kind(),
            EventKind::Other("heartbeat".to_string())
        );
    }

    #[test]
    fn test_missing_timestamp_uses_receive_time() {
        let parsed = parse(json!({"sessionId": "s1", "events": []})).unwrap();
        assert_eq!(parsed.batch.timestamp, 42);
    }
}
