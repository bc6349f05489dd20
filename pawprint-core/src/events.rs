//! Event envelope for the events API
//!
//! Events are produced on the device and shipped in per-session batches.
//! Each event carries a content-based hash so the server can drop
//! duplicates when a batch is retried after a transient failure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Static metadata attached to a session at creation time.
///
/// Contains at least the persisted device identifier; never mutated after
/// the session is constructed.
pub type UserProperties = HashMap<String, serde_json::Value>;

/// Event envelope shipped to the events API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Event type (session_start, session_close, custom)
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event was produced on this device
    pub emitted_at: DateTime<Utc>,

    /// Content-based hash for deduplication (32-char hex)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_hash: Option<String>,

    /// Type-specific event payload
    pub data: serde_json::Value,
}

impl TrackingEvent {
    /// Create an event of the given type, stamped with the current time
    pub fn new(event_type: &str, data: serde_json::Value) -> Self {
        let emitted_at = Utc::now();
        let event_hash = compute_event_hash(event_type, &emitted_at, &data);

        TrackingEvent {
            event_type: event_type.to_string(),
            emitted_at,
            event_hash: Some(event_hash),
            data,
        }
    }

    /// First event of a session: carries the referrer and user properties
    pub fn session_start(referrer: &str, user_properties: &UserProperties) -> Self {
        Self::new(
            "session_start",
            serde_json::json!({
                "referrer": referrer,
                "user_properties": user_properties,
            }),
        )
    }

    /// Final event of a session
    pub fn session_close() -> Self {
        Self::new("session_close", serde_json::json!({}))
    }

    /// Application-defined event
    pub fn custom(name: &str, payload: serde_json::Value) -> Self {
        Self::new(
            "custom",
            serde_json::json!({
                "name": name,
                "payload": payload,
            }),
        )
    }
}

/// Compute a content-based hash for event deduplication
///
/// Returns a 32-character hex digest of SHA-256(event_type + emitted_at + data)
fn compute_event_hash(
    event_type: &str,
    emitted_at: &DateTime<Utc>,
    data: &serde_json::Value,
) -> String {
    let content = serde_json::to_string(data).unwrap_or_default();
    let hash_input = format!("{}:{}:{}", event_type, emitted_at.to_rfc3339(), content);

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    let result = hasher.finalize();

    // Take first 16 bytes (32 hex chars)
    hex::encode(&result[..16])
}

/// Batch of events belonging to one session
#[derive(Debug, Clone, Serialize)]
pub struct EventBatch {
    /// Session ID these events belong to
    pub session_id: String,

    /// Events to send
    pub events: Vec<TrackingEvent>,
}
