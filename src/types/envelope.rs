use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::messaging::EventKind;

/// The JSON message unit exchanged over the transport.
///
/// Wire shape: `{"type": string, "payload": any, "timestamp": integer-epoch-ms,
/// "id"?: string}`. The `id` field is present only for request/response-style
/// frames (heartbeat carries the id the pong must echo).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Envelope {
    /// Build an envelope stamped with the current wall-clock time.
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: now_epoch_ms(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }
}

/// Milliseconds since the Unix epoch
pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_new() {
        let envelope = Envelope::new(EventKind::Notification, serde_json::json!({"n": 1}));
        assert_eq!(envelope.kind, EventKind::Notification);
        assert_eq!(envelope.payload, serde_json::json!({"n": 1}));
        assert!(envelope.timestamp > 0);
        assert_eq!(envelope.id, None);
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope::new(EventKind::Heartbeat, serde_json::Value::Null)
            .with_id("hb-42".to_string());

        let serialized = serde_json::to_string(&envelope).unwrap();
        let deserialized: Envelope = serde_json::from_str(&serialized).unwrap();

        assert_eq!(envelope, deserialized);
    }

    #[test]
    fn test_envelope_serializes_type_field() {
        let envelope = Envelope::new(EventKind::TicketUpdate, serde_json::Value::Null);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""type":"ticket_update""#));
        assert!(!json.contains(r#""id":"#));
    }

    #[test]
    fn test_envelope_decodes_unknown_type_as_custom() {
        let frame = r#"{"type":"totally_new","payload":{},"timestamp":1}"#;
        let envelope: Envelope = serde_json::from_str(frame).unwrap();
        assert_eq!(envelope.kind, EventKind::Custom("totally_new".to_string()));
    }

    #[test]
    fn test_envelope_rejects_empty_type() {
        let frame = r#"{"type":"","payload":{},"timestamp":1}"#;
        assert!(serde_json::from_str::<Envelope>(frame).is_err());
    }

    #[test]
    fn test_envelope_rejects_malformed_json() {
        assert!(serde_json::from_str::<Envelope>("{not json").is_err());
    }

    #[test]
    fn test_envelope_missing_payload_defaults_to_null() {
        let frame = r#"{"type":"notification","timestamp":7}"#;
        let envelope: Envelope = serde_json::from_str(frame).unwrap();
        assert_eq!(envelope.payload, serde_json::Value::Null);
        assert_eq!(envelope.timestamp, 7);
    }
}
