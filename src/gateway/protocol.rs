//! Gateway wire protocol
//!
//! JSON text frames, one message per frame, both directions:
//! `{"type": string, "payload": object, "agent"?: {"id": ..., "name": ...}}`.
//!
//! No authentication, no encryption. This is a local-development-only
//! boundary and must not be exposed beyond the loopback interface as-is.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Frame type sent once after a peer connects
pub const GATEWAY_HELLO: &str = "gateway.hello";
/// Frame type acknowledging an accepted inbound message
pub const GATEWAY_ACK: &str = "gateway.ack";
/// Frame type replying to malformed inbound messages
pub const GATEWAY_ERROR: &str = "gateway.error";

/// A protocol frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Value>,
}

impl Frame {
    /// Handshake banner sent to every new peer
    pub fn hello() -> Self {
        Self {
            frame_type: GATEWAY_HELLO.into(),
            payload: json!({ "status": "connected" }),
            agent: None,
        }
    }

    /// Acknowledge an accepted message of the given type
    pub fn ack(received: &str) -> Self {
        Self {
            frame_type: GATEWAY_ACK.into(),
            payload: json!({ "received": received }),
            agent: None,
        }
    }

    /// Protocol-level error reply
    pub fn error(message: &str) -> Self {
        Self {
            frame_type: GATEWAY_ERROR.into(),
            payload: json!({ "error": message }),
            agent: None,
        }
    }

    /// Serialize to a text frame
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }
}

/// A validated inbound agent message
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub event_type: String,
    pub payload: Map<String, Value>,
    pub agent: Value,
}

/// Why an inbound frame was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundError {
    InvalidJson,
    MissingType,
}

impl InboundError {
    /// The error text sent back in the `gateway.error` reply
    pub fn message(&self) -> &'static str {
        match self {
            InboundError::InvalidJson => "Invalid JSON",
            InboundError::MissingType => "Missing 'type' field",
        }
    }
}

/// Parse a raw text frame from a peer
pub fn parse_inbound(raw: &str) -> Result<Inbound, InboundError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| InboundError::InvalidJson)?;

    let event_type = match value.get("type").and_then(Value::as_str) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return Err(InboundError::MissingType),
    };

    let payload = match value.get("payload") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".into(), other.clone());
            map
        }
    };

    let agent = value.get("agent").cloned().unwrap_or_else(|| json!({}));

    Ok(Inbound {
        event_type,
        payload,
        agent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_frame_shape() {
        let text = Frame::hello().to_text();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "gateway.hello");
        assert_eq!(value["payload"]["status"], "connected");
        assert!(value.get("agent").is_none());
    }

    #[test]
    fn test_parse_valid_inbound() {
        let inbound = parse_inbound(
            r#"{"type": "agent.intent.proposed", "payload": {"intent": "x"}, "agent": {"id": "a1"}}"#,
        )
        .unwrap();
        assert_eq!(inbound.event_type, "agent.intent.proposed");
        assert_eq!(inbound.payload["intent"], "x");
        assert_eq!(inbound.agent["id"], "a1");
    }

    #[test]
    fn test_parse_missing_type() {
        assert_eq!(
            parse_inbound(r#"{"payload": {}}"#),
            Err(InboundError::MissingType)
        );
        assert_eq!(
            parse_inbound(r#"{"type": "", "payload": {}}"#),
            Err(InboundError::MissingType)
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert_eq!(parse_inbound("{nope"), Err(InboundError::InvalidJson));
    }

    #[test]
    fn test_parse_defaults_payload_and_agent() {
        let inbound = parse_inbound(r#"{"type": "ping"}"#).unwrap();
        assert!(inbound.payload.is_empty());
        assert_eq!(inbound.agent, json!({}));
    }
}
