//! Platform-neutral inbound event shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A piece of a rich message as delivered by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Component {
    Mention { target: String },
    Plain { text: String },
    /// Any component kind we don't care about.
    #[serde(other)]
    Other,
}

/// Ordinary chat message, the carrier of heuristic join signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub sender_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub raw_payload: Map<String, Value>,
    #[serde(default)]
    pub message_components: Vec<Component>,
}

/// Event as received from the host, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Dedicated "membership increased" signal.
    MemberIncrease { new_member_id: String },
    Message(MessageEvent),
}

/// A classified join, tagged by the signal that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinEvent {
    Structured { new_member_id: String },
    Heuristic(MessageEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_message_event() {
        let event: InboundEvent = serde_json::from_value(json!({
            "event": "message",
            "sender_id": "system",
            "text": "小明 加入了群聊",
            "raw_payload": { "user_id": "1001" },
            "message_components": [
                { "kind": "plain", "text": "hi" },
                { "kind": "mention", "target": "1001" },
                { "kind": "image", "url": "x" }
            ]
        }))
        .unwrap();

        let InboundEvent::Message(msg) = event else {
            panic!("expected message event");
        };
        assert_eq!(msg.sender_id, "system");
        assert_eq!(msg.raw_payload["user_id"], "1001");
        assert_eq!(
            msg.message_components,
            vec![
                Component::Plain { text: "hi".into() },
                Component::Mention {
                    target: "1001".into()
                },
                Component::Other,
            ]
        );
    }

    #[test]
    fn test_deserialize_member_increase() {
        let event: InboundEvent = serde_json::from_value(json!({
            "event": "member_increase",
            "new_member_id": "42"
        }))
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::MemberIncrease {
                new_member_id: "42".into()
            }
        );
    }
}
