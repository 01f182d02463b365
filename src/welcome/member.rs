//! Member-id resolution for heuristic join signals.
//!
//! Platforms disagree on where the joining member's id lives. Resolution
//! walks a fixed alias list over the raw payload, then falls back to the
//! first mention inside the message.

use serde_json::Value;

use super::event::{Component, MessageEvent};

/// Payload keys that may carry the new member's id, in priority order.
/// Supporting another platform means appending its key here.
pub const MEMBER_ID_ALIASES: &[&str] = &["user_id", "operator_id"];

/// Resolve the joining member's id from a heuristic join message.
pub fn resolve_member_id(event: &MessageEvent) -> Option<String> {
    MEMBER_ID_ALIASES
        .iter()
        .find_map(|alias| event.raw_payload.get(*alias).and_then(id_from_value))
        .or_else(|| first_mention(&event.message_components))
}

/// Accept non-empty strings and numbers; anything else is not an id.
fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_mention(components: &[Component]) -> Option<String> {
    components.iter().find_map(|c| match c {
        Component::Mention { target } if !target.is_empty() => Some(target.clone()),
        _ => None,
    })
}
