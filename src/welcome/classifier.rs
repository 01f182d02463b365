//! Join event classification.

use tracing::{debug, warn};

use super::event::{InboundEvent, JoinEvent};

/// Sender id that marks platform-generated system messages.
pub const DEFAULT_SYSTEM_SENDER: &str = "system";

/// Phrases a system message uses to announce a join.
pub const DEFAULT_JOIN_PHRASES: &[&str] = &["加入了群聊", "加入群聊", "加入了本群", "joined the group"];

/// Outcome of classifying one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    NotAJoin,
    Join(JoinEvent),
}

/// Settings for recognising join announcements in ordinary messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDetection {
    pub system_sender_id: String,
    pub join_phrases: Vec<String>,
}

impl Default for JoinDetection {
    fn default() -> Self {
        Self {
            system_sender_id: DEFAULT_SYSTEM_SENDER.to_string(),
            join_phrases: DEFAULT_JOIN_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl JoinDetection {
    /// True when a message from `sender_id` reading `text` announces a join.
    pub fn is_announcement(&self, sender_id: &str, text: &str) -> bool {
        sender_id == self.system_sender_id
            && self
                .join_phrases
                .iter()
                .any(|phrase| !phrase.is_empty() && text.contains(phrase.as_str()))
    }
}

/// Decide whether `event` announces a new member. Stateless.
pub fn classify(event: &InboundEvent, detection: &JoinDetection) -> Classification {
    match event {
        InboundEvent::MemberIncrease { new_member_id } => {
            if new_member_id.trim().is_empty() {
                warn!("Member increase event without a member id, ignoring");
                return Classification::NotAJoin;
            }
            Classification::Join(JoinEvent::Structured {
                new_member_id: new_member_id.clone(),
            })
        }
        InboundEvent::Message(msg) => {
            if !detection.is_announcement(&msg.sender_id, &msg.text) {
                return Classification::NotAJoin;
            }
            debug!("Join phrase detected in system message: {}", msg.text);
            Classification::Join(JoinEvent::Heuristic(msg.clone()))
        }
    }
}
