//! Event handler system.
//!
//! Translates Telegram updates into platform-neutral [`InboundEvent`]s and
//! delivers the resulting greetings.
//!
//! [`InboundEvent`]: crate::welcome::InboundEvent

pub mod welcome;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

/// Build the handler for chat member updates (structured join signal).
pub fn event_handler() -> UpdateHandler<anyhow::Error> {
    welcome::member_handler()
}

/// Build the group message handler (heuristic join signal).
pub fn message_event_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| msg.chat.is_group() || msg.chat.is_supergroup())
        .endpoint(welcome::message_handler)
}
