//! Message dispatcher setup.
//!
//! Builds the dispatcher with the member-update and group-message handlers.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::config::SharedConfig;
use crate::events;
use crate::events::welcome::StalledProbes;
use crate::welcome::{FileProbe, LocalFs};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Current welcome configuration, swapped wholesale on reload.
    pub config: SharedConfig,

    /// Filesystem probe used to locate the welcome image.
    pub probe: Arc<dyn FileProbe>,

    /// Image probes that timed out and have not returned yet.
    pub stalled_probes: Arc<StalledProbes>,
}

impl AppState {
    /// Create a new application state backed by the local filesystem.
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            probe: Arc::new(LocalFs),
            stalled_probes: Arc::default(),
        }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    // Heuristic join announcements arrive as ordinary group messages
    let message_handler = Update::filter_message().branch(events::message_event_handler());

    // Structured joins arrive as chat member updates
    let member_handler = Update::filter_chat_member().branch(events::event_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(member_handler)
}
