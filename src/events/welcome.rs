//! Welcome event handler.
//!
//! Turns member joins (chat member updates) and join announcements (system
//! messages relayed into the group) into greetings.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{
    ChatMemberUpdated, InputFile, MessageEntityKind, MessageEntityRef, ParseMode,
};
use tracing::{debug, error, info, warn};

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::config::WelcomeConfig;
use crate::utils::html_escape;
use crate::welcome::{
    assemble, classify, AssembleError, Classification, Component, FileProbe, InboundEvent,
    JoinEvent, MediaSource, MessageEvent, MessagePlan, Segment, UnavailableFs,
};

/// Upper bound for the image probe before falling back to a text greeting.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Telegram's limit for photo captions.
const CAPTION_LIMIT: usize = 1024;

/// Display names keyed by member id, used as mention labels.
type MentionNames = HashMap<String, String>;

const PROBE_RUNNING: u8 = 0;
const PROBE_FINISHED: u8 = 1;
const PROBE_ABANDONED: u8 = 2;

/// Count of image probes that outlived [`PROBE_TIMEOUT`] and still hold a
/// blocking-pool thread.
///
/// While any is outstanding new joins skip the filesystem entirely, so a hung
/// mount costs one thread rather than one per join.
#[derive(Debug, Default)]
pub struct StalledProbes(AtomicUsize);

impl StalledProbes {
    pub fn any(&self) -> bool {
        self.0.load(Ordering::Acquire) > 0
    }
}

/// Returns the handler for chat member updates.
pub fn member_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter_map(member_update_to_event).endpoint(member_join_handler)
}

/// Map a chat member update to a structured join signal.
///
/// Only not-present to present transitions of non-bot users count.
fn member_update_to_event(update: ChatMemberUpdated) -> Option<InboundEvent> {
    let old = &update.old_chat_member;
    let new = &update.new_chat_member;

    let is_joining = !old.is_present() && new.is_present();
    if !is_joining || new.user.is_bot {
        return None;
    }

    Some(InboundEvent::MemberIncrease {
        new_member_id: new.user.id.to_string(),
    })
}

async fn member_join_handler(
    bot: ThrottledBot,
    update: ChatMemberUpdated,
    event: InboundEvent,
    state: AppState,
) -> anyhow::Result<()> {
    let user = &update.new_chat_member.user;
    debug!("New member {} joined chat {}", user.id, update.chat.id);

    let names = MentionNames::from([(user.id.to_string(), user.full_name())]);
    let config = state.config.snapshot();
    greet(&bot, update.chat.id, event, &names, config, &state).await
}

/// Handle a group message that may be a join announcement.
pub async fn message_handler(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let config = state.config.snapshot();

    // Cheap sender/phrase check before serializing the whole message
    let Some(sender) = msg.from.as_ref() else {
        return Ok(());
    };
    if !config
        .detection
        .is_announcement(&sender.id.to_string(), message_text(&msg))
    {
        return Ok(());
    }

    let Some(event) = message_to_event(&msg) else {
        return Ok(());
    };

    greet(&bot, msg.chat.id, event, &mention_names(&msg), config, &state).await
}

fn message_text(msg: &Message) -> &str {
    msg.text().or_else(|| msg.caption()).unwrap_or_default()
}

/// Text entities, or caption entities for media messages.
fn entities(msg: &Message) -> Vec<MessageEntityRef<'_>> {
    msg.parse_entities()
        .or_else(|| msg.parse_caption_entities())
        .unwrap_or_default()
}

/// Map a Telegram message to the neutral message shape.
fn message_to_event(msg: &Message) -> Option<InboundEvent> {
    let sender_id = msg.from.as_ref()?.id.to_string();
    let text = message_text(msg);

    let raw_payload = match serde_json::to_value(msg) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            debug!("Could not serialize message {}: {}", msg.id.0, e);
            Map::new()
        }
    };

    let message_components = entities(msg)
        .iter()
        .map(|entity| component_from_entity(entity.kind(), entity.text()))
        .collect();

    Some(InboundEvent::Message(MessageEvent {
        sender_id,
        text: text.to_string(),
        raw_payload,
        message_components,
    }))
}

/// `TextMention` carries a user id, `@username` mentions carry the handle.
fn component_from_entity(kind: &MessageEntityKind, text: &str) -> Component {
    match kind {
        MessageEntityKind::TextMention { user } => Component::Mention {
            target: user.id.to_string(),
        },
        MessageEntityKind::Mention => Component::Mention {
            target: text.trim_start_matches('@').to_string(),
        },
        _ => Component::Other,
    }
}

fn mention_names(msg: &Message) -> MentionNames {
    entities(msg)
        .iter()
        .filter_map(|entity| match entity.kind() {
            MessageEntityKind::TextMention { user } => {
                Some((user.id.to_string(), user.full_name()))
            }
            _ => None,
        })
        .collect()
}

/// Classify, assemble and deliver. Non-joins return quietly.
async fn greet(
    bot: &ThrottledBot,
    chat_id: ChatId,
    event: InboundEvent,
    names: &MentionNames,
    config: Arc<WelcomeConfig>,
    state: &AppState,
) -> anyhow::Result<()> {
    // `config` is one snapshot for the whole event; a reload mid-flight is not observed.
    let join = match classify(&event, &config.detection) {
        Classification::NotAJoin => return Ok(()),
        Classification::Join(join) => join,
    };

    let plan = match build_plan(join, config, state.probe.clone(), state.stalled_probes.clone()).await? {
        Ok(plan) => plan,
        Err(e) => {
            warn!("Dropping join event in chat {}: {}", chat_id, e);
            return Ok(());
        }
    };

    let text = render_html(&plan, names);
    deliver(bot, chat_id, &plan, text).await?;

    info!(
        "Sent welcome message to new member {} in chat {}",
        plan.member_id, chat_id
    );

    Ok(())
}

/// Run assembly on the blocking pool, bounded by [`PROBE_TIMEOUT`].
///
/// On timeout, or while an earlier probe is still stuck, the plan is built
/// without touching the filesystem, so the greeting goes out text-only. A
/// timed-out task cannot be cancelled; it is counted in `stalled` until it
/// returns.
async fn build_plan(
    join: JoinEvent,
    config: Arc<WelcomeConfig>,
    probe: Arc<dyn FileProbe>,
    stalled: Arc<StalledProbes>,
) -> anyhow::Result<Result<MessagePlan, AssembleError>> {
    if stalled.any() {
        debug!("Earlier image probe still stuck, skipping the filesystem");
        return Ok(assemble(&join, &config, &offline_probe()));
    }

    let progress = Arc::new(AtomicU8::new(PROBE_RUNNING));
    let task = {
        let join = join.clone();
        let config = config.clone();
        let progress = progress.clone();
        let stalled = stalled.clone();
        tokio::task::spawn_blocking(move || {
            let plan = assemble(&join, &config, probe.as_ref());
            if progress.swap(PROBE_FINISHED, Ordering::AcqRel) == PROBE_ABANDONED {
                stalled.0.fetch_sub(1, Ordering::AcqRel);
            }
            plan
        })
    };

    match tokio::time::timeout(PROBE_TIMEOUT, task).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            // Count first so the task's decrement can never run ahead of it
            stalled.0.fetch_add(1, Ordering::AcqRel);
            if progress
                .compare_exchange(
                    PROBE_RUNNING,
                    PROBE_ABANDONED,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                // Finished right at the deadline
                stalled.0.fetch_sub(1, Ordering::AcqRel);
            }
            warn!(
                "Welcome image probe exceeded {:?}, sending without image",
                PROBE_TIMEOUT
            );
            Ok(assemble(&join, &config, &offline_probe()))
        }
    }
}

fn offline_probe() -> UnavailableFs {
    UnavailableFs {
        reason: format!("probe exceeded {:?}", PROBE_TIMEOUT),
    }
}

/// Render segments to Telegram HTML.
///
/// Numeric targets become `tg://user` links labelled with the known display
/// name (or the id); anything else is written as an `@handle`.
fn render_html(plan: &MessagePlan, names: &MentionNames) -> String {
    plan.segments
        .iter()
        .map(|segment| match segment {
            Segment::Text { content } => html_escape(content),
            Segment::Mention { target_id } if target_id.parse::<u64>().is_ok() => {
                let label = names.get(target_id).unwrap_or(target_id);
                format!(
                    "<a href=\"tg://user?id={}\">{}</a>",
                    target_id,
                    html_escape(label)
                )
            }
            Segment::Mention { target_id } => format!("@{}", html_escape(target_id)),
        })
        .collect()
}

/// Send the greeting. A failed photo falls back to plain text.
async fn deliver(
    bot: &ThrottledBot,
    chat_id: ChatId,
    plan: &MessagePlan,
    text: String,
) -> anyhow::Result<()> {
    let photo = match &plan.media {
        Some(MediaSource::LocalFile(path)) => Some(InputFile::file(path.clone())),
        Some(MediaSource::RemoteUrl(url)) => Some(InputFile::url(url.clone())),
        None => None,
    };

    if let Some(photo) = photo {
        let fits_caption = text.chars().count() <= CAPTION_LIMIT;
        let mut request = bot.send_photo(chat_id, photo);
        if fits_caption && !text.is_empty() {
            request = request.caption(text.clone()).parse_mode(ParseMode::Html);
        }

        match request.await {
            Ok(_) if fits_caption => return Ok(()),
            Ok(_) => {}
            Err(e) => error!("Failed to send welcome image to chat {}: {}", chat_id, e),
        }
    }

    if text.is_empty() {
        debug!("Welcome text is empty, nothing more to send to chat {}", chat_id);
        return Ok(());
    }

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}
