//! Message plan assembly.

use thiserror::Error;
use tracing::{error, warn};

use super::event::JoinEvent;
use super::media::{resolve_media, FileProbe, MediaSource};
use super::member::resolve_member_id;
use super::template::Segment;
use crate::config::WelcomeConfig;

/// Platform-agnostic greeting, ready for the transport to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePlan {
    pub member_id: String,
    pub segments: Vec<Segment>,
    pub media: Option<MediaSource>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("could not determine the new member's id")]
    MissingMemberId,
}

/// Build the greeting for a classified join.
///
/// Fails only when no member id can be found. Image problems are logged and
/// leave the plan without media.
pub fn assemble(
    join: &JoinEvent,
    config: &WelcomeConfig,
    probe: &dyn FileProbe,
) -> Result<MessagePlan, AssembleError> {
    let member_id = match join {
        JoinEvent::Structured { new_member_id } => Some(new_member_id.clone()),
        JoinEvent::Heuristic(msg) => resolve_member_id(msg),
    }
    .filter(|id| !id.trim().is_empty())
    .ok_or(AssembleError::MissingMemberId)?;

    let segments = config.template.compile(&member_id);

    let media = match resolve_media(config.image_path.as_deref(), &config.default_image_path, probe) {
        Ok(Some(media)) => Some(media),
        Ok(None) => {
            let default = config.default_image_path.display().to_string();
            warn!(
                "Welcome image not found (path: {})",
                config.image_path.as_deref().unwrap_or(&default)
            );
            None
        }
        Err(e) => {
            error!("Failed to load welcome image: {}", e);
            None
        }
    };

    Ok(MessagePlan {
        member_id,
        segments,
        media,
    })
}
