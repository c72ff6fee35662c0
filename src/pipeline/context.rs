//! Per-message processing context.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::nlu::CutWindow;
use crate::platform::{InboundEvent, Platform, Service};
use crate::rates::RateSnapshot;

/// The closed command set.
///
/// Assigned at most once per message, by the classifier stage only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    DownloadVideo,
    SearchVideo,
    DiceDuel,
    RateQuery,
    Ping,
    #[default]
    None,
}

impl Action {
    /// The chat token naming this action, if it has one.
    pub fn token(self) -> Option<&'static str> {
        match self {
            Self::DownloadVideo => Some("dl"),
            Self::SearchVideo => Some("search"),
            Self::DiceDuel => Some("dice"),
            Self::RateQuery => Some("rates"),
            Self::Ping => Some("ping"),
            Self::None => None,
        }
    }

    /// Resolve a chat token to its action.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "dl" => Some(Self::DownloadVideo),
            "search" => Some(Self::SearchVideo),
            "dice" => Some(Self::DiceDuel),
            "rates" => Some(Self::RateQuery),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }

    /// All real actions (everything except `None`).
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::DownloadVideo,
            Self::SearchVideo,
            Self::DiceDuel,
            Self::RateQuery,
            Self::Ping,
        ]
        .into_iter()
    }
}

/// Mutable record threaded through every pipeline stage.
///
/// One per inbound message, exclusively owned by its pipeline run.
/// Background tasks it spawns report back through the single-shot
/// receivers below and never outlive terminal cleanup.
pub struct Context {
    pub service: Service,
    /// Original message text, unparsed.
    pub raw_text: String,
    /// Text without the action token and its prefix/suffix.
    pub parsed_text: String,
    /// Platform-native IDs, normalized to strings at ingestion.
    pub id: String,
    pub reply_to_id: String,
    pub chat_id: String,
    pub action: Action,
    /// First URL found in `parsed_text`, or empty.
    pub url: String,
    // A separate flag, since an empty reply_to_id cannot distinguish
    // "no reply" from a platform whose first message ID is falsy.
    pub should_reply_to_message: bool,
    pub is_reply: bool,

    /// Acquired source file, if acquisition succeeded.
    pub source_media_path: Option<PathBuf>,
    /// The video that will finally be sent; later stages may replace
    /// it with a fresh derived path.
    pub final_media_path: Option<PathBuf>,
    pub final_image_path: Option<PathBuf>,
    /// Scratch files awaiting deletion at terminal cleanup.
    pub scratch_files: Vec<PathBuf>,

    /// Resolved clip window, delivered by the cut-argument task.
    pub cut_window: Option<oneshot::Receiver<Option<CutWindow>>>,
    /// Negation text, delivered by the dice-duel background task.
    pub negation: Option<oneshot::Receiver<String>>,
    pub got_doubles: bool,
    pub last_roll_at: Option<Instant>,

    pub rates: Option<RateSnapshot>,
    pub text_response: String,
    pub should_delete_original_message: bool,
    pub should_nag_about_original_message: bool,
    pub send_succeeded: bool,

    /// Cancels the typing heartbeat task. `None` if none was started.
    pub heartbeat: Option<CancellationToken>,

    pub platform: Arc<dyn Platform>,
}

impl Context {
    /// Build a context from a normalized inbound event.
    pub fn new(event: InboundEvent, platform: Arc<dyn Platform>) -> Self {
        let is_reply = event.reply_to_id.is_some();
        Self {
            service: event.service,
            raw_text: event.raw_text,
            parsed_text: String::new(),
            id: event.id,
            reply_to_id: event.reply_to_id.unwrap_or_default(),
            chat_id: event.chat_id,
            action: Action::None,
            url: String::new(),
            should_reply_to_message: is_reply,
            is_reply,
            source_media_path: None,
            final_media_path: None,
            final_image_path: None,
            scratch_files: Vec::new(),
            cut_window: None,
            negation: None,
            got_doubles: false,
            last_roll_at: None,
            rates: None,
            text_response: String::new(),
            should_delete_original_message: false,
            should_nag_about_original_message: false,
            send_succeeded: false,
            heartbeat: None,
            platform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        for action in Action::all() {
            let token = action.token().unwrap();
            assert_eq!(Action::from_token(token), Some(action));
        }
    }

    #[test]
    fn none_has_no_token() {
        assert_eq!(Action::None.token(), None);
        assert_eq!(Action::from_token("none"), None);
    }

    #[test]
    fn reply_event_sets_reply_flags() {
        let event = InboundEvent {
            service: Service::Discord,
            raw_text: "/ping".to_string(),
            id: "10".to_string(),
            reply_to_id: Some("9".to_string()),
            chat_id: "c1".to_string(),
        };
        let cx = Context::new(event, Arc::new(crate::platform::ConsolePlatform));
        assert!(cx.is_reply);
        assert!(cx.should_reply_to_message);
        assert_eq!(cx.reply_to_id, "9");
    }
}
