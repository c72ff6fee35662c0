//! Command classifier stage.
//!
//! Two surface syntaxes name a command: a leading prefix (`/dl …`,
//! `!dl …`) or a trailing suffix (`… dl!`). Prefix takes precedence.
//! The candidate token is accepted only if it names an action in the
//! startup-time enabled set; anything else leaves the message a no-op.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;

const PREFIXES: [char; 2] = ['/', '!'];
const SUFFIX: char = '!';

/// Result of classifying a raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub action: Action,
    /// Residual text with the action token removed once, trimmed.
    pub parsed_text: String,
}

/// Classify `raw_text` against the enabled action set.
///
/// Returns `None` for plain messages, unknown tokens, and disabled
/// actions alike; none of those are errors.
pub fn classify(raw_text: &str, enabled: &HashSet<Action>) -> Option<Classification> {
    let (token, residual) = split_candidate(raw_text)?;
    if token.is_empty() {
        return None;
    }
    let action = Action::from_token(token)?;
    if !enabled.contains(&action) {
        return None;
    }
    Some(Classification {
        action,
        parsed_text: residual.trim().to_string(),
    })
}

/// Extract the candidate token and the residual text.
fn split_candidate(raw_text: &str) -> Option<(&str, &str)> {
    for prefix in PREFIXES {
        if let Some(stripped) = raw_text.strip_prefix(prefix) {
            // Token runs up to the first space; the rest is residual.
            return Some(match stripped.split_once(' ') {
                Some((token, rest)) => (token, rest),
                None => (stripped, ""),
            });
        }
    }

    if let Some(stripped) = raw_text.strip_suffix(SUFFIX) {
        // Last whitespace-separated token, removed once.
        let trimmed = stripped.trim_end();
        return Some(match trimmed.rfind(char::is_whitespace) {
            Some(idx) => (&trimmed[idx + 1..], &trimmed[..idx]),
            None => (trimmed, ""),
        });
    }

    None
}

/// Stage wrapper: writes the accepted classification into the context.
pub struct ClassifyStage {
    enabled: HashSet<Action>,
}

impl ClassifyStage {
    pub fn new(enabled: HashSet<Action>) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl Stage for ClassifyStage {
    fn name(&self) -> &'static str {
        "classify"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if let Some(classification) = classify(&cx.raw_text, &self.enabled) {
            cx.action = classification.action;
            cx.parsed_text = classification.parsed_text;
            tracing::info!(action = ?cx.action, "command received");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_enabled() -> HashSet<Action> {
        Action::all().collect()
    }

    #[test]
    fn slash_prefix_extracts_action_and_residual() {
        let c = classify("/dl https://example.test/v", &all_enabled()).unwrap();
        assert_eq!(c.action, Action::DownloadVideo);
        assert_eq!(c.parsed_text, "https://example.test/v");
    }

    #[test]
    fn bang_prefix_extracts_action() {
        let c = classify("!ping", &all_enabled()).unwrap();
        assert_eq!(c.action, Action::Ping);
        assert_eq!(c.parsed_text, "");
    }

    #[test]
    fn suffix_takes_last_token() {
        let c = classify("check this out dl!", &all_enabled()).unwrap();
        assert_eq!(c.action, Action::DownloadVideo);
        assert_eq!(c.parsed_text, "check this out");
    }

    #[test]
    fn single_token_suffix() {
        let c = classify("ping!", &all_enabled()).unwrap();
        assert_eq!(c.action, Action::Ping);
        assert_eq!(c.parsed_text, "");
    }

    #[test]
    fn prefix_beats_suffix() {
        // Both syntaxes could match; the prefix decides.
        let c = classify("/dice throw dl!", &all_enabled()).unwrap();
        assert_eq!(c.action, Action::DiceDuel);
        assert_eq!(c.parsed_text, "throw dl!");
    }

    #[test]
    fn token_removed_only_once() {
        let c = classify("/dl dl of the day", &all_enabled()).unwrap();
        assert_eq!(c.action, Action::DownloadVideo);
        assert_eq!(c.parsed_text, "dl of the day");

        let c = classify("dl stuff dl!", &all_enabled()).unwrap();
        assert_eq!(c.parsed_text, "dl stuff");
    }

    #[test]
    fn unknown_token_is_noop() {
        assert_eq!(classify("/frobnicate now", &all_enabled()), None);
        assert_eq!(classify("do it frobnicate!", &all_enabled()), None);
    }

    #[test]
    fn disabled_action_is_noop() {
        let only_ping = HashSet::from([Action::Ping]);
        assert_eq!(classify("/dl https://x.test/v", &only_ping), None);
        assert!(classify("/ping", &only_ping).is_some());
    }

    #[test]
    fn plain_text_is_noop() {
        assert_eq!(classify("hello there", &all_enabled()), None);
        assert_eq!(classify("", &all_enabled()), None);
        assert_eq!(classify("!", &all_enabled()), None);
        assert_eq!(classify("/", &all_enabled()), None);
    }

    #[tokio::test]
    async fn stage_leaves_action_unset_for_noop() {
        use crate::platform::{InboundEvent, Service};
        use std::sync::Arc;

        let stage = ClassifyStage::new(all_enabled());
        let event = InboundEvent {
            service: Service::Telegram,
            raw_text: "just chatting".to_string(),
            id: "1".to_string(),
            reply_to_id: None,
            chat_id: "c".to_string(),
        };
        let mut cx = Context::new(event, Arc::new(crate::platform::ConsolePlatform));
        stage.run(&mut cx).await.unwrap();
        assert_eq!(cx.action, Action::None);
        assert_eq!(cx.parsed_text, "");
    }
}
