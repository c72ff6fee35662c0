//! Typing heartbeat stage.
//!
//! While a command is being processed the platform shows a
//! "typing/uploading" indicator. The indicator is emitted immediately
//! and then every four seconds from a detached task until terminal
//! cleanup fires the cancellation token. Send failures are logged and
//! swallowed; they never disturb the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;

/// Interval between typing signals.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(4);

/// Starts the heartbeat task for messages carrying a command.
pub struct TypingStage;

#[async_trait]
impl Stage for TypingStage {
    fn name(&self) -> &'static str {
        "typing"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if cx.action == Action::None {
            return Ok(());
        }

        let token = CancellationToken::new();
        cx.heartbeat = Some(token.clone());

        let platform = cx.platform.clone();
        let chat_id = cx.chat_id.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    // The first tick completes immediately.
                    _ = ticker.tick() => {
                        if let Err(e) = platform.send_typing(&chat_id).await {
                            tracing::warn!(error = %e, "typing signal failed");
                        }
                    }
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::PlatformError;
    use crate::platform::{InboundEvent, Platform, Service};

    struct CountingPlatform {
        typing_sent: AtomicUsize,
    }

    #[async_trait]
    impl Platform for CountingPlatform {
        async fn send_typing(&self, _chat_id: &str) -> Result<(), PlatformError> {
            self.typing_sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_text(
            &self,
            _chat_id: &str,
            _text: &str,
            _reply_to: Option<&str>,
        ) -> Result<String, PlatformError> {
            Ok("1".to_string())
        }

        async fn edit_text(
            &self,
            _chat_id: &str,
            _message_id: &str,
            _text: &str,
        ) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn send_video(&self, _chat_id: &str, _path: &Path) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn send_image(&self, _chat_id: &str, _path: &Path) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn delete_message(
            &self,
            _chat_id: &str,
            _message_id: &str,
        ) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn context(action: Action, platform: Arc<CountingPlatform>) -> Context {
        let event = InboundEvent {
            service: Service::Telegram,
            raw_text: String::new(),
            id: "1".to_string(),
            reply_to_id: None,
            chat_id: "c".to_string(),
        };
        let mut cx = Context::new(event, platform);
        cx.action = action;
        cx
    }

    // ── Heartbeat emits immediately and stops on cancellation ──

    #[tokio::test]
    async fn heartbeat_emits_then_cancels() {
        let platform = Arc::new(CountingPlatform {
            typing_sent: AtomicUsize::new(0),
        });
        let mut cx = context(Action::Ping, Arc::clone(&platform));

        TypingStage.run(&mut cx).await.unwrap();
        let token = cx.heartbeat.clone().unwrap();

        // The first signal goes out without waiting a full interval.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(platform.typing_sent.load(Ordering::SeqCst), 1);

        token.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_cancel = platform.typing_sent.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(platform.typing_sent.load(Ordering::SeqCst), after_cancel);
    }

    // ── No command, no heartbeat ──

    #[tokio::test]
    async fn no_heartbeat_without_action() {
        let platform = Arc::new(CountingPlatform {
            typing_sent: AtomicUsize::new(0),
        });
        let mut cx = context(Action::None, Arc::clone(&platform));

        TypingStage.run(&mut cx).await.unwrap();
        assert!(cx.heartbeat.is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(platform.typing_sent.load(Ordering::SeqCst), 0);
    }
}
