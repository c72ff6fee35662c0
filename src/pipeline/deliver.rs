//! Delivery stages.
//!
//! Each stage delivers one kind of payload if the context carries it.
//! Platform failures are logged and absorbed; the pipeline keeps moving
//! so later deliveries and marks still run.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::context::Context;
use crate::pipeline::Stage;

pub struct VideoResponseStage;

#[async_trait]
impl Stage for VideoResponseStage {
    fn name(&self) -> &'static str {
        "video-response"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        let Some(path) = cx.final_media_path.clone() else {
            return Ok(());
        };
        match cx.platform.send_video(&cx.chat_id, &path).await {
            Ok(()) => cx.send_succeeded = true,
            Err(e) => tracing::warn!(error = %e, path = %path.display(), "video send failed"),
        }
        Ok(())
    }
}

pub struct ImageResponseStage;

#[async_trait]
impl Stage for ImageResponseStage {
    fn name(&self) -> &'static str {
        "image-response"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        let Some(path) = cx.final_image_path.clone() else {
            return Ok(());
        };
        if let Err(e) = cx.platform.send_image(&cx.chat_id, &path).await {
            tracing::warn!(error = %e, path = %path.display(), "image send failed");
        }
        Ok(())
    }
}

pub struct TextResponseStage;

#[async_trait]
impl Stage for TextResponseStage {
    fn name(&self) -> &'static str {
        "text-response"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if cx.text_response.is_empty() {
            return Ok(());
        }
        let reply_to = if cx.should_reply_to_message && !cx.reply_to_id.is_empty() {
            Some(cx.reply_to_id.as_str())
        } else {
            None
        };
        if let Err(e) = cx
            .platform
            .send_text(&cx.chat_id, &cx.text_response, reply_to)
            .await
        {
            tracing::warn!(error = %e, "text send failed");
        }
        Ok(())
    }
}

pub struct DeleteOriginalStage;

#[async_trait]
impl Stage for DeleteOriginalStage {
    fn name(&self) -> &'static str {
        "delete-original"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if !cx.should_delete_original_message {
            return Ok(());
        }
        if let Err(e) = cx.platform.delete_message(&cx.chat_id, &cx.id).await {
            tracing::warn!(error = %e, "delete of original message failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::PlatformError;
    use crate::platform::{InboundEvent, Platform, Service};

    struct RecordingPlatform {
        log: Mutex<Vec<String>>,
        fail_video: bool,
    }

    impl RecordingPlatform {
        fn new(fail_video: bool) -> Arc<Self> {
            Arc::new(Self {
                log: Mutex::new(Vec::new()),
                fail_video,
            })
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Platform for RecordingPlatform {
        async fn send_typing(&self, _chat_id: &str) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn send_text(
            &self,
            chat_id: &str,
            text: &str,
            reply_to: Option<&str>,
        ) -> Result<String, PlatformError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("text:{chat_id}:{text}:{reply_to:?}"));
            Ok("m1".to_string())
        }

        async fn edit_text(
            &self,
            _chat_id: &str,
            _message_id: &str,
            _text: &str,
        ) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn send_video(&self, chat_id: &str, path: &Path) -> Result<(), PlatformError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("video:{chat_id}:{}", path.display()));
            if self.fail_video {
                return Err(PlatformError::SendFailed {
                    chat_id: chat_id.to_string(),
                    reason: "payload too large".to_string(),
                });
            }
            Ok(())
        }

        async fn send_image(&self, chat_id: &str, path: &Path) -> Result<(), PlatformError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("image:{chat_id}:{}", path.display()));
            Ok(())
        }

        async fn delete_message(
            &self,
            chat_id: &str,
            message_id: &str,
        ) -> Result<(), PlatformError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("delete:{chat_id}:{message_id}"));
            Ok(())
        }
    }

    fn context(platform: Arc<RecordingPlatform>) -> Context {
        let event = InboundEvent {
            service: Service::Telegram,
            raw_text: String::new(),
            id: "5".to_string(),
            reply_to_id: None,
            chat_id: "c".to_string(),
        };
        Context::new(event, platform as Arc<dyn Platform>)
    }

    #[tokio::test]
    async fn video_send_marks_success() {
        let platform = RecordingPlatform::new(false);
        let mut cx = context(Arc::clone(&platform));
        cx.final_media_path = Some(PathBuf::from("/tmp/out.mp4"));

        VideoResponseStage.run(&mut cx).await.unwrap();
        assert!(cx.send_succeeded);
        assert_eq!(platform.log(), vec!["video:c:/tmp/out.mp4"]);
    }

    #[tokio::test]
    async fn video_send_failure_is_absorbed() {
        let platform = RecordingPlatform::new(true);
        let mut cx = context(Arc::clone(&platform));
        cx.final_media_path = Some(PathBuf::from("/tmp/out.mp4"));

        VideoResponseStage.run(&mut cx).await.unwrap();
        assert!(!cx.send_succeeded);
    }

    #[tokio::test]
    async fn no_media_means_no_send() {
        let platform = RecordingPlatform::new(false);
        let mut cx = context(Arc::clone(&platform));

        VideoResponseStage.run(&mut cx).await.unwrap();
        ImageResponseStage.run(&mut cx).await.unwrap();
        assert!(platform.log().is_empty());
    }

    #[tokio::test]
    async fn text_reply_threads_when_asked() {
        let platform = RecordingPlatform::new(false);
        let mut cx = context(Arc::clone(&platform));
        cx.text_response = "pong".to_string();
        cx.reply_to_id = "9".to_string();
        cx.should_reply_to_message = true;

        TextResponseStage.run(&mut cx).await.unwrap();
        assert_eq!(platform.log(), vec!["text:c:pong:Some(\"9\")"]);
    }

    #[tokio::test]
    async fn empty_text_is_not_sent() {
        let platform = RecordingPlatform::new(false);
        let mut cx = context(Arc::clone(&platform));

        TextResponseStage.run(&mut cx).await.unwrap();
        assert!(platform.log().is_empty());
    }

    #[tokio::test]
    async fn delete_honors_the_mark() {
        let platform = RecordingPlatform::new(false);
        let mut cx = context(Arc::clone(&platform));

        DeleteOriginalStage.run(&mut cx).await.unwrap();
        assert!(platform.log().is_empty());

        cx.should_delete_original_message = true;
        DeleteOriginalStage.run(&mut cx).await.unwrap();
        assert_eq!(platform.log(), vec!["delete:c:5"]);
    }
}
