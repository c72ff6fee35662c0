//! Platform adapter boundary.
//!
//! Adapters (Telegram, Discord) live outside this crate. They normalize
//! inbound events into [`InboundEvent`] — platform-native message and
//! chat IDs become opaque strings here — and implement [`Platform`] for
//! outbound traffic. The core never talks to a platform SDK directly.

use std::path::Path;

use async_trait::async_trait;

use crate::error::PlatformError;

/// Origin platform of a message.
///
/// Used for reply formatting only; the media cascade never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Telegram,
    Discord,
}

/// A normalized inbound chat message, as handed over by an adapter.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub service: Service,
    /// Original message text (adapters strip their own bot mention).
    pub raw_text: String,
    /// Message ID, normalized to a string.
    pub id: String,
    /// ID of the message this one replies to, if any.
    pub reply_to_id: Option<String>,
    /// Chat or channel ID, normalized to a string.
    pub chat_id: String,
}

/// Outbound operations an adapter must provide.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Emit a "typing/uploading" indicator for the chat.
    async fn send_typing(&self, chat_id: &str) -> Result<(), PlatformError>;

    /// Send a text message, optionally threading it as a reply.
    /// Returns the ID of the sent message.
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, PlatformError>;

    /// Replace the text of a previously sent message.
    async fn edit_text(
        &self,
        chat_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), PlatformError>;

    /// Send a video file.
    async fn send_video(&self, chat_id: &str, path: &Path) -> Result<(), PlatformError>;

    /// Send an image file.
    async fn send_image(&self, chat_id: &str, path: &Path) -> Result<(), PlatformError>;

    /// Delete a message.
    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<(), PlatformError>;
}

/// Console-backed platform for the local runner.
///
/// Prints outbound traffic to stdout so the pipeline can be exercised
/// without a live adapter.
pub struct ConsolePlatform;

#[async_trait]
impl Platform for ConsolePlatform {
    async fn send_typing(&self, _chat_id: &str) -> Result<(), PlatformError> {
        println!("[typing…]");
        Ok(())
    }

    async fn send_text(
        &self,
        _chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, PlatformError> {
        match reply_to {
            Some(id) => println!("[reply to {id}] {text}"),
            None => println!("{text}"),
        }
        Ok("console-0".to_string())
    }

    async fn edit_text(
        &self,
        _chat_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), PlatformError> {
        println!("[edit {message_id}] {text}");
        Ok(())
    }

    async fn send_video(&self, _chat_id: &str, path: &Path) -> Result<(), PlatformError> {
        println!("[video] {}", path.display());
        Ok(())
    }

    async fn send_image(&self, _chat_id: &str, path: &Path) -> Result<(), PlatformError> {
        println!("[image] {}", path.display());
        Ok(())
    }

    async fn delete_message(&self, _chat_id: &str, message_id: &str) -> Result<(), PlatformError> {
        println!("[deleted {message_id}]");
        Ok(())
    }
}
