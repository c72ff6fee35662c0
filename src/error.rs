//! Error types for clipbot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Text understanding error: {0}")]
    Nlu(#[from] NluError),

    #[error("Rates error: {0}")]
    Rates(#[from] RatesError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown action token in ENABLED_ACTIONS: {0}")]
    UnknownAction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the platform adapter boundary (send/edit/delete).
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Failed to send on chat {chat_id}: {reason}")]
    SendFailed { chat_id: String, reason: String },

    #[error("Failed to edit message {message_id}: {reason}")]
    EditFailed { message_id: String, reason: String },

    #[error("Failed to delete message {message_id}: {reason}")]
    DeleteFailed { message_id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single media fetch attempt failed.
///
/// Attempt failures are recoverable: the acquirer retries through the
/// proxy rotation and only reports "no media" after exhausting it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Fetch tool exited with {status} for {reference}")]
    ToolFailed { reference: String, status: String },

    #[error("Failed to spawn fetch tool: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Transcode tool failures. Fatal for the message being processed.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("{op} failed with {status} for {input}")]
    ToolFailed {
        op: &'static str,
        input: String,
        status: String,
    },

    #[error("IO error during {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Text-understanding collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum NluError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned no tool call")]
    NoToolCall,

    #[error("Collaborator not configured")]
    NotConfigured,
}

/// Rate-query collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum RatesError {
    #[error("Rates unavailable: {0}")]
    Unavailable(String),
}

/// Fatal errors inside the synchronous stage chain.
///
/// A stage returning one of these aborts the remaining stages for the
/// current message; terminal cleanup still runs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
