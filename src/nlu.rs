//! Text-understanding collaborator.
//!
//! Two narrow language tasks are delegated to an OpenAI-compatible
//! chat-completions endpoint: resolving a free-form clip request
//! ("1m33s-", "last 20s") into a [`CutWindow`], and negating a sentence
//! for the dice-duel response. Both are side-channel work; their
//! failures never fail the message being processed.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::NluError;

/// A resolved clip window.
///
/// Negative `start_seconds` means an offset from the end of the source;
/// zero `duration_seconds` means "run to the end".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutWindow {
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// Language tasks the pipeline delegates out.
#[async_trait]
pub trait TextUnderstanding: Send + Sync {
    /// Extract a clip window from free-form text.
    async fn resolve_cut_window(&self, text: &str) -> Result<CutWindow, NluError>;

    /// Return the input sentence with its meaning negated.
    async fn negate(&self, text: &str) -> Result<String, NluError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create a new client against an OpenAI-compatible endpoint.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn chat(&self, body: &ChatRequest) -> Result<ChatResponse, NluError> {
        let url = self.api_url("chat/completions");
        tracing::debug!(url = %url, model = %body.model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| NluError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(NluError::RequestFailed(format!("HTTP {status}: {text}")));
        }

        serde_json::from_str(&text)
            .map_err(|e| NluError::InvalidResponse(format!("JSON parse error: {e}")))
    }
}

#[async_trait]
impl TextUnderstanding for OpenAiClient {
    async fn resolve_cut_window(&self, text: &str) -> Result<CutWindow, NluError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(text)],
            tools: Some(vec![cut_video_tool()]),
        };

        let response = self.chat(&request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| NluError::InvalidResponse("empty choices".to_string()))?;
        let call = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(NluError::NoToolCall)?;

        let args: CutArgsPayload = serde_json::from_str(&call.function.arguments)
            .map_err(|e| NluError::InvalidResponse(format!("bad tool arguments: {e}")))?;
        Ok(args.into_window())
    }

    async fn negate(&self, text: &str) -> Result<String, NluError> {
        let mut messages = vec![ChatMessage::system(
            "You are a bot that returns the given sentence with its meaning \
             inverted. Adjust word forms as needed. If the sentence has several \
             clauses, negate all of them. Only mention a name if it appears in \
             the user's message.",
        )];
        for (user, assistant) in NEGATION_EXAMPLES {
            messages.push(ChatMessage::user(*user));
            messages.push(ChatMessage::assistant(*assistant));
        }
        messages.push(ChatMessage::user(text));

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            tools: None,
        };

        let response = self.chat(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| NluError::InvalidResponse("empty completion".to_string()))
    }
}

/// Few-shot pairs steering the negation completion.
const NEGATION_EXAMPLES: &[(&str, &str)] = &[
    ("mike is going to work", "mike is not going to work"),
    ("let's buy the car", "let's not buy the car"),
    ("back to the office", "we are not going back to the office"),
];

fn cut_video_tool() -> ToolSpec {
    ToolSpec {
        kind: "function".to_string(),
        function: FunctionSpec {
            name: "cut_video".to_string(),
            description: "Cut video with subsecond accuracy. Examples: \
                          '1m33s-' => start_minutes = 1, start_seconds = 33; \
                          '20s-45s' => start_seconds = 20, duration_seconds = 25; \
                          'last 2m34s' => start_minutes = -2, start_seconds = -34; \
                          'first 6m8s' => duration_minutes = 6, duration_seconds = 8; \
                          '1m3.5s-' => start_minutes = 1, start_seconds = 3.5"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_minutes": {
                        "type": "number",
                        "description": "Start minutes of the clip. Negative when counting from the end."
                    },
                    "start_seconds": {
                        "type": "number",
                        "description": "Start seconds of the clip. Negative when counting from the end."
                    },
                    "duration_minutes": {
                        "type": "number",
                        "description": "Clip duration minutes, or 0 to run to the end."
                    },
                    "duration_seconds": {
                        "type": "number",
                        "description": "Clip duration seconds, or 0 to run to the end."
                    }
                },
                "required": ["start_minutes", "start_seconds"]
            }),
        },
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: String,
    function: FunctionSpec,
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    arguments: String,
}

/// Tool-call payload: the model reports minutes and seconds separately.
#[derive(Debug, Deserialize)]
struct CutArgsPayload {
    #[serde(default)]
    start_minutes: f64,
    #[serde(default)]
    start_seconds: f64,
    #[serde(default)]
    duration_minutes: f64,
    #[serde(default)]
    duration_seconds: f64,
}

impl CutArgsPayload {
    fn into_window(self) -> CutWindow {
        let duration = if self.duration_minutes > 0.0 || self.duration_seconds > 0.0 {
            self.duration_minutes * 60.0 + self.duration_seconds
        } else {
            0.0
        };
        CutWindow {
            start_seconds: self.start_minutes * 60.0 + self.start_seconds,
            duration_seconds: duration,
        }
    }
}
