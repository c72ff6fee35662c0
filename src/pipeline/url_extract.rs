//! URL extraction stage.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::PipelineError;
use crate::pipeline::context::Context;
use crate::pipeline::Stage;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[a-zA-Z0-9.-]+(:[0-9]{1,5})?(/[a-zA-Z0-9./?=&_@+!*(),;%~-]*)?")
        .unwrap_or_else(|e| unreachable!("invalid URL pattern: {e}"))
});

/// Return the first URL in `text`, or an empty string.
pub fn first_url(text: &str) -> String {
    URL_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Writes the first URL of `parsed_text` into the context.
pub struct UrlExtractStage;

#[async_trait]
impl Stage for UrlExtractStage {
    fn name(&self) -> &'static str {
        "url-extract"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        cx.url = first_url(&cx.parsed_text);
        Ok(())
    }
}
