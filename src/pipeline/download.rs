//! Media acquisition stage.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::media::Acquirer;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;

/// Acquires the source video for download and search commands.
///
/// Acquisition failure is not an error here: the context simply ends up
/// with no media, and the nagging logic downstream picks that up.
pub struct DownloadStage {
    acquirer: Arc<Acquirer>,
}

impl DownloadStage {
    pub fn new(acquirer: Arc<Acquirer>) -> Self {
        Self { acquirer }
    }
}

#[async_trait]
impl Stage for DownloadStage {
    fn name(&self) -> &'static str {
        "download"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        let reference = match cx.action {
            Action::DownloadVideo => cx.url.clone(),
            Action::SearchVideo => format!("ytsearch:\"{}\"", cx.parsed_text),
            _ => return Ok(()),
        };
        if reference.is_empty() {
            tracing::debug!("download command without a reference, skipping acquisition");
            return Ok(());
        }

        if let Some(path) = self.acquirer.acquire(&reference).await {
            cx.scratch_files.push(path.clone());
            cx.source_media_path = Some(path.clone());
            cx.final_media_path = Some(path);
        }
        Ok(())
    }
}
