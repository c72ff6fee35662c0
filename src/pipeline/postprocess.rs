//! Postprocessing cascade stage.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::media::Cascade;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;

/// Runs the cut → normalize → size-reduction cascade over acquired
/// media.
///
/// The cut-window channel is consumed here, exactly once, before
/// anything else: the resolver task completes independently of whether
/// this message ends up postprocessing at all. Transcode failures are
/// fatal for the message; acquisition failure just skips the step.
pub struct PostprocessStage {
    cascade: Arc<Cascade>,
    postprocessed_actions: HashSet<Action>,
}

impl PostprocessStage {
    pub fn new(cascade: Arc<Cascade>, postprocessed_actions: HashSet<Action>) -> Self {
        Self {
            cascade,
            postprocessed_actions,
        }
    }
}

#[async_trait]
impl Stage for PostprocessStage {
    fn name(&self) -> &'static str {
        "postprocess"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        let cut = match cx.cut_window.take() {
            Some(rx) => rx.await.unwrap_or(None),
            None => None,
        };

        if !self.postprocessed_actions.contains(&cx.action) {
            return Ok(());
        }
        let Some(source) = cx.final_media_path.clone() else {
            return Ok(());
        };

        let final_path = self
            .cascade
            .run(&source, cut, &mut cx.scratch_files)
            .await?;
        cx.final_media_path = Some(final_path);
        Ok(())
    }
}
