//! Outcome-marking stages.
//!
//! After delivery has been attempted, the message is marked either for
//! nagging (the download never made it) or for deletion of the original
//! (the video went out, the link is no longer needed).

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;

pub struct MarkForNaggingStage;

#[async_trait]
impl Stage for MarkForNaggingStage {
    fn name(&self) -> &'static str {
        "mark-for-nagging"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if cx.action == Action::DownloadVideo && !cx.send_succeeded {
            tracing::debug!("marking message for nagging");
            cx.should_nag_about_original_message = true;
        }
        Ok(())
    }
}

pub struct MarkForDeletionStage;

#[async_trait]
impl Stage for MarkForDeletionStage {
    fn name(&self) -> &'static str {
        "mark-for-deletion"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if cx.action == Action::DownloadVideo && cx.send_succeeded {
            cx.should_delete_original_message = true;
        }
        Ok(())
    }
}
