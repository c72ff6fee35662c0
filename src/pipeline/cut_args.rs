//! Cut-argument resolver stage.
//!
//! For download commands, whatever text remains after stripping the URL
//! may describe a clip window ("1m33s-", "last 20s"). Resolution goes
//! through the text-understanding collaborator on a detached task; the
//! result arrives on a single-shot channel that the postprocessing
//! stage consumes. Resolution failure degrades to "no cut requested"
//! and never fails the message.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::PipelineError;
use crate::nlu::TextUnderstanding;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;

/// Leftover text at or under this length cannot describe a window.
const MIN_CUT_TEXT_LEN: usize = 2;

/// Resolves an optional clip window from the residual text.
pub struct CutArgsStage {
    nlu: Option<Arc<dyn TextUnderstanding>>,
}

impl CutArgsStage {
    pub fn new(nlu: Option<Arc<dyn TextUnderstanding>>) -> Self {
        Self { nlu }
    }
}

#[async_trait]
impl Stage for CutArgsStage {
    fn name(&self) -> &'static str {
        "cut-args"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        let (tx, rx) = oneshot::channel();
        cx.cut_window = Some(rx);

        let leftover = if cx.url.is_empty() {
            cx.parsed_text.clone()
        } else {
            cx.parsed_text.replacen(&cx.url, "", 1)
        };
        let leftover = leftover.trim().to_string();

        if cx.action == Action::DownloadVideo && leftover.len() > MIN_CUT_TEXT_LEN {
            match &self.nlu {
                Some(nlu) => {
                    let nlu = Arc::clone(nlu);
                    tokio::spawn(async move {
                        let window = match nlu.resolve_cut_window(&leftover).await {
                            Ok(window) => Some(window),
                            Err(e) => {
                                tracing::warn!(error = %e, "cut-window resolution failed, proceeding uncut");
                                None
                            }
                        };
                        let _ = tx.send(window);
                    });
                }
                None => {
                    tracing::debug!("no text-understanding collaborator, proceeding uncut");
                    let _ = tx.send(None);
                }
            }
        } else {
            let _ = tx.send(None);
        }

        Ok(())
    }
}
