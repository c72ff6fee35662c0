//! The message-processing pipeline.
//!
//! Every inbound message runs through a fixed, ordered chain of stages
//! sharing one mutable [`Context`]. Control only ever moves forward; a
//! stage signals an unrecoverable problem by returning an error, which
//! stops the chain. Terminal cleanup runs after every message no matter
//! how far it got: the typing heartbeat is cancelled, scratch files are
//! deleted, and stale leftovers in the scratch directory are swept.

pub mod classify;
pub mod context;
pub mod cut_args;
pub mod deliver;
pub mod dice;
pub mod download;
pub mod marks;
pub mod postprocess;
pub mod rates;
pub mod respond;
pub mod typing;
pub mod url_extract;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::PipelineError;
use crate::media::{Acquirer, Cascade, MediaFetcher, Transcoder};
use crate::nlu::TextUnderstanding;
use crate::platform::{InboundEvent, Platform};
use crate::rates::RatesProvider;

pub use classify::ClassifyStage;
pub use context::{Action, Context};
pub use cut_args::CutArgsStage;
pub use deliver::{DeleteOriginalStage, ImageResponseStage, TextResponseStage, VideoResponseStage};
pub use dice::DiceStage;
pub use download::DownloadStage;
pub use marks::{MarkForDeletionStage, MarkForNaggingStage};
pub use postprocess::PostprocessStage;
pub use rates::RatesStage;
pub use respond::ConstructTextResponseStage;
pub use typing::TypingStage;
pub use url_extract::UrlExtractStage;

/// Scratch files untouched for this long are swept at terminal cleanup.
const STALE_SCRATCH_AGE: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// One step of the message-processing chain.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    /// Process the message. An error stops the chain; terminal cleanup
    /// still runs.
    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError>;
}

/// An ordered chain of stages plus guaranteed terminal cleanup.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    /// Directory swept for stale leftovers, if configured.
    scratch_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>, scratch_dir: Option<PathBuf>) -> Self {
        Self {
            stages,
            scratch_dir,
        }
    }

    /// Run every stage in order, then finalize.
    pub async fn process(&self, mut cx: Context) {
        for stage in &self.stages {
            tracing::debug!(stage = stage.name(), "running stage");
            if let Err(e) = stage.run(&mut cx).await {
                tracing::error!(stage = stage.name(), error = %e, "stage failed, aborting message");
                break;
            }
        }
        self.finalize(&mut cx).await;
    }

    /// Terminal cleanup. Idempotent and independent of how far the
    /// chain got.
    async fn finalize(&self, cx: &mut Context) {
        let had_heartbeat = cx.heartbeat.is_some();
        if let Some(token) = cx.heartbeat.take() {
            token.cancel();
        }

        for path in cx.scratch_files.drain(..) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "scratch file removal failed");
                }
            }
        }

        // Sweep only after real work; no-op messages should not pay the
        // directory scan.
        if had_heartbeat {
            if let Some(dir) = &self.scratch_dir {
                sweep_stale(dir).await;
            }
        }
    }
}

/// Delete files in `dir` untouched for longer than the stale age.
async fn sweep_stale(dir: &std::path::Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "scratch sweep skipped");
            return;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let stale = meta
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > STALE_SCRATCH_AGE);
        if stale {
            tracing::info!(path = %path.display(), "sweeping stale scratch file");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "stale sweep removal failed");
            }
        }
    }
}

/// Builds the full stage chain and hands inbound events to it.
pub struct Dispatcher {
    pipeline: Pipeline,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn MediaFetcher>,
        transcoder: Arc<dyn Transcoder>,
        nlu: Option<Arc<dyn TextUnderstanding>>,
        rates: Option<Arc<dyn RatesProvider>>,
    ) -> Self {
        let acquirer = Arc::new(Acquirer::new(
            fetcher,
            config.proxy_urls.clone(),
            config.media_tmp_dir.clone(),
            config.download_target_mb,
        ));
        let cascade = Arc::new(Cascade::new(transcoder, config.max_video_size_mb));

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ClassifyStage::new(config.enabled_actions.clone())),
            Box::new(UrlExtractStage),
            Box::new(TypingStage),
            Box::new(CutArgsStage::new(nlu.clone())),
            Box::new(DownloadStage::new(acquirer)),
            Box::new(PostprocessStage::new(
                cascade,
                config.postprocessed_actions.clone(),
            )),
            Box::new(RatesStage::new(rates)),
            Box::new(DiceStage::new(nlu)),
            Box::new(VideoResponseStage),
            Box::new(MarkForNaggingStage),
            Box::new(MarkForDeletionStage),
            Box::new(ConstructTextResponseStage),
            Box::new(ImageResponseStage),
            Box::new(DeleteOriginalStage),
            Box::new(TextResponseStage),
        ];

        Self {
            pipeline: Pipeline::new(stages, Some(config.media_tmp_dir.clone())),
        }
    }

    /// Process one inbound event to completion, cleanup included.
    pub async fn process(&self, event: InboundEvent, platform: Arc<dyn Platform>) {
        let cx = Context::new(event, platform);
        self.pipeline.process(cx).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::platform::{ConsolePlatform, Service};

    struct RecordingStage {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl Stage for RecordingStage {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _cx: &mut Context) -> Result<(), PipelineError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(PipelineError::Io(std::io::Error::other("boom")));
            }
            Ok(())
        }
    }

    struct SeedStage {
        scratch: PathBuf,
        token: CancellationToken,
    }

    #[async_trait]
    impl Stage for SeedStage {
        fn name(&self) -> &'static str {
            "seed"
        }

        async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
            cx.scratch_files.push(self.scratch.clone());
            cx.heartbeat = Some(self.token.clone());
            Ok(())
        }
    }

    fn context() -> Context {
        let event = InboundEvent {
            service: Service::Telegram,
            raw_text: String::new(),
            id: "1".to_string(),
            reply_to_id: None,
            chat_id: "c".to_string(),
        };
        Context::new(event, Arc::new(ConsolePlatform))
    }

    // ── A failing stage stops the chain but cleanup still runs ──

    #[tokio::test]
    async fn failure_stops_chain_and_cleanup_runs() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("scratch.mp4");
        std::fs::write(&scratch, b"data").unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let pipeline = Pipeline::new(
            vec![
                Box::new(SeedStage {
                    scratch: scratch.clone(),
                    token: token.clone(),
                }),
                Box::new(RecordingStage {
                    name: "fails",
                    log: Arc::clone(&log),
                    fail: true,
                }),
                Box::new(RecordingStage {
                    name: "never-runs",
                    log: Arc::clone(&log),
                    fail: false,
                }),
            ],
            None,
        );

        pipeline.process(context()).await;

        assert_eq!(*log.lock().unwrap(), vec!["fails"]);
        assert!(token.is_cancelled());
        assert!(!scratch.exists());
    }

    // ── All stages run in order on the happy path ──

    #[tokio::test]
    async fn stages_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(
            vec![
                Box::new(RecordingStage {
                    name: "first",
                    log: Arc::clone(&log),
                    fail: false,
                }),
                Box::new(RecordingStage {
                    name: "second",
                    log: Arc::clone(&log),
                    fail: false,
                }),
            ],
            None,
        );

        pipeline.process(context()).await;
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    // ── Finalize without heartbeat leaves the scratch dir alone ──

    #[tokio::test]
    async fn no_heartbeat_skips_stale_sweep() {
        let dir = TempDir::new().unwrap();
        let old_file = dir.path().join("old.mp4");
        std::fs::write(&old_file, b"data").unwrap();
        // Even an ancient file survives when the message did no work;
        // absent mtime manipulation this just checks the file stays.
        let pipeline = Pipeline::new(Vec::new(), Some(dir.path().to_path_buf()));

        pipeline.process(context()).await;
        assert!(old_file.exists());
    }

    // ── Fresh files survive the sweep after real work ──

    #[tokio::test]
    async fn sweep_keeps_fresh_files() {
        let dir = TempDir::new().unwrap();
        let fresh = dir.path().join("fresh.mp4");
        std::fs::write(&fresh, b"data").unwrap();

        let token = CancellationToken::new();
        let pipeline = Pipeline::new(
            vec![Box::new(SeedStage {
                scratch: dir.path().join("scratch.mp4"),
                token,
            })],
            Some(dir.path().to_path_buf()),
        );

        pipeline.process(context()).await;
        assert!(fresh.exists());
    }
}
