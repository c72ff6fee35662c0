//! Postprocessing cascade: optional cut, normalization, and escalating
//! size reduction.
//!
//! The cascade turns an acquired source file into something deliverable:
//! trim the requested clip window, normalize the codec pairing, then —
//! only while the result stays over the size budget — escalate through
//! two scaled-down re-encodes and finally a stream-copy truncation.
//! Every acceptance decision reads the size of the step's own output;
//! earlier readings are never reused.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::TranscodeError;
use crate::media::transcode::Transcoder;
use crate::nlu::CutWindow;

/// Scale divisors for the two compression passes.
const FIRST_PASS_DIVISOR: u32 = 4;
const SECOND_PASS_DIVISOR: u32 = 8;

/// Runs the cut → normalize → size-reduction cascade.
pub struct Cascade {
    transcoder: Arc<dyn Transcoder>,
    max_size_mb: f64,
}

impl Cascade {
    pub fn new(transcoder: Arc<dyn Transcoder>, max_size_mb: f64) -> Self {
        Self {
            transcoder,
            max_size_mb,
        }
    }

    /// Run the cascade over `source`.
    ///
    /// Every intermediate file is appended to `scratch` for terminal
    /// cleanup. The returned path is the final candidate regardless of
    /// which step produced it. Any transcode failure is fatal for the
    /// message being processed.
    pub async fn run(
        &self,
        source: &Path,
        cut: Option<CutWindow>,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, TranscodeError> {
        let mut working = source.to_path_buf();

        if let Some(window) = cut {
            let clipped = sibling_scratch(&working);
            self.transcoder
                .cut(&working, &clipped, window.start_seconds, window.duration_seconds)
                .await?;
            scratch.push(clipped.clone());
            working = clipped;
        }

        if !file_exists(&working).await {
            tracing::debug!(path = %working.display(), "working file absent, skipping normalize");
            return Ok(working);
        }

        // Normalize unconditionally: sources often arrive as VP9/webm.
        let normalized = with_suffix(&working, "h264.mp4");
        self.transcoder.reencode(&working, &normalized).await?;
        scratch.push(normalized.clone());
        working = normalized;

        let size = file_size_mb(&working).await?;
        if size <= self.max_size_mb {
            return Ok(working);
        }
        tracing::debug!(size_mb = size, "over size budget, reducing");

        let reduced = with_suffix(&working, "q4.mp4");
        self.transcoder
            .compress(&working, &reduced, FIRST_PASS_DIVISOR)
            .await?;
        scratch.push(reduced.clone());
        let size = file_size_mb(&reduced).await?;
        if size <= self.max_size_mb {
            return Ok(reduced);
        }
        tracing::debug!(size_mb = size, "first compression pass still over budget");

        let tiny = with_suffix(&working, "q8.mp4");
        self.transcoder
            .compress(&working, &tiny, SECOND_PASS_DIVISOR)
            .await?;
        scratch.push(tiny.clone());
        let size = file_size_mb(&tiny).await?;
        if size <= self.max_size_mb {
            return Ok(tiny);
        }
        tracing::debug!(size_mb = size, "second compression pass still over budget, truncating");

        let truncated = with_suffix(&tiny, "trunc.mp4");
        self.transcoder
            .truncate(&tiny, &truncated, self.max_size_mb as u64)
            .await?;
        scratch.push(truncated.clone());
        Ok(truncated)
    }
}

/// A fresh scratch path next to `path`.
fn sibling_scratch(path: &Path) -> PathBuf {
    let name = format!("{}.mp4", uuid::Uuid::new_v4());
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Append a derivation suffix to a file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{suffix}", path.display()))
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn file_size_mb(path: &Path) -> Result<f64, TranscodeError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| TranscodeError::Io { op: "stat", source })?;
    Ok(meta.len() as f64 / (1024.0 * 1024.0))
}
