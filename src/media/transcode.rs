//! Transcode tool boundary and its ffmpeg implementation.
//!
//! Four fixed operations cover everything the postprocessing cascade
//! needs: clip trimming, H.264/AAC normalization, scaled-down x265
//! compression, and stream-copy byte truncation. A non-zero tool exit
//! is the uniform failure signal; no extra wall-clock timeouts are
//! imposed.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::TranscodeError;

/// Transcode operations consumed by the cascade.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Trim a clip. Positive `start_seconds` offsets from the
    /// beginning, negative from the end; zero `duration_seconds` runs
    /// to the end.
    async fn cut(
        &self,
        input: &Path,
        output: &Path,
        start_seconds: f64,
        duration_seconds: f64,
    ) -> Result<(), TranscodeError>;

    /// Re-encode to H.264/AAC optimized for progressive playback.
    async fn reencode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;

    /// Re-encode at `1/scale_divisor` linear scale with a higher
    /// compression ratio.
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        scale_divisor: u32,
    ) -> Result<(), TranscodeError>;

    /// Hard-truncate the stream at a byte budget without re-encoding.
    async fn truncate(
        &self,
        input: &Path,
        output: &Path,
        size_budget_mb: u64,
    ) -> Result<(), TranscodeError>;
}

/// `ffmpeg`-backed transcoder.
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    async fn run(op: &'static str, input: &Path, args: Vec<String>) -> Result<(), TranscodeError> {
        let status = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| TranscodeError::Io { op, source })?;

        if status.success() {
            Ok(())
        } else {
            Err(TranscodeError::ToolFailed {
                op,
                input: input.display().to_string(),
                status: status.to_string(),
            })
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn cut(
        &self,
        input: &Path,
        output: &Path,
        start_seconds: f64,
        duration_seconds: f64,
    ) -> Result<(), TranscodeError> {
        let mut args = Vec::new();
        if start_seconds > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{start_seconds:.4}"));
        } else if start_seconds < 0.0 {
            args.push("-sseof".to_string());
            args.push(format!("{start_seconds:.4}"));
        }
        args.push("-i".to_string());
        args.push(input.display().to_string());
        if duration_seconds > 0.0 {
            args.push("-t".to_string());
            args.push(format!("{duration_seconds:.4}"));
        }
        args.push(output.display().to_string());

        Self::run("cut", input, args).await
    }

    async fn reencode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let args = vec![
            "-i".to_string(),
            input.display().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-crf".to_string(),
            "23".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            // Move the moov atom up front so playback can start while
            // the file is still transferring.
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.display().to_string(),
        ];
        Self::run("reencode", input, args).await
    }

    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        scale_divisor: u32,
    ) -> Result<(), TranscodeError> {
        let args = vec![
            "-i".to_string(),
            input.display().to_string(),
            "-vf".to_string(),
            // trunc(..)*2 keeps both dimensions even, which x265 requires.
            format!("scale=trunc(iw/{scale_divisor})*2:trunc(ih/{scale_divisor})*2"),
            "-vcodec".to_string(),
            "libx265".to_string(),
            "-crf".to_string(),
            "28".to_string(),
            output.display().to_string(),
        ];
        Self::run("compress", input, args).await
    }

    async fn truncate(
        &self,
        input: &Path,
        output: &Path,
        size_budget_mb: u64,
    ) -> Result<(), TranscodeError> {
        let args = vec![
            "-i".to_string(),
            input.display().to_string(),
            "-fs".to_string(),
            format!("{size_budget_mb}M"),
            "-c".to_string(),
            "copy".to_string(),
            output.display().to_string(),
        ];
        Self::run("truncate", input, args).await
    }
}
