//! Source media acquisition with proxy-rotating retries.
//!
//! A download is attempted directly first, then once through each
//! configured proxy in round-robin order, stopping at the first
//! success. The rotation cursor is shared across concurrent messages
//! and advances under a lock.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::FetchError;

/// One fetch attempt against the underlying download tool.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `reference` into `out`, preferring streams under
    /// `target_size_mb`, optionally through a proxy.
    async fn fetch(
        &self,
        reference: &str,
        out: &Path,
        target_size_mb: u64,
        proxy: Option<&str>,
    ) -> Result<(), FetchError>;
}

/// Round-robin proxy rotation shared across messages.
///
/// The cursor persists between calls, so a full failed cycle leaves it
/// exactly where it started.
pub struct ProxyRing {
    proxies: Vec<String>,
    cursor: Mutex<usize>,
}

impl ProxyRing {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            cursor: Mutex::new(0),
        }
    }

    /// Number of configured proxies.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take the next proxy and advance the cursor.
    pub fn next(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let proxy = self.proxies[*cursor].clone();
        *cursor = (*cursor + 1) % self.proxies.len();
        Some(proxy)
    }
}

/// Downloads source media, retrying through the proxy ring.
pub struct Acquirer {
    fetcher: Arc<dyn MediaFetcher>,
    proxies: ProxyRing,
    tmp_dir: PathBuf,
    target_size_mb: u64,
}

impl Acquirer {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        proxies: Vec<String>,
        tmp_dir: PathBuf,
        target_size_mb: u64,
    ) -> Self {
        Self {
            fetcher,
            proxies: ProxyRing::new(proxies),
            tmp_dir,
            target_size_mb,
        }
    }

    /// Acquire `reference` into a fresh scratch file.
    ///
    /// Returns `None` only after the direct attempt and one full proxy
    /// cycle have all failed.
    pub async fn acquire(&self, reference: &str) -> Option<PathBuf> {
        let out = self.tmp_dir.join(format!("{}.mp4", Uuid::new_v4()));

        tracing::info!(reference, "downloading with no proxy");
        match self
            .fetcher
            .fetch(reference, &out, self.target_size_mb, None)
            .await
        {
            Ok(()) => return Some(out),
            Err(e) => tracing::debug!(error = %e, "direct download failed"),
        }

        for _ in 0..self.proxies.len() {
            let Some(proxy) = self.proxies.next() else {
                break;
            };
            tracing::info!(proxy = %proxy, "retrying download through proxy");
            match self
                .fetcher
                .fetch(reference, &out, self.target_size_mb, Some(&proxy))
                .await
            {
                Ok(()) => return Some(out),
                Err(e) => tracing::debug!(proxy = %proxy, error = %e, "proxied download failed"),
            }
        }

        tracing::warn!(reference, "download failed after exhausting proxies");
        None
    }
}

/// `yt-dlp`-backed fetcher.
///
/// Prefers h264/mp4 streams under the target size at 720p or less and
/// recodes the result to mp4. A hard 500 MB cap guards against format
/// selection going wrong.
pub struct YtDlpFetcher;

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        reference: &str,
        out: &Path,
        target_size_mb: u64,
        proxy: Option<&str>,
    ) -> Result<(), FetchError> {
        let format = format!(
            "((bv*[filesize<={mb}M]/bv*)[height<=720]/(wv*[filesize<={mb}M]/wv*)) + ba / \
             (b[filesize<={mb}M]/b)[height<=720]/(w[filesize<={mb}M]/w)",
            mb = target_size_mb
        );

        let mut cmd = Command::new("yt-dlp");
        if let Some(proxy) = proxy {
            cmd.arg("--proxy").arg(proxy);
        }
        cmd.arg("-f")
            .arg(&format)
            .arg("-S")
            .arg("codec:h264")
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("--recode-video")
            .arg("mp4")
            .arg("--max-filesize")
            .arg("500M")
            .arg("-o")
            .arg(out)
            .arg(reference)
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let status = cmd.status().await?;
        if status.success() {
            Ok(())
        } else {
            Err(FetchError::ToolFailed {
                reference: reference.to_string(),
                status: status.to_string(),
            })
        }
    }
}
