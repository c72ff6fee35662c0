//! Startup-time configuration snapshot.
//!
//! Configuration is read from the environment exactly once, at startup,
//! into an explicit [`Config`] struct that the rest of the bot borrows.
//! Nothing re-reads the environment mid-pipeline.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::pipeline::context::Action;

/// Default scratch directory for downloaded and transcoded files.
const DEFAULT_TMP_DIR: &str = "/tmp/clipbot";

/// Immutable configuration snapshot shared across the bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Actions the classifier will accept. Authoritative: anything not
    /// in this set is treated as an unrecognized token.
    pub enabled_actions: HashSet<Action>,
    /// Actions whose acquired media runs through the postprocessing
    /// cascade. `SearchVideo` bypasses it unless opted in here.
    pub postprocessed_actions: HashSet<Action>,
    /// Ordered proxy endpoints for download retries.
    pub proxy_urls: Vec<String>,
    /// Scratch directory for downloaded and transcoded files.
    pub media_tmp_dir: PathBuf,
    /// Upper bound for delivered video files, in megabytes.
    pub max_video_size_mb: f64,
    /// Preferred download size passed to the fetch tool, in megabytes.
    pub download_target_mb: u64,
    /// API key for the text-understanding collaborator. When absent,
    /// cut-window resolution and negation degrade gracefully.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint.
    pub openai_base_url: String,
    /// Model identifier for text-understanding requests.
    pub openai_model: String,
}

impl Config {
    /// Load the configuration snapshot from the environment.
    ///
    /// `ENABLED_ACTIONS` and `POSTPROCESSED_ACTIONS` are `;`-separated
    /// action tokens; an unset `ENABLED_ACTIONS` enables everything.
    /// `PROXY_URLS` is a `;`-separated endpoint list.
    pub fn from_env() -> Result<Self, ConfigError> {
        let enabled_actions = match env::var("ENABLED_ACTIONS") {
            Ok(raw) => parse_actions(&raw)?,
            Err(_) => Action::all().collect(),
        };

        let postprocessed_actions = match env::var("POSTPROCESSED_ACTIONS") {
            Ok(raw) => parse_actions(&raw)?,
            Err(_) => HashSet::from([Action::DownloadVideo]),
        };

        let proxy_urls = env::var("PROXY_URLS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        let media_tmp_dir = env::var("MEDIA_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TMP_DIR));

        let max_video_size_mb = parse_number(env::var("MAX_VIDEO_MB").ok(), "MAX_VIDEO_MB", 10.0)?;
        let download_target_mb =
            parse_number(env::var("DOWNLOAD_TARGET_MB").ok(), "DOWNLOAD_TARGET_MB", 5.0)? as u64;

        Ok(Self {
            enabled_actions,
            postprocessed_actions,
            proxy_urls,
            media_tmp_dir,
            max_video_size_mb,
            download_target_mb,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
        })
    }

    /// Create the scratch directory if it does not exist yet.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.media_tmp_dir)?;
        Ok(())
    }
}

/// Parse a `;`-separated list of action tokens into a set.
fn parse_actions(raw: &str) -> Result<HashSet<Action>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            Action::from_token(token).ok_or_else(|| ConfigError::UnknownAction(token.to_string()))
        })
        .collect()
}

/// Parse a `;`-separated list, dropping empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(raw: Option<String>, key: &str, default: f64) -> Result<f64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a number, got {value:?}"),
        }),
    }
}
