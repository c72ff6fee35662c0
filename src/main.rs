//! Console runner.
//!
//! Reads messages from stdin, feeds them through the pipeline, and
//! prints outbound traffic to stdout. Useful for exercising the full
//! chain locally without a live platform adapter.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use clipbot::media::{FfmpegTranscoder, YtDlpFetcher};
use clipbot::nlu::{OpenAiClient, TextUnderstanding};
use clipbot::platform::ConsolePlatform;
use clipbot::{Config, Dispatcher, InboundEvent, Platform, Service};

#[derive(Debug, Parser)]
#[command(name = "clipbot", about = "Video-clipping chat bot, console edition")]
struct Cli {
    /// Chat ID to attribute console messages to.
    #[arg(long, default_value = "console")]
    chat_id: String,

    /// Log filter, e.g. "clipbot=debug".
    #[arg(long, env = "RUST_LOG", default_value = "clipbot=info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .init();

    let config = Config::from_env().context("loading configuration")?;
    config.ensure_dirs().context("creating scratch directory")?;

    let nlu: Option<Arc<dyn TextUnderstanding>> = config.openai_api_key.as_ref().map(|key| {
        Arc::new(OpenAiClient::new(
            config.openai_base_url.clone(),
            key.clone(),
            config.openai_model.clone(),
        )) as Arc<dyn TextUnderstanding>
    });
    if nlu.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; clip windows and negation are disabled");
    }

    let dispatcher = Dispatcher::new(
        &config,
        Arc::new(YtDlpFetcher),
        Arc::new(FfmpegTranscoder),
        nlu,
        None,
    );
    let platform: Arc<dyn Platform> = Arc::new(ConsolePlatform);

    tracing::info!("ready; type a message, Ctrl-D to exit");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut next_id: u64 = 1;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let event = InboundEvent {
            service: Service::Telegram,
            raw_text: line,
            id: next_id.to_string(),
            reply_to_id: None,
            chat_id: cli.chat_id.clone(),
        };
        next_id += 1;
        dispatcher.process(event, Arc::clone(&platform)).await;
    }

    Ok(())
}
