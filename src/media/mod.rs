//! Media acquisition and postprocessing.

pub mod acquire;
pub mod cascade;
pub mod transcode;

pub use acquire::{Acquirer, MediaFetcher, ProxyRing, YtDlpFetcher};
pub use cascade::Cascade;
pub use transcode::{FfmpegTranscoder, Transcoder};
