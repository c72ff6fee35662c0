//! clipbot — a multi-platform chat bot core that downloads, clips, and
//! shrinks videos on command.
//!
//! Messages arrive as normalized [`platform::InboundEvent`]s and run
//! through a fixed stage chain (see [`pipeline`]): classify the command,
//! keep a typing indicator alive, resolve an optional clip window,
//! acquire the video through a rotating proxy pool, then cut, normalize,
//! and shrink it under the delivery size budget before sending it back.
//! Platform adapters, the language collaborator, and the rates provider
//! all sit behind traits so the core stays platform-agnostic.

pub mod config;
pub mod error;
pub mod media;
pub mod nlu;
pub mod pipeline;
pub mod platform;
pub mod rates;

pub use config::Config;
pub use error::Error;
pub use pipeline::{Context, Dispatcher};
pub use platform::{InboundEvent, Platform, Service};
