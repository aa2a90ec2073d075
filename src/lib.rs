//! roomcast - media playback pipeline for the community chat bot
//!
//! Accepts playback requests (local files under a configured media root, or
//! attachment URLs from trusted hosts), serializes them through a single
//! background worker against a live streaming session to a voice room,
//! transcodes each item via an external decoder process, and tears the
//! session down after an idle period.
//!
//! The chat platform itself (presence lookup, voice connections) is an
//! external collaborator behind the [`platform::RoomPlatform`] trait, and
//! the decoder process behind [`transcode::Transcoder`], so the pipeline is
//! fully testable without either.
//!
//! Entry point: build a [`PlaybackService`] and call
//! [`PlaybackService::enqueue_and_await`] from any number of caller tasks.

pub mod config;
pub mod error;
pub mod platform;
pub mod playback;
pub mod transcode;

pub use config::{PlaybackConfig, PlaybackSettings};
pub use error::{Error, Result};
pub use platform::{AudioProfile, ChannelId, OriginContext, RoomId, UserId};
pub use playback::{MediaSource, PlaybackService, Played, PresenceFirstPolicy, RoomPolicy};
pub use transcode::{FfmpegTranscoder, TranscodeStream, Transcoder};
