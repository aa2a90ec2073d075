//! Playback pipeline configuration
//!
//! Two layers, mirroring how the rest of the bot consumes its settings:
//!
//! - [`PlaybackConfig`]: startup configuration loaded from a TOML file (or
//!   built from defaults), fixed for the lifetime of the service.
//! - [`PlaybackSettings`]: the two timeout constants other subsystems may
//!   adjust at runtime. Read-frequently, write-rarely, so they are plain
//!   atomics behind a shared handle rather than a lock.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Startup configuration for the playback service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Root folder containing local media files; every local request must
    /// resolve inside it
    pub root_folder: PathBuf,

    /// Room to fall back to when the requester is not in any room
    /// (only used while it has other occupants)
    pub default_room: Option<u64>,

    /// Attachment hosts whose URLs are accepted as remote sources
    pub trusted_hosts: Vec<String>,

    /// Per-item wait timeout in seconds (scales the caller's wait budget)
    pub per_item_timeout_secs: u64,

    /// Seconds of empty queue before the session is torn down
    pub idle_timeout_secs: u64,

    /// Bounded wait for establishing a room connection, in seconds
    pub connect_timeout_secs: u64,

    /// Decoder binary to spawn (resolved via PATH when not absolute)
    pub decoder_path: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            root_folder: PathBuf::from("media"),
            default_room: None,
            trusted_hosts: vec!["cdn.discordapp.com".to_string()],
            per_item_timeout_secs: 60,
            idle_timeout_secs: 300,
            connect_timeout_secs: 8,
            decoder_path: "ffmpeg".to_string(),
        }
    }
}

impl PlaybackConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

/// Runtime-adjustable playback settings
///
/// Shared between the intake bridge (per-item timeout) and the worker loop
/// (idle timeout). Writers are rare (operator commands); readers hit these
/// on every enqueue and every tick.
#[derive(Debug)]
pub struct PlaybackSettings {
    per_item_timeout_secs: AtomicU64,
    idle_timeout_secs: AtomicU64,
}

impl PlaybackSettings {
    /// Create settings seeded from startup configuration
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            per_item_timeout_secs: AtomicU64::new(config.per_item_timeout_secs),
            idle_timeout_secs: AtomicU64::new(config.idle_timeout_secs),
        }
    }

    /// Current per-item wait timeout
    pub fn per_item_timeout(&self) -> Duration {
        Duration::from_secs(self.per_item_timeout_secs.load(Ordering::Relaxed))
    }

    /// Adjust the per-item wait timeout; affects the next enqueue
    pub fn set_per_item_timeout_secs(&self, secs: u64) {
        self.per_item_timeout_secs.store(secs, Ordering::Relaxed);
    }

    /// Current idle-exit timeout
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.load(Ordering::Relaxed))
    }

    /// Adjust the idle-exit timeout; picked up when the countdown next resets
    pub fn set_idle_timeout_secs(&self, secs: u64) {
        self.idle_timeout_secs.store(secs, Ordering::Relaxed);
    }
}
