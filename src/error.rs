//! Error types for roomcast
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Validation errors surface at intake before anything is
//! queued; every other variant is converted into a per-request outcome by
//! the playback worker and never escapes its loop.

use thiserror::Error;

/// Main error type for the playback pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Request rejected at intake (bad extension, missing file, path escapes root)
    #[error("Validation error: {0}")]
    Validation(String),

    /// No destination room could be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to establish the streaming session within the bounded wait
    #[error("Connection error: {0}")]
    Connection(String),

    /// Decoder process failed to start or exited abnormally
    #[error("Transcode error: {0}")]
    Transcode(String),

    /// Caller's wait budget was exhausted before playback started
    #[error("Timed out after {0} ms waiting for playback to start")]
    Timeout(u64),

    /// File or stream I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the roomcast Error
pub type Result<T> = std::result::Result<T, Error>;
