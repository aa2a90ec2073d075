//! Transcode adapter
//!
//! Wraps the external decoder process (ffmpeg) behind a [`Transcoder`]
//! trait so process-spawning mechanics stay isolated from queue and session
//! logic, and tests can substitute a fake that serves canned PCM.
//!
//! Output contract: 2-channel signed 16-bit little-endian PCM at 48 kHz on
//! the child's standard output. The caller is responsible for fully
//! draining the stream and then calling [`TranscodeStream::finish`] to reap
//! the process.

use crate::error::{Error, Result};
use crate::playback::request::MediaSource;
use std::ffi::OsString;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, Command};
use tracing::{debug, level_filters::LevelFilter};

/// Starts a decode job for one media source
pub trait Transcoder: Send + Sync {
    /// Spawn the decoder for `source` and expose its PCM output as a byte stream
    fn start(&self, source: &MediaSource) -> Result<TranscodeStream>;
}

/// Readable PCM byte stream backed by a decoder job
///
/// Reads delegate to the underlying reader; once the stream is drained,
/// `finish` reaps the child process and surfaces a non-zero exit status as
/// a transcode error. Dropping the stream kills a still-running child.
pub struct TranscodeStream {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    child: Option<Child>,
}

impl TranscodeStream {
    /// Stream backed by a spawned decoder process
    fn from_child(reader: Box<dyn AsyncRead + Send + Unpin>, child: Child) -> Self {
        Self {
            reader,
            child: Some(child),
        }
    }

    /// Stream backed by an in-memory reader (no process to reap)
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            child: None,
        }
    }

    /// Wait for the decoder job to complete after the stream is drained
    pub async fn finish(mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            let status = child
                .wait()
                .await
                .map_err(|e| Error::Transcode(format!("Failed to reap decoder: {}", e)))?;
            if !status.success() {
                return Err(Error::Transcode(format!(
                    "Decoder exited with {}",
                    status
                )));
            }
        }
        Ok(())
    }
}

impl AsyncRead for TranscodeStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

/// ffmpeg-backed transcoder
///
/// Invokes the decoder with a fixed argument template:
/// `-loglevel <level> -i <source> -ac 2 -f s16le -ar 48000 pipe:1`
pub struct FfmpegTranscoder {
    decoder_path: String,
}

impl FfmpegTranscoder {
    /// Create a transcoder spawning `decoder_path` (resolved via PATH when
    /// not absolute)
    pub fn new(decoder_path: impl Into<String>) -> Self {
        Self {
            decoder_path: decoder_path.into(),
        }
    }

    /// Map the process-wide log level to the decoder's verbosity flag
    fn loglevel() -> &'static str {
        let current = LevelFilter::current();
        if current >= LevelFilter::TRACE {
            "debug"
        } else if current >= LevelFilter::DEBUG {
            "verbose"
        } else if current >= LevelFilter::INFO {
            "info"
        } else if current >= LevelFilter::WARN {
            "warning"
        } else if current >= LevelFilter::ERROR {
            "error"
        } else {
            "quiet"
        }
    }

    /// Fixed argument template for one source
    ///
    /// Arguments are `OsString` so local paths pass through unmodified
    /// whether or not they are valid UTF-8.
    fn build_args(source: &MediaSource, loglevel: &str) -> Vec<OsString> {
        vec![
            OsString::from("-loglevel"),
            OsString::from(loglevel),
            OsString::from("-i"),
            source.decoder_input().to_os_string(),
            OsString::from("-ac"),
            OsString::from("2"),
            OsString::from("-f"),
            OsString::from("s16le"),
            OsString::from("-ar"),
            OsString::from("48000"),
            OsString::from("pipe:1"),
        ]
    }
}

impl Transcoder for FfmpegTranscoder {
    fn start(&self, source: &MediaSource) -> Result<TranscodeStream> {
        let args = Self::build_args(source, Self::loglevel());
        debug!(
            decoder = %self.decoder_path,
            source = %source,
            "Spawning decoder process"
        );

        let mut child = Command::new(&self.decoder_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Transcode(format!(
                    "Failed to start decoder '{}': {}",
                    self.decoder_path, e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Transcode("Decoder stdout was not captured".to_string()))?;

        Ok(TranscodeStream::from_child(Box::new(stdout), child))
    }
}
