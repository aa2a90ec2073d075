//! Playback request model
//!
//! A request is created at intake, shared between the awaiting caller and
//! the worker loop, and carries its own completion channel: the sender half
//! lives on the request and is consumed exactly once, the receiver half is
//! held by the caller. A request that is cancelled before the worker
//! reaches it is dropped without ever being completed.

use crate::error::Result;
use crate::platform::{OriginContext, RoomId};
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Classified media source produced by the request validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// File under the configured media root (absolute, validated)
    Local(PathBuf),

    /// Trusted attachment URL (https re-prefixed)
    Remote(String),
}

impl MediaSource {
    /// The argument handed to the decoder process
    ///
    /// Returned as an `OsStr` so local paths survive intact even when they
    /// are not valid UTF-8.
    pub fn decoder_input(&self) -> &OsStr {
        match self {
            MediaSource::Local(path) => path.as_os_str(),
            MediaSource::Remote(url) => OsStr::new(url),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Local(path) => write!(f, "{}", path.display()),
            MediaSource::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Successful playback outcome
#[derive(Debug, Clone)]
pub struct Played {
    /// Room the audio was delivered to
    pub room: RoomId,

    /// Room name at playback time, for reply messages
    pub room_name: String,

    /// Source that was played
    pub source: MediaSource,
}

/// Terminal outcome delivered to the awaiting caller
pub type PlaybackResult = Result<Played>;

/// Receiver half of a request's completion channel
pub type ResultReceiver = oneshot::Receiver<PlaybackResult>;

/// One queued playback item
///
/// Flags and completion are written by the worker loop; the cancellation
/// flag may additionally be raised by the intake bridge on timeout, which
/// is why both flags are single atomic booleans.
pub struct PlaybackRequest {
    /// Unique id for log correlation
    pub id: Uuid,

    /// What to play
    pub source: MediaSource,

    /// Who asked, and where
    pub origin: OriginContext,

    /// Cooperative cancellation flag, checked at dequeue time only
    cancelled: AtomicBool,

    /// Set while playback execution is in flight; the intake bridge stops
    /// charging its wait budget once this is raised
    started: AtomicBool,

    /// Single-use completion slot
    completion: Mutex<Option<oneshot::Sender<PlaybackResult>>>,
}

impl PlaybackRequest {
    /// Create a request and the receiver its caller will await
    pub fn new(source: MediaSource, origin: OriginContext) -> (Arc<Self>, ResultReceiver) {
        let (tx, rx) = oneshot::channel();
        let request = Arc::new(Self {
            id: Uuid::new_v4(),
            source,
            origin,
            cancelled: AtomicBool::new(false),
            started: AtomicBool::new(false),
            completion: Mutex::new(Some(tx)),
        });
        (request, rx)
    }

    /// Raise the cooperative cancellation flag
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the request has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Mark playback execution as begun
    pub fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Whether playback execution has begun
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Deliver the terminal outcome and clear the started flag
    ///
    /// The completion slot is written at most once; later calls are no-ops.
    /// A send failure means the caller already gave up, which is fine.
    pub fn complete(&self, result: PlaybackResult) {
        let sender = self.completion.lock().unwrap().take();
        if let Some(tx) = sender {
            let _ = tx.send(result);
        }
        self.started.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for PlaybackRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackRequest")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("cancelled", &self.is_cancelled())
            .field("started", &self.has_started())
            .finish()
    }
}
