//! Test helpers for roomcast integration tests
//!
//! Provides a fake room platform (presence, connections, in-memory audio
//! sinks) and a fake transcoder serving canned PCM, so the full pipeline
//! can be exercised without a chat platform or a decoder binary.

#![allow(dead_code)]

use async_trait::async_trait;
use roomcast::config::PlaybackConfig;
use roomcast::error::{Error, Result};
use roomcast::platform::{
    AudioProfile, AudioSink, ChannelId, OriginContext, RoomConnection, RoomId, RoomPlatform,
    UserId,
};
use roomcast::playback::{MediaSource, PlaybackService};
use roomcast::transcode::{TranscodeStream, Transcoder};
use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWrite;

/// Install a tracing subscriber honoring RUST_LOG, once per test binary
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomcast=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Shared record of everything the fake platform observed
#[derive(Default)]
pub struct ConnectionLog {
    /// Rooms successfully connected to, in order
    pub connects: Mutex<Vec<RoomId>>,
    /// Number of connections stopped
    pub stops: AtomicUsize,
    /// Number of output streams created
    pub streams_created: AtomicUsize,
    /// Every byte written to any output stream
    pub written: Mutex<Vec<u8>>,
}

impl ConnectionLog {
    pub fn connects(&self) -> Vec<RoomId> {
        self.connects.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

/// In-memory room platform
pub struct FakePlatform {
    presence: Mutex<HashMap<UserId, RoomId>>,
    /// (id, name, occupant count) in guild order
    rooms: Mutex<Vec<(RoomId, String, usize)>>,
    connect_delay: Mutex<Duration>,
    unreachable: AtomicBool,
    pub log: Arc<ConnectionLog>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            presence: Mutex::new(HashMap::new()),
            rooms: Mutex::new(Vec::new()),
            connect_delay: Mutex::new(Duration::ZERO),
            unreachable: AtomicBool::new(false),
            log: Arc::new(ConnectionLog::default()),
        })
    }

    pub fn add_room(&self, room: RoomId, name: &str, occupants: usize) {
        self.rooms.lock().unwrap().push((room, name.to_string(), occupants));
    }

    pub fn set_occupants(&self, room: RoomId, occupants: usize) {
        for entry in self.rooms.lock().unwrap().iter_mut() {
            if entry.0 == room {
                entry.2 = occupants;
            }
        }
    }

    pub fn place_user(&self, user: UserId, room: Option<RoomId>) {
        let mut presence = self.presence.lock().unwrap();
        match room {
            Some(room) => {
                presence.insert(user, room);
            }
            None => {
                presence.remove(&user);
            }
        }
    }

    /// Delay applied before a connection is established
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    /// When set, connect attempts hang until the caller gives up
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomPlatform for FakePlatform {
    async fn user_room(&self, user: UserId) -> Option<RoomId> {
        self.presence.lock().unwrap().get(&user).copied()
    }

    async fn occupied_rooms(&self) -> Vec<RoomId> {
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, occupants)| *occupants > 0)
            .map(|(room, _, _)| *room)
            .collect()
    }

    async fn occupant_count(&self, room: RoomId) -> usize {
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _, _)| *id == room)
            .map(|(_, _, occupants)| *occupants)
            .unwrap_or(0)
    }

    async fn room_name(&self, room: RoomId) -> String {
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _, _)| *id == room)
            .map(|(_, name, _)| name.clone())
            .unwrap_or_else(|| format!("room-{}", room))
    }

    async fn connect(&self, room: RoomId) -> Result<Box<dyn RoomConnection>> {
        if self.unreachable.load(Ordering::SeqCst) {
            // Longer than any bounded wait a caller would use
            tokio::time::sleep(Duration::from_secs(86_400)).await;
            return Err(Error::Connection("Unreachable room".to_string()));
        }

        let delay = *self.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.log.connects.lock().unwrap().push(room);
        Ok(Box::new(FakeConnection {
            room,
            log: Arc::clone(&self.log),
        }))
    }
}

pub struct FakeConnection {
    room: RoomId,
    log: Arc<ConnectionLog>,
}

#[async_trait]
impl RoomConnection for FakeConnection {
    fn create_output_stream(
        &mut self,
        _profile: AudioProfile,
        _bitrate: u32,
    ) -> Result<Box<dyn AudioSink>> {
        self.log.streams_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSink {
            log: Arc::clone(&self.log),
        }))
    }

    async fn stop(&mut self) {
        self.log.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sink appending every write to the shared log
pub struct FakeSink {
    log: Arc<ConnectionLog>,
}

impl AsyncWrite for FakeSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.log.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Transcoder serving a fixed PCM payload per start
pub struct FakeTranscoder {
    payload: Vec<u8>,
    fail: AtomicBool,
    /// Sources handed to `start`, in order
    pub starts: Mutex<Vec<String>>,
}

impl FakeTranscoder {
    pub fn new(payload: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            payload,
            fail: AtomicBool::new(false),
            starts: Mutex::new(Vec::new()),
        })
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn started_sources(&self) -> Vec<String> {
        self.starts.lock().unwrap().clone()
    }
}

impl Transcoder for FakeTranscoder {
    fn start(&self, source: &MediaSource) -> Result<TranscodeStream> {
        self.starts.lock().unwrap().push(source.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transcode("Fake decoder failure".to_string()));
        }
        Ok(TranscodeStream::from_reader(std::io::Cursor::new(
            self.payload.clone(),
        )))
    }
}

/// Media root with a handful of known files
pub fn media_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in ["alpha.mp3", "bravo.ogg", "charlie.wav"] {
        std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
    }
    dir
}

/// Service over the fakes with test-friendly timeouts
pub fn build_service(
    root: &Path,
    platform: Arc<FakePlatform>,
    transcoder: Arc<FakeTranscoder>,
    per_item_timeout_secs: u64,
    idle_timeout_secs: u64,
    default_room: Option<u64>,
) -> PlaybackService {
    let config = PlaybackConfig {
        root_folder: root.to_path_buf(),
        default_room,
        per_item_timeout_secs,
        idle_timeout_secs,
        ..PlaybackConfig::default()
    };
    PlaybackService::new(config, platform, transcoder).unwrap()
}

pub fn origin(user: u64) -> OriginContext {
    OriginContext {
        user: UserId(user),
        channel: ChannelId(900),
    }
}
