//! Session manager and playback execution
//!
//! Owns the live connection to the destination room and the outbound audio
//! stream. The session is created lazily on first use, replaced when the
//! destination room changes, and torn down on idle timeout, shutdown, or
//! defensively after any playback failure so the next item gets a clean
//! reconnect instead of possibly-corrupt state.
//!
//! Owned exclusively by the worker loop; never touched from caller contexts.

use crate::error::{Error, Result};
use crate::platform::{AudioProfile, AudioSink, RoomConnection, RoomId, RoomPlatform};
use crate::playback::policy::RoomPolicy;
use crate::playback::request::{PlaybackRequest, Played};
use crate::transcode::Transcoder;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Fixed encoding profile for the outbound stream
const STREAM_PROFILE: AudioProfile = AudioProfile::Music;

/// Fixed outbound stream bitrate in bits per second
const STREAM_BITRATE: u32 = 96_000;

/// Live connection + outbound stream pair bound to one room
struct ActiveSession {
    room: RoomId,
    connection: Box<dyn RoomConnection>,
    stream: Option<Box<dyn AudioSink>>,
}

/// Manages the streaming session and executes playback of single items
pub struct SessionManager {
    platform: Arc<dyn RoomPlatform>,
    policy: Arc<dyn RoomPolicy>,
    transcoder: Arc<dyn Transcoder>,
    connect_timeout: Duration,
    session: Option<ActiveSession>,
}

impl SessionManager {
    /// Create a session manager with no live session
    pub fn new(
        platform: Arc<dyn RoomPlatform>,
        policy: Arc<dyn RoomPolicy>,
        transcoder: Arc<dyn Transcoder>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            policy,
            transcoder,
            connect_timeout,
            session: None,
        }
    }

    /// Whether a live session currently exists
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Room of the live session, if any
    pub fn current_room(&self) -> Option<RoomId> {
        self.session.as_ref().map(|s| s.room)
    }

    /// Play one validated request to completion
    ///
    /// Resolves the destination, (re)connects as needed, transcodes the
    /// source, and drains it into the outbound stream. Any failure tears
    /// the session down before being returned; nothing propagates as a
    /// panic out of the worker tick.
    pub async fn play(&mut self, request: &PlaybackRequest) -> Result<Played> {
        match self.resolve_and_play(request).await {
            Ok(played) => Ok(played),
            Err(e) => {
                warn!(
                    request_id = %request.id,
                    error = %e,
                    "Playback failed, tearing session down"
                );
                self.teardown().await;
                Err(e)
            }
        }
    }

    /// Every failure mode, destination resolution included, flows through
    /// the teardown arm of [`play`]
    async fn resolve_and_play(&mut self, request: &PlaybackRequest) -> Result<Played> {
        let room = self
            .policy
            .resolve(self.platform.as_ref(), &request.origin)
            .await?;
        self.play_in(room, request).await
    }

    async fn play_in(&mut self, room: RoomId, request: &PlaybackRequest) -> Result<Played> {
        self.ensure_connected(room).await?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::Internal("Session missing after connect".to_string()))?;

        // Outbound stream is created lazily, once per connection
        if session.stream.is_none() {
            let stream = session
                .connection
                .create_output_stream(STREAM_PROFILE, STREAM_BITRATE)?;
            session.stream = Some(stream);
        }
        let stream = session
            .stream
            .as_mut()
            .ok_or_else(|| Error::Internal("Outbound stream missing".to_string()))?;

        let mut pcm = self.transcoder.start(&request.source)?;
        let bytes = tokio::io::copy(&mut pcm, stream).await?;
        stream.flush().await?;
        pcm.finish().await?;

        let room_name = self.platform.room_name(room).await;
        info!(
            request_id = %request.id,
            room = %room_name,
            bytes,
            "Playback finished"
        );

        Ok(Played {
            room,
            room_name,
            source: request.source.clone(),
        })
    }

    /// Connect to `room`, replacing any session bound to a different room
    async fn ensure_connected(&mut self, room: RoomId) -> Result<()> {
        if matches!(&self.session, Some(s) if s.room == room) {
            return Ok(());
        }

        // Dispose the old stream and connection before switching rooms
        self.teardown().await;

        debug!(room = %room, "Connecting to room");
        let connection = timeout(self.connect_timeout, self.platform.connect(room))
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "Timed out connecting to room {} after {} ms",
                    room,
                    self.connect_timeout.as_millis()
                ))
            })??;

        self.session = Some(ActiveSession {
            room,
            connection,
            stream: None,
        });
        Ok(())
    }

    /// Release the outbound stream and stop the connection, best effort
    pub async fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!(room = %session.room, "Tearing down session");
            session.stream.take();
            session.connection.stop().await;
        }
    }
}
