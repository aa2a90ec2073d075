//! Room platform interface
//!
//! The chat platform (room lookup, user presence, voice connections) is an
//! external collaborator. This module pins down the slice of it the playback
//! pipeline depends on, so the pipeline can be driven by the real client in
//! production and by fakes in tests.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::io::AsyncWrite;

/// Identifier of a voice room (the destination the audio stream is delivered to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a platform user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a text channel (where the request was issued)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

/// Where a playback request came from
///
/// Used for destination-room resolution (the requester's presence) and for
/// log correlation; the pipeline never writes to the channel itself.
#[derive(Debug, Clone, Copy)]
pub struct OriginContext {
    /// User who issued the request
    pub user: UserId,

    /// Text channel the request was issued in
    pub channel: ChannelId,
}

/// Encoding profile for the outbound audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioProfile {
    /// Optimized for music fidelity
    Music,
    /// Optimized for speech
    Voice,
    /// Optimized for latency
    LowDelay,
}

/// Outbound audio byte sink created on a live room connection
pub trait AudioSink: AsyncWrite + Send + Unpin {}

impl<T: AsyncWrite + Send + Unpin> AudioSink for T {}

/// A live connection to one room
#[async_trait]
pub trait RoomConnection: Send {
    /// Create the outbound audio stream for this connection
    fn create_output_stream(
        &mut self,
        profile: AudioProfile,
        bitrate: u32,
    ) -> Result<Box<dyn AudioSink>>;

    /// Stop the connection, releasing platform-side resources
    async fn stop(&mut self);
}

/// Read/connect access to the room platform
///
/// Implementations may take arbitrarily long in `connect`; callers bound
/// the wait themselves.
#[async_trait]
pub trait RoomPlatform: Send + Sync {
    /// Room the user is currently present in, if any
    async fn user_room(&self, user: UserId) -> Option<RoomId>;

    /// All rooms with at least one occupant, in guild order
    async fn occupied_rooms(&self) -> Vec<RoomId>;

    /// Number of users currently present in the room
    async fn occupant_count(&self, room: RoomId) -> usize;

    /// Human-readable room name for replies and logs
    async fn room_name(&self, room: RoomId) -> String;

    /// Establish a live connection to the room
    async fn connect(&self, room: RoomId) -> Result<Box<dyn RoomConnection>>;
}
