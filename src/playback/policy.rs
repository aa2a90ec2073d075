//! Destination-room selection
//!
//! Picking where the audio goes is a policy decision, decoupled from queue
//! and session mechanics so it can be swapped or unit-tested without a live
//! platform client.

use crate::error::{Error, Result};
use crate::platform::{OriginContext, RoomId, RoomPlatform};
use async_trait::async_trait;
use tracing::debug;

/// Resolves the destination room for a playback request
#[async_trait]
pub trait RoomPolicy: Send + Sync {
    /// Pick the room to stream into, or fail with `NotFound`
    async fn resolve(
        &self,
        platform: &dyn RoomPlatform,
        origin: &OriginContext,
    ) -> Result<RoomId>;
}

/// Default policy: follow the requester, then fall back to company
///
/// Priority order:
/// 1. the room the requesting user is currently present in
/// 2. the configured default room, but only while it has occupants
/// 3. the first occupied room in the guild
#[derive(Debug, Clone)]
pub struct PresenceFirstPolicy {
    default_room: Option<RoomId>,
}

impl PresenceFirstPolicy {
    /// Create the policy with an optional configured default room
    pub fn new(default_room: Option<RoomId>) -> Self {
        Self { default_room }
    }
}

#[async_trait]
impl RoomPolicy for PresenceFirstPolicy {
    async fn resolve(
        &self,
        platform: &dyn RoomPlatform,
        origin: &OriginContext,
    ) -> Result<RoomId> {
        if let Some(room) = platform.user_room(origin.user).await {
            debug!(user = %origin.user, room = %room, "Destination from requester presence");
            return Ok(room);
        }

        if let Some(room) = self.default_room {
            if platform.occupant_count(room).await > 0 {
                debug!(room = %room, "Destination from occupied default room");
                return Ok(room);
            }
        }

        if let Some(room) = platform.occupied_rooms().await.into_iter().next() {
            debug!(room = %room, "Destination from first occupied room");
            return Ok(room);
        }

        Err(Error::NotFound("No destination room".to_string()))
    }
}
