//! Intake/await bridge
//!
//! Couples a caller to its queued request through a bounded wait. The wait
//! budget scales with queue depth so a request never times out merely
//! because others are ahead of it, and the budget is only charged while the
//! request has not started playing: once playback begins, the wait is
//! unbounded until a result arrives, so long files are never killed by the
//! intake timeout.

use crate::error::Error;
use crate::playback::request::{PlaybackRequest, PlaybackResult, ResultReceiver};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Flat overhead added to every wait budget
pub(crate) const FIXED_OVERHEAD: Duration = Duration::from_millis(1000);

/// Slice length for charging the budget between receiver polls
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wait budget for a request that landed at `depth_after_enqueue` in the queue
pub(crate) fn wait_budget(per_item_timeout: Duration, depth_after_enqueue: usize) -> Duration {
    FIXED_OVERHEAD + per_item_timeout * depth_after_enqueue.max(1) as u32
}

/// Await the request's outcome within `budget`
///
/// On budget exhaustion the cooperative cancellation flag is raised and a
/// timeout failure returned; the worker will silently drop the request when
/// it reaches it. Channel failures are captured as internal errors; this
/// call never panics past its boundary.
pub(crate) async fn await_result(
    request: Arc<PlaybackRequest>,
    mut rx: ResultReceiver,
    budget: Duration,
) -> PlaybackResult {
    let total = budget;
    let mut remaining = budget;
    loop {
        match timeout(POLL_INTERVAL, &mut rx).await {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(_)) => {
                return Err(Error::Internal(
                    "Playback worker dropped the request".to_string(),
                ));
            }
            Err(_) => {
                if !request.has_started() {
                    remaining = remaining.saturating_sub(POLL_INTERVAL);
                    if remaining.is_zero() {
                        debug!(
                            request_id = %request.id,
                            budget_ms = total.as_millis() as u64,
                            "Wait budget exhausted, cancelling queued request"
                        );
                        request.cancel();
                        return Err(Error::Timeout(total.as_millis() as u64));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ChannelId, OriginContext, UserId};
    use crate::playback::request::MediaSource;

    #[test]
    fn test_wait_budget_scales_with_queue_depth() {
        let per_item = Duration::from_secs(60);
        // 2 items already queued before this one => depth 3 after enqueue
        assert_eq!(wait_budget(per_item, 3), Duration::from_millis(181_000));
    }

    #[test]
    fn test_wait_budget_floor_of_one_item() {
        let per_item = Duration::from_secs(60);
        // Even an empty queue charges at least one per-item slot
        assert_eq!(wait_budget(per_item, 0), wait_budget(per_item, 1));
        assert_eq!(wait_budget(per_item, 1), Duration::from_millis(61_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_cancels_request() {
        let (request, rx) = PlaybackRequest::new(
            MediaSource::Remote("https://cdn.discordapp.com/a.mp3".to_string()),
            OriginContext {
                user: UserId(1),
                channel: ChannelId(2),
            },
        );

        let outcome = await_result(Arc::clone(&request), rx, Duration::from_secs(2)).await;
        assert!(matches!(outcome, Err(Error::Timeout(_))));
        assert!(request.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_request_waits_past_budget() {
        let (request, rx) = PlaybackRequest::new(
            MediaSource::Remote("https://cdn.discordapp.com/a.mp3".to_string()),
            OriginContext {
                user: UserId(1),
                channel: ChannelId(2),
            },
        );
        request.mark_started();

        let waiter = tokio::spawn(await_result(
            Arc::clone(&request),
            rx,
            Duration::from_secs(1),
        ));

        // Far past the budget, then complete; the waiter must still get the
        // outcome because started requests are never charged
        tokio::time::sleep(Duration::from_secs(30)).await;
        request.complete(Err(Error::Transcode("decoder died".to_string())));

        let outcome = waiter.await.unwrap();
        assert!(matches!(outcome, Err(Error::Transcode(_))));
        assert!(!request.is_cancelled());
    }
}
