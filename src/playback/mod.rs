//! Playback pipeline
//!
//! Wires the request validator, queue, worker, and session manager into the
//! one operation other subsystems call: [`PlaybackService::enqueue_and_await`].

pub mod intake;
pub mod policy;
pub mod queue;
pub mod request;
pub mod session;
pub mod validate;
pub mod worker;

pub use policy::{PresenceFirstPolicy, RoomPolicy};
pub use request::{MediaSource, PlaybackRequest, Played};
pub use validate::RequestValidator;

use crate::config::{PlaybackConfig, PlaybackSettings};
use crate::error::Result;
use crate::platform::{OriginContext, RoomId, RoomPlatform};
use crate::transcode::Transcoder;
use queue::PlaybackQueue;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use worker::WorkerHandle;

/// Shared internals behind the service facade
///
/// The queue is the only structure written from multiple producer contexts;
/// the worker loop is its single consumer.
pub(crate) struct ServiceInner {
    pub(crate) validator: RequestValidator,
    pub(crate) platform: Arc<dyn RoomPlatform>,
    pub(crate) policy: Arc<dyn RoomPolicy>,
    pub(crate) transcoder: Arc<dyn Transcoder>,
    pub(crate) settings: Arc<PlaybackSettings>,
    pub(crate) connect_timeout: Duration,
    pub(crate) queue: PlaybackQueue,
    pub(crate) worker: WorkerHandle,
}

/// Media playback service
///
/// Cheap to clone and share; all clones drive the same queue and worker.
#[derive(Clone)]
pub struct PlaybackService {
    inner: Arc<ServiceInner>,
}

impl PlaybackService {
    /// Create the service with the default destination-room policy
    pub fn new(
        config: PlaybackConfig,
        platform: Arc<dyn RoomPlatform>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self> {
        let policy = Arc::new(PresenceFirstPolicy::new(config.default_room.map(RoomId)));
        Self::with_policy(config, platform, transcoder, policy)
    }

    /// Create the service with a custom destination-room policy
    pub fn with_policy(
        config: PlaybackConfig,
        platform: Arc<dyn RoomPlatform>,
        transcoder: Arc<dyn Transcoder>,
        policy: Arc<dyn RoomPolicy>,
    ) -> Result<Self> {
        let validator =
            RequestValidator::new(&config.root_folder, config.trusted_hosts.clone())?;
        let settings = Arc::new(PlaybackSettings::new(&config));

        info!(
            root = %validator.root().display(),
            per_item_timeout_secs = config.per_item_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            "Playback service created"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                validator,
                platform,
                policy,
                transcoder,
                settings,
                connect_timeout: Duration::from_secs(config.connect_timeout_secs),
                queue: PlaybackQueue::new(),
                worker: WorkerHandle::new(),
            }),
        })
    }

    /// Enqueue one source and wait for its terminal outcome
    ///
    /// Validation failures surface immediately, before anything is queued.
    /// The wait budget is `fixed overhead + per-item timeout × queue depth
    /// after this enqueue`; once playback of this request starts, the wait
    /// becomes unbounded. Starts the worker if it is not running.
    pub async fn enqueue_and_await(&self, raw: &str, origin: OriginContext) -> Result<Played> {
        let source = self.inner.validator.classify(raw)?;
        let (request, rx) = request::PlaybackRequest::new(source, origin);

        let depth = self.inner.queue.push(Arc::clone(&request));
        info!(
            request_id = %request.id,
            source = %request.source,
            user = %origin.user,
            depth,
            "Playback request queued"
        );
        self.inner.worker.ensure_running(&self.inner);

        let budget = intake::wait_budget(self.inner.settings.per_item_timeout(), depth);
        intake::await_result(request, rx, budget).await
    }

    /// Expand paths/directories into concrete file lists for bulk enqueueing
    pub fn expand_sources(&self, items: &[String]) -> Vec<String> {
        self.inner.validator.expand_sources(items)
    }

    /// Runtime-adjustable timeout settings
    pub fn settings(&self) -> Arc<PlaybackSettings> {
        Arc::clone(&self.inner.settings)
    }

    /// Whether the worker loop is currently running
    pub fn worker_running(&self) -> bool {
        self.inner.worker.is_running()
    }

    /// Number of requests waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Stop the worker and wait for it to drain its state
    ///
    /// Pending requests are dropped and the session is torn down; a later
    /// enqueue starts a fresh worker.
    pub async fn shutdown(&self) {
        self.inner.worker.request_shutdown();
        self.inner.worker.wait_idle().await;
    }
}
