//! Playback worker
//!
//! A single background loop drains the queue one request per tick, drives
//! the session manager, and applies the idle-exit policy. Lifecycle is an
//! explicit state machine behind one mutex: enqueue auto-starts an idle
//! worker, shutdown cancels the running loop, and the loop resets itself to
//! idle on exit so a later enqueue can restart it. At most one loop runs at
//! a time.

use crate::playback::session::SessionManager;
use crate::playback::ServiceInner;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Worker tick length
pub(crate) const TICK: Duration = Duration::from_secs(1);

/// Worker lifecycle state
enum WorkerState {
    /// No loop running; the next enqueue starts one
    Idle,

    /// Loop running, cancellable through its shutdown token
    Running { shutdown: CancellationToken },
}

/// Guarded lifecycle handle for the playback worker
pub(crate) struct WorkerHandle {
    state: Mutex<WorkerState>,
}

impl WorkerHandle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WorkerState::Idle),
        }
    }

    /// Whether a worker loop currently owns the queue
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock().unwrap(), WorkerState::Running { .. })
    }

    /// Start the worker loop unless one is already running
    ///
    /// Start and shutdown contend on the same lock, so two concurrent
    /// enqueues cannot spawn two loops.
    pub fn ensure_running(&self, inner: &Arc<ServiceInner>) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, WorkerState::Running { .. }) {
            return;
        }

        let shutdown = CancellationToken::new();
        *state = WorkerState::Running {
            shutdown: shutdown.clone(),
        };
        tokio::spawn(run_loop(Arc::clone(inner), shutdown));
        debug!("Playback worker started");
    }

    /// Signal the running loop to stop, if any
    pub fn request_shutdown(&self) {
        if let WorkerState::Running { shutdown } = &*self.state.lock().unwrap() {
            shutdown.cancel();
        }
    }

    /// Wait until the loop has fully exited and reset itself
    pub async fn wait_idle(&self) {
        while self.is_running() {
            sleep(Duration::from_millis(10)).await;
        }
    }

    fn reset_to_idle(&self) {
        *self.state.lock().unwrap() = WorkerState::Idle;
    }
}

/// The worker loop: one request per tick, idle countdown, clean shutdown
async fn run_loop(inner: Arc<ServiceInner>, shutdown: CancellationToken) {
    let mut session = SessionManager::new(
        Arc::clone(&inner.platform),
        Arc::clone(&inner.policy),
        Arc::clone(&inner.transcoder),
        inner.connect_timeout,
    );

    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut idle_remaining = inner.settings.idle_timeout();

    loop {
        // A cancelled sleep is normal shutdown, not an error. The biased
        // order makes cancellation win over a simultaneously ready tick,
        // so no further item is dequeued once shutdown has been requested.
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match inner.queue.pop() {
            Some(request) => {
                idle_remaining = inner.settings.idle_timeout();

                // Cancelled while queued: drop without any side effect.
                // The caller timed out long ago; no result is ever written.
                if request.is_cancelled() {
                    debug!(request_id = %request.id, "Dropping cancelled request");
                    continue;
                }

                request.mark_started();
                let outcome = session.play(&request).await;
                request.complete(outcome);
            }
            None => {
                idle_remaining = idle_remaining.saturating_sub(TICK);
                if idle_remaining.is_zero() && session.is_connected() {
                    info!("Queue idle, tearing down session");
                    session.teardown().await;
                }
            }
        }
    }

    // Cleanup strictly before the state reset, so a restarted worker never
    // sees leftovers from this one
    inner.queue.clear();
    session.teardown().await;
    inner.worker.reset_to_idle();
    info!("Playback worker stopped");
}
