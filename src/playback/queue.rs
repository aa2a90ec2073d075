//! Playback queue
//!
//! Unbounded FIFO shared between any number of enqueueing callers and the
//! single worker loop. The lock is internal and never held across an await;
//! `push` reports the depth after insertion so the intake bridge can size
//! its wait budget.

use crate::playback::request::PlaybackRequest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// FIFO of pending playback requests
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    items: Mutex<VecDeque<Arc<PlaybackRequest>>>,
}

impl PlaybackQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a request, returning the queue depth after insertion
    pub fn push(&self, request: Arc<PlaybackRequest>) -> usize {
        let mut items = self.items.lock().unwrap();
        items.push_back(request);
        items.len()
    }

    /// Remove and return the oldest request, if any
    pub fn pop(&self) -> Option<Arc<PlaybackRequest>> {
        self.items.lock().unwrap().pop_front()
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Drop all pending requests (their completion channels close unsent)
    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}
