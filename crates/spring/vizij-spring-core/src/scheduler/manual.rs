//! Host-driven frames.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{FrameCallback, FrameHandle, FrameScheduler};
use crate::error::SpringError;

#[derive(Default)]
struct Queue {
    pending: Vec<(u64, FrameCallback)>,
    next_id: u64,
}

/// Scheduler whose frames fire only when the host calls [`tick`](Self::tick).
///
/// Clones share the same queue, so a host can hand one clone to a spring and
/// keep another to drive it from its own loop (or a test).
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<Queue>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of requests waiting for a frame.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Fire every callback that was pending when the tick began, with
    /// `timestamp` in seconds. Requests made by those callbacks wait for the
    /// next tick. Returns how many callbacks fired.
    pub fn tick(&self, timestamp: f64) -> usize {
        let due = std::mem::take(&mut self.lock().pending);
        let fired = due.len();
        for (_, callback) in due {
            callback(Ok(timestamp));
        }
        fired
    }

    /// Reject every pending request with `error`.
    pub fn reject_all(&self, error: SpringError) -> usize {
        let due = std::mem::take(&mut self.lock().pending);
        let rejected = due.len();
        for (_, callback) in due {
            callback(Err(error.clone()));
        }
        rejected
    }
}

impl FrameScheduler for ManualScheduler {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        let mut queue = self.lock();
        let id = queue.next_id;
        queue.next_id += 1;
        queue.pending.push((id, callback));
        FrameHandle(id)
    }

    fn cancel(&self, handle: FrameHandle) {
        self.lock().pending.retain(|(id, _)| *id != handle.0);
    }
}
