//! Fixed-rate timer frames, used when the host has no frame callback.
//!
//! All pending requests share one background thread. The thread starts with
//! the first request and exits once a tick finds nothing pending, so an idle
//! spring costs nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::{FrameCallback, FrameHandle, FrameScheduler};
use crate::error::SpringError;

#[derive(Default)]
struct Queue {
    pending: Vec<(u64, FrameCallback)>,
    next_id: u64,
    running: bool,
}

struct Clock {
    queue: Mutex<Queue>,
    origin: Instant,
    interval: Duration,
}

impl Clock {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(self: Arc<Self>) {
        loop {
            thread::sleep(self.interval);
            let due = {
                let mut queue = self.lock();
                if queue.pending.is_empty() {
                    queue.running = false;
                    break;
                }
                std::mem::take(&mut queue.pending)
            };
            let now = self.origin.elapsed().as_secs_f64();
            for (_, callback) in due {
                callback(Ok(now));
            }
        }
        log::trace!("spring timer stopped");
    }
}

/// Scheduler simulating display refresh with a sleeping thread.
#[derive(Clone)]
pub struct TimerScheduler {
    clock: Arc<Clock>,
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new(60)
    }
}

impl std::fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("interval", &self.clock.interval)
            .field("pending", &self.pending())
            .finish()
    }
}

impl TimerScheduler {
    /// Timer firing `fps` times per second (at least once).
    pub fn new(fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            clock: Arc::new(Clock {
                queue: Mutex::new(Queue::default()),
                origin: Instant::now(),
                interval: Duration::from_secs_f64(1.0 / f64::from(fps)),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.clock.interval
    }

    pub fn pending(&self) -> usize {
        self.clock.lock().pending.len()
    }

    /// True while the background thread is alive.
    pub fn is_running(&self) -> bool {
        self.clock.lock().running
    }
}

impl FrameScheduler for TimerScheduler {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        let (handle, start) = {
            let mut queue = self.clock.lock();
            let id = queue.next_id;
            queue.next_id += 1;
            queue.pending.push((id, callback));
            let start = !queue.running;
            queue.running = true;
            (FrameHandle(id), start)
        };

        if start {
            let clock = Arc::clone(&self.clock);
            let spawned = thread::Builder::new()
                .name("vizij-spring-timer".into())
                .spawn(move || clock.run());
            if let Err(e) = spawned {
                log::error!("failed to start spring timer: {e}");
                let due = {
                    let mut queue = self.clock.lock();
                    queue.running = false;
                    std::mem::take(&mut queue.pending)
                };
                let error = SpringError::scheduler(format!("timer thread unavailable: {e}"));
                for (_, callback) in due {
                    callback(Err(error.clone()));
                }
            }
        }
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        self.clock.lock().pending.retain(|(id, _)| *id != handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn fires_with_increasing_timestamps() {
        let sched = TimerScheduler::new(200);
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        sched.request(Box::new(move |ts| tx.send(ts).unwrap()));
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        sched.request(Box::new(move |ts| tx2.send(ts).unwrap()));
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(second > first);
    }

    #[test]
    fn cancelled_request_never_fires() {
        let sched = TimerScheduler::new(200);
        let (tx, rx) = mpsc::channel::<Result<f64, SpringError>>();
        let handle = sched.request(Box::new(move |ts| tx.send(ts).unwrap()));
        sched.cancel(handle);
        assert_eq!(sched.pending(), 0);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn thread_stops_when_idle() {
        let sched = TimerScheduler::new(200);
        let (tx, rx) = mpsc::channel();
        sched.request(Box::new(move |ts| tx.send(ts).unwrap()));
        rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while sched.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!sched.is_running());
    }
}
