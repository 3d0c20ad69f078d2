//! One-shot completion signals behind `pause()`, `skip()` and `idle()`.
//!
//! A [`Gate`] is opened exactly once with an outcome. Any number of [`Wait`]
//! futures can be handed out before that; they all complete together with the
//! same outcome. Dropping an unopened gate completes its waiters with
//! [`SpringError::Dropped`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

use crate::error::SpringError;

type Outcome = Result<(), SpringError>;

pub(crate) struct Gate {
    tx: oneshot::Sender<Outcome>,
    rx: Shared<oneshot::Receiver<Outcome>>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx,
            rx: rx.shared(),
        }
    }

    pub(crate) fn wait(&self) -> Wait {
        Wait {
            inner: WaitInner::Pending(self.rx.clone()),
        }
    }

    pub(crate) fn open(self, outcome: Outcome) {
        // Every waiter may already be gone; nothing to deliver then.
        let _ = self.tx.send(outcome);
    }
}

/// Future returned by the spring's wait operations.
#[must_use = "a Wait does nothing unless awaited"]
pub struct Wait {
    inner: WaitInner,
}

enum WaitInner {
    Ready(Option<Outcome>),
    Pending(Shared<oneshot::Receiver<Outcome>>),
}

impl Wait {
    /// A wait that is already satisfied.
    pub(crate) fn ready(outcome: Outcome) -> Self {
        Self {
            inner: WaitInner::Ready(Some(outcome)),
        }
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ready = matches!(self.inner, WaitInner::Ready(_));
        f.debug_struct("Wait").field("ready", &ready).finish()
    }
}

impl Future for Wait {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            WaitInner::Ready(outcome) => {
                Poll::Ready(outcome.take().unwrap_or(Err(SpringError::Dropped)))
            }
            WaitInner::Pending(rx) => match rx.poll_unpin(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(SpringError::Dropped)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn all_waiters_complete_together() {
        let gate = Gate::new();
        let a = gate.wait();
        let mut b = gate.wait();
        assert!((&mut b).now_or_never().is_none());
        gate.open(Err(SpringError::Skipped));
        assert_eq!(block_on(a), Err(SpringError::Skipped));
        assert_eq!(block_on(b), Err(SpringError::Skipped));
    }

    #[test]
    fn dropped_gate_reports_dropped() {
        let gate = Gate::new();
        let w = gate.wait();
        drop(gate);
        assert_eq!(block_on(w), Err(SpringError::Dropped));
    }

    #[test]
    fn ready_wait_completes_immediately() {
        assert_eq!(Wait::ready(Ok(())).now_or_never(), Some(Ok(())));
    }
}
