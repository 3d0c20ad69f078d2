//! Browser animation frames.
//!
//! Pending callbacks live in a thread-local registry and a single long-lived
//! JS closure drains it on each `requestAnimationFrame`. At most one browser
//! request is outstanding at a time, and it is cancelled once nothing is
//! pending.

use std::cell::RefCell;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use super::{FrameCallback, FrameHandle, FrameScheduler};
use crate::error::SpringError;

#[derive(Default)]
struct Registry {
    pending: Vec<(u64, FrameCallback)>,
    next_id: u64,
    raf_id: Option<i32>,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());

    static ON_FRAME: Closure<dyn FnMut(f64)> =
        Closure::wrap(Box::new(on_animation_frame) as Box<dyn FnMut(f64)>);
}

fn on_animation_frame(timestamp_ms: f64) {
    let due = REGISTRY.with(|r| {
        let mut r = r.borrow_mut();
        r.raf_id = None;
        std::mem::take(&mut r.pending)
    });
    let now = timestamp_ms / 1000.0;
    for (_, callback) in due {
        callback(Ok(now));
    }
}

fn fail_pending(reason: String) {
    log::error!("animation frame request failed: {reason}");
    let due = REGISTRY.with(|r| std::mem::take(&mut r.borrow_mut().pending));
    let error = SpringError::scheduler(reason);
    for (_, callback) in due {
        callback(Err(error.clone()));
    }
}

/// `requestAnimationFrame`-backed scheduler. Timestamps are the browser's
/// high-resolution frame time converted to seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnimationFrameScheduler;

impl AnimationFrameScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        let (handle, needs_raf) = REGISTRY.with(|r| {
            let mut r = r.borrow_mut();
            let id = r.next_id;
            r.next_id += 1;
            r.pending.push((id, callback));
            (FrameHandle(id), r.raf_id.is_none())
        });
        if !needs_raf {
            return handle;
        }

        let Some(window) = web_sys::window() else {
            fail_pending("no window".to_string());
            return handle;
        };
        let requested =
            ON_FRAME.with(|f| window.request_animation_frame(f.as_ref().unchecked_ref()));
        match requested {
            Ok(raf_id) => REGISTRY.with(|r| r.borrow_mut().raf_id = Some(raf_id)),
            Err(e) => fail_pending(format!("{e:?}")),
        }
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        let idle_raf = REGISTRY.with(|r| {
            let mut r = r.borrow_mut();
            r.pending.retain(|(id, _)| *id != handle.0);
            if r.pending.is_empty() {
                r.raf_id.take()
            } else {
                None
            }
        });
        if let (Some(raf_id), Some(window)) = (idle_raf, web_sys::window()) {
            if let Err(e) = window.cancel_animation_frame(raf_id) {
                log::warn!("cancelAnimationFrame({raf_id}) failed: {e:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    fn outstanding() -> (usize, Option<i32>) {
        REGISTRY.with(|r| {
            let r = r.borrow();
            (r.pending.len(), r.raf_id)
        })
    }

    #[wasm_bindgen_test]
    fn cancelling_the_last_request_releases_the_browser_frame() {
        let sched = AnimationFrameScheduler::new();
        let a = sched.request(Box::new(|_| {}));
        let b = sched.request(Box::new(|_| {}));
        let (pending, raf) = outstanding();
        assert_eq!(pending, 2);
        assert!(raf.is_some());

        sched.cancel(a);
        assert_eq!(outstanding().0, 1);
        assert!(outstanding().1.is_some());

        sched.cancel(b);
        assert_eq!(outstanding(), (0, None));

        // Cancelling again is a no-op.
        sched.cancel(b);
        assert_eq!(outstanding(), (0, None));
    }
}
