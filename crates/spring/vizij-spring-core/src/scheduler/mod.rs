//! Frame scheduling.
//!
//! A spring never drives its own clock. It asks a [`FrameScheduler`] for "the
//! next frame" and advances when the callback fires. Three strategies ship
//! with the crate:
//!
//! - [`TimerScheduler`]: a background thread ticking at a fixed rate (60 Hz by default)
//! - [`ManualScheduler`]: frames fire when the host calls [`ManualScheduler::tick`]
//! - `AnimationFrameScheduler`: browser `requestAnimationFrame` (feature `web`, wasm32 only)
//!
//! [`default_scheduler`] picks one once; springs never probe per call.

mod manual;
mod timer;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web;

use std::sync::Arc;

use crate::error::SpringError;

pub use manual::ManualScheduler;
pub use timer::TimerScheduler;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::AnimationFrameScheduler;

/// Frame callback. Receives the frame timestamp in seconds, or the reason the
/// frame will never come.
pub type FrameCallback = Box<dyn FnOnce(Result<f64, SpringError>) + Send>;

/// Identifies one outstanding frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Source of frame callbacks.
///
/// Each requested callback fires at most once. `cancel` releases a pending
/// request without firing it; cancelling a handle that already fired (or was
/// never issued) does nothing. Implementations may invoke the callback from
/// any thread, including synchronously from inside `request`.
pub trait FrameScheduler: Send + Sync {
    fn request(&self, callback: FrameCallback) -> FrameHandle;
    fn cancel(&self, handle: FrameHandle);
}

/// Browser animation frames when available, otherwise a 60 Hz timer.
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub fn default_scheduler() -> Arc<dyn FrameScheduler> {
    if web_sys::window().is_some() {
        Arc::new(AnimationFrameScheduler::new())
    } else {
        Arc::new(TimerScheduler::default())
    }
}

/// Browser animation frames when available, otherwise a 60 Hz timer.
#[cfg(not(all(feature = "web", target_arch = "wasm32")))]
pub fn default_scheduler() -> Arc<dyn FrameScheduler> {
    Arc::new(TimerScheduler::default())
}
