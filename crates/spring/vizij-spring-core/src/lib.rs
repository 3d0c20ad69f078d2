//! Vizij Spring Core (engine-agnostic)
//!
//! Damped-spring motion toward a moving target for scalar, vector and record
//! values. A [`Spring`] owns its physics and run state and publishes the
//! current value, velocity, speed and run state through observable cells.
//! Frames come from a pluggable [`FrameScheduler`], so the same spring can run
//! off a timer thread, the browser's animation frames or a host game loop.
//!
//! Modules:
//! - `vecmath`: element-wise buffer helpers
//! - `physics`: fixed-step integrator with sub-frame interpolation
//! - `value`: public value shapes and the buffer adapter
//! - `spring`: run-state machine and frame loop
//! - `store`, `scheduler`: the observable and frame-source seams

pub mod config;
pub mod error;
mod gate;
pub mod physics;
pub mod scheduler;
pub mod spring;
pub mod state;
pub mod store;
pub mod value;
pub mod vecmath;

pub use config::SpringConfig;
pub use error::SpringError;
pub use gate::Wait;
pub use physics::{FrameAdvance, PhysicsState};
pub use scheduler::{
    default_scheduler, FrameCallback, FrameHandle, FrameScheduler, ManualScheduler,
    TimerScheduler,
};
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use scheduler::AnimationFrameScheduler;
pub use spring::Spring;
pub use state::RunState;
pub use store::{Readable, Unsubscribe, Writable};
pub use value::{SpringValue, ValueShape};

/// Result alias for spring waits.
pub type Result<T> = core::result::Result<T, SpringError>;
