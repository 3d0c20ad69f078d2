//! Fixed-step spring integrator with sub-frame interpolation.
//!
//! The integrator only ever advances by whole `step_size` sub-steps
//! (semi-implicit Euler, unit mass). A rendered frame usually does not line up
//! with the sub-step grid, so [`advance`] keeps the state from just before the
//! last sub-step and blends the two according to how far into that sub-step
//! the frame actually landed. The blend is what gets published; the physics
//! state itself is never touched by it.

use crate::config::SpringConfig;
use crate::vecmath;

/// Value and velocity buffers of equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhysicsState {
    pub value: Vec<f64>,
    pub velocity: Vec<f64>,
}

impl PhysicsState {
    /// State at rest at `value`.
    pub fn at_rest(value: Vec<f64>) -> Self {
        let velocity = vec![0.0; value.len()];
        Self { value, velocity }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Overwrite `self` with `other` without reallocating.
    #[inline]
    pub fn copy_from(&mut self, other: &PhysicsState) {
        self.value.copy_from_slice(&other.value);
        self.velocity.copy_from_slice(&other.velocity);
    }

    /// Jump to `target` and stop.
    pub fn snap_to(&mut self, target: &[f64]) {
        self.value.copy_from_slice(target);
        self.velocity.iter_mut().for_each(|v| *v = 0.0);
    }

    /// `previous + ratio * (current - previous)`, written into `self`.
    /// A ratio of 1 copies `current` exactly.
    pub fn blend(&mut self, previous: &PhysicsState, current: &PhysicsState, ratio: f64) {
        if ratio >= 1.0 {
            self.copy_from(current);
            return;
        }
        lerp_into(&mut self.value, &previous.value, &current.value, ratio);
        lerp_into(&mut self.velocity, &previous.velocity, &current.velocity, ratio);
    }
}

fn lerp_into(out: &mut [f64], from: &[f64], to: &[f64], t: f64) {
    out.copy_from_slice(from);
    // from - to, scaled by -t, is t * (to - from)
    let delta = vecmath::scale_in_place(vecmath::sub_in_place(out, to), -t);
    vecmath::add_in_place(delta, from);
}

/// One semi-implicit Euler sub-step of size `h` toward `target`.
///
/// Velocity is updated first and the new velocity moves the value.
pub fn step(state: &mut PhysicsState, target: &[f64], stiffness: f64, damping: f64, h: f64) {
    for i in 0..state.value.len() {
        let displacement = target[i] - state.value[i];
        let elastic = displacement * stiffness;
        let friction = state.velocity[i] * damping;
        let acceleration = elastic - friction;
        state.velocity[i] += acceleration * h;
        state.value[i] += state.velocity[i] * h;
    }
}

/// Clamp a sampled frame interval: non-positive (or NaN) samples fall back to
/// one sub-step, long ones are capped at `max_frame_interval`.
#[inline]
pub fn sanitize_interval(interval: f64, cfg: &SpringConfig) -> f64 {
    if interval > 0.0 {
        interval.min(cfg.max_frame_interval)
    } else {
        cfg.step_size
    }
}

/// Outcome of one rendered frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameAdvance {
    /// Interval actually simulated, after sanitizing.
    pub interval: f64,
    /// Whole sub-steps run.
    pub substeps: usize,
    /// Weight of the newest physics state in the interpolated output, in `(0, 1]`.
    pub ratio: f64,
}

/// Advance `current` over `interval` seconds and write the interpolated
/// result into `interpolated`. `previous` is scratch space that ends up
/// holding the state before the last sub-step.
pub fn advance(
    current: &mut PhysicsState,
    previous: &mut PhysicsState,
    interpolated: &mut PhysicsState,
    target: &[f64],
    cfg: &SpringConfig,
    interval: f64,
) -> FrameAdvance {
    let h = cfg.step_size;
    let interval = sanitize_interval(interval, cfg);
    let substeps = ((interval / h).ceil() as usize).max(1);

    for _ in 0..substeps {
        previous.copy_from(current);
        step(current, target, cfg.stiffness, cfg.damping, h);
    }

    // Remainder is in (-h, 0]: how far the last sub-step overshot the frame.
    let remainder = interval - substeps as f64 * h;
    let ratio = (1.0 + remainder / h).clamp(f64::MIN_POSITIVE, 1.0);
    interpolated.blend(previous, current, ratio);

    FrameAdvance {
        interval,
        substeps,
        ratio,
    }
}

/// True when every component of the remaining displacement and of the
/// velocity is below `precision`.
pub fn is_settled(state: &PhysicsState, target: &[f64], precision: f64) -> bool {
    target
        .iter()
        .zip(&state.value)
        .all(|(t, x)| (t - x).abs() < precision)
        && state.velocity.iter().all(|v| v.abs() < precision)
}
