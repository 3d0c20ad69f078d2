//! Spring tuning knobs.

use serde::{Deserialize, Serialize};

/// Stiffness, damping and timing for a spring.
///
/// All fields are expected to be positive (`damping` may be zero). A running
/// spring reads the live values every frame, so changing them mid-flight takes
/// effect on the next frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// Force per unit of displacement (unit mass).
    pub stiffness: f64,
    /// Force per unit of velocity opposing motion.
    pub damping: f64,
    /// Convergence threshold applied to both remaining displacement and velocity.
    pub precision: f64,
    /// Fixed integration sub-step, in seconds.
    pub step_size: f64,
    /// Upper bound on the frame interval fed to the integrator, in seconds.
    pub max_frame_interval: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 300.0,
            damping: 30.0,
            precision: 0.1,
            step_size: 1.0 / 300.0,
            max_frame_interval: 1.0 / 24.0,
        }
    }
}

impl SpringConfig {
    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_max_frame_interval(mut self, max_frame_interval: f64) -> Self {
        self.max_frame_interval = max_frame_interval;
        self
    }

    /// Upper bound on integrator sub-steps run for a single frame.
    #[inline]
    pub fn max_substeps(&self) -> usize {
        (self.max_frame_interval / self.step_size).ceil() as usize
    }
}
