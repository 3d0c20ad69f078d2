//! Error kinds for spring waits.
//!
//! None of these describe caller mistakes. They explain why an in-flight wait
//! (a pause, an idle wait, a frame request) ended without the outcome it was
//! waiting for.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SpringError {
    /// A skip won the race against a pending pause.
    #[error("interrupted by skip")]
    Skipped,

    /// A frame wait was abandoned because a pause began.
    ///
    /// Only ever delivered to the spring by a [`FrameScheduler`] that rejects
    /// pending requests when the host pauses its frames. The spring itself
    /// never raises it: a pause is honoured when the next frame arrives, so
    /// no frame wait needs interrupting. On receipt a pausing loop enters
    /// `paused` and a running loop asks for another frame.
    ///
    /// [`FrameScheduler`]: crate::scheduler::FrameScheduler
    #[error("frame wait interrupted by pause")]
    Paused,

    /// The frame scheduler rejected a pending frame wait.
    #[error("frame scheduler rejected the wait: {reason}")]
    Scheduler { reason: String },

    /// The spring was dropped before the wait settled.
    #[error("spring dropped before the wait settled")]
    Dropped,
}

impl SpringError {
    pub fn scheduler(reason: impl Into<String>) -> Self {
        Self::Scheduler {
            reason: reason.into(),
        }
    }

    /// Skip and pause interruptions are ordinary control flow for the run loop.
    #[inline]
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Skipped | Self::Paused)
    }

    /// Error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Skipped | Self::Paused => "interruption",
            Self::Scheduler { .. } => "scheduler",
            Self::Dropped => "lifecycle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interruption_kinds() {
        assert!(SpringError::Skipped.is_interruption());
        assert!(SpringError::Paused.is_interruption());
        assert!(!SpringError::scheduler("gone").is_interruption());
        assert!(!SpringError::Dropped.is_interruption());
    }

    #[test]
    fn categories_and_messages() {
        assert_eq!(SpringError::Skipped.category(), "interruption");
        assert_eq!(SpringError::scheduler("x").category(), "scheduler");
        assert_eq!(SpringError::Dropped.category(), "lifecycle");
        assert_eq!(
            SpringError::scheduler("timer stopped").to_string(),
            "frame scheduler rejected the wait: timer stopped"
        );
    }

    #[test]
    fn serialization() {
        let error = SpringError::scheduler("cancelled");
        let json = serde_json::to_string(&error).expect("serialize");
        let back: SpringError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(error, back);
    }
}
