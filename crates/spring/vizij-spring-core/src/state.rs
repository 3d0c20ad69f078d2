use serde::{Deserialize, Serialize};

/// Run state of a spring's simulation loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No loop is running; the value sits at its target
    #[default]
    Idle,
    /// Advancing every frame
    Running,
    /// Pause requested, honoured on the next frame
    Pausing,
    /// Suspended until resumed or skipped
    Paused,
    /// Snapping to the target
    Skipping,
}

impl RunState {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Pausing => "pausing",
            Self::Paused => "paused",
            Self::Skipping => "skipping",
        }
    }

    /// A loop exists (anything but idle).
    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    #[inline]
    pub fn can_pause(&self) -> bool {
        matches!(self, Self::Running)
    }

    #[inline]
    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Paused)
    }

    #[inline]
    pub fn can_skip(&self) -> bool {
        matches!(self, Self::Running | Self::Pausing | Self::Paused)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_guards() {
        assert!(RunState::Running.can_pause());
        assert!(!RunState::Paused.can_pause());
        assert!(RunState::Paused.can_resume());
        assert!(!RunState::Pausing.can_resume());
        for s in [RunState::Running, RunState::Pausing, RunState::Paused] {
            assert!(s.can_skip());
        }
        assert!(!RunState::Idle.can_skip());
        assert!(!RunState::Skipping.can_skip());
        assert!(!RunState::Idle.is_active());
    }

    #[test]
    fn names_match_serde() {
        let json = serde_json::to_string(&RunState::Pausing).expect("json");
        assert_eq!(json, "\"pausing\"");
        assert_eq!(RunState::Skipping.to_string(), "skipping");
    }
}
