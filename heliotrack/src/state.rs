use serde::{Deserialize, Serialize};

/// Tracking controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerState {
    /// Waiting for a start command
    Idle,
    /// Closed-loop correction running
    Tracking {
        /// Completed (non-skipped) control ticks this session
        ticks: usize,
    },
}

impl TrackerState {
    /// Whether the controller is in the closed loop.
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackerState::Tracking { .. })
    }
}
