//! Observer events emitted by the tracking controller.
//!
//! Front ends own no control logic; they register a callback and render
//! whatever the controller reports.

use crate::command::JointCommands;
use crate::photodiode::QuadReading;
use crate::JointBaseline;
use std::sync::Arc;

/// Pairwise luminance differences computed each tick.
///
/// `d34` takes no part in any decision and `d32` only sizes the azimuth
/// step in the lower-pair rule; all four are reported for operator
/// displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceDiffs {
    /// `Q1 - Q2`, drives the elevation axis
    pub d12: f64,
    /// `Q1 - Q4`, drives azimuth in the diagonal-sum rule
    pub d14: f64,
    /// `Q3 - Q2`, sizes the azimuth step in the lower-pair rule
    pub d32: f64,
    /// `Q3 - Q4`, display only
    pub d34: f64,
}

impl LuminanceDiffs {
    /// Compute all four differences from a complete reading.
    pub fn from_reading(reading: &QuadReading) -> Self {
        Self {
            d12: reading.q1 - reading.q2,
            d14: reading.q1 - reading.q4,
            d32: reading.q3 - reading.q2,
            d34: reading.q3 - reading.q4,
        }
    }
}

/// Which rule drove the azimuth correction on a tick.
///
/// Direction conventions differ between the two rules: the diagonal-sum
/// rule steps positive when `d14 > eps`, the lower-pair rule steps positive
/// when `Q2 > Q3 + eps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AzimuthMode {
    /// `Q1+Q4 > Q2+Q3`: sign and step size from `d14`
    DiagonalSum,
    /// `Q1+Q4 <= Q2+Q3`: sign from raw `Q2` vs `Q3`, step size from `d32`
    LowerPair,
}

/// Everything a front end needs to render one completed control tick.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    /// The snapshot the tick ran on
    pub reading: QuadReading,
    /// All four pairwise differences
    pub diffs: LuminanceDiffs,
    /// Rule that drove the azimuth axis
    pub azimuth_mode: AzimuthMode,
    /// Step magnitude selected for azimuth
    pub azimuth_step: f64,
    /// Step magnitude selected for elevation
    pub elevation_step: f64,
    /// Accumulated azimuth offset after this tick, radians
    pub azimuth_offset: f64,
    /// Accumulated elevation offset after this tick, radians
    pub elevation_offset: f64,
    /// Absolute commands emitted this tick
    pub commands: JointCommands,
}

/// Events emitted to registered observers.
#[derive(Debug, Clone)]
pub enum TrackerCallbackEvent {
    /// Baseline captured, controller entered the closed loop
    TrackingStarted {
        /// Joint positions the session offsets accumulate from
        baseline: JointBaseline,
    },
    /// One completed control tick
    TickCompleted {
        /// Full tick telemetry
        report: TickReport,
    },
    /// Tick skipped: not every quadrant has reported yet
    WaitingForSensors,
    /// Controller returned to idle
    TrackingStopped,
}

/// Callback ID for registration/deregistration
pub type CallbackId = u64;

/// Callback function type
pub type TrackerCallback = Arc<dyn Fn(&TrackerCallbackEvent) + Send + Sync>;
