use serde::{Deserialize, Serialize};
use shared::photometry::CaptureRegion;
use std::time::Duration;

use crate::error::TrackerError;

/// Step magnitudes and the thresholds that select between them.
///
/// The magnitude of a luminance difference is partitioned into four regimes
/// by three ascending thresholds; each regime maps to one step. Larger
/// misalignment takes a larger corrective step, trading steady-state
/// precision for convergence speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLadder {
    /// Step while `|diff| < thresh_1` (finest)
    pub step_1: f64,
    /// Step while `thresh_1 <= |diff| < thresh_2`
    pub step_2: f64,
    /// Step while `thresh_2 <= |diff| < thresh_3`
    pub step_3: f64,
    /// Step while `thresh_3 <= |diff|` (coarsest)
    pub step_4: f64,
    /// First regime boundary
    pub thresh_1: f64,
    /// Second regime boundary
    pub thresh_2: f64,
    /// Third regime boundary
    pub thresh_3: f64,
}

impl StepLadder {
    /// Map a luminance difference to a corrective step magnitude.
    ///
    /// Regimes are selected with strict `<`, so a magnitude exactly on a
    /// boundary takes the next larger step.
    pub fn step_for(&self, diff: f64) -> f64 {
        let magnitude = diff.abs();
        if magnitude < self.thresh_1 {
            self.step_1
        } else if magnitude < self.thresh_2 {
            self.step_2
        } else if magnitude < self.thresh_3 {
            self.step_3
        } else {
            self.step_4
        }
    }
}

impl Default for StepLadder {
    fn default() -> Self {
        Self {
            step_1: 0.00005,
            step_2: 0.0005,
            step_3: 0.002,
            step_4: 0.003,
            thresh_1: 1.0,
            thresh_2: 5.0,
            thresh_3: 15.0,
        }
    }
}

/// Configuration for one tracking session.
///
/// Immutable once handed to the controller; a new session takes a new
/// config. Defaults are the tuning that converges against the shipped
/// plate world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Adaptive step selection
    pub steps: StepLadder,
    /// Dead-band: differences within `[-eps, eps]` apply no correction
    pub eps: f64,
    /// Control tick frequency in Hz
    pub control_freq_hz: f64,
    /// Name of the azimuth joint in the simulator model
    pub azimuth_joint: String,
    /// Name of the elevation joint in the simulator model
    pub elevation_joint: String,
    /// Upper bound on each baseline position read, seconds
    pub baseline_timeout_secs: f64,
    /// Frame region the photodiode luminance is averaged over
    pub region: CaptureRegion,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            steps: StepLadder::default(),
            eps: 0.00001,
            control_freq_hz: 40.0,
            azimuth_joint: "joint_azimuth".to_string(),
            elevation_joint: "joint_elevation".to_string(),
            baseline_timeout_secs: 3.0,
            region: CaptureRegion::Full,
        }
    }
}

impl TrackerConfig {
    /// Interval between control ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.control_freq_hz)
    }

    /// Upper bound on each baseline read.
    pub fn baseline_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.baseline_timeout_secs)
    }

    /// Check the configuration for values the controller cannot run with.
    ///
    /// Thresholds must be positive and strictly ascending; frequency,
    /// timeout and dead-band must be positive finite numbers. A step ladder
    /// that is not ascending is accepted with a warning: operators tune the
    /// steps freely and a coarse-regime step below a mid-regime one is a
    /// valid (if unusual) choice.
    ///
    /// # Errors
    /// Returns `TrackerError::InvalidConfig` describing the first offending
    /// field.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let ladder = &self.steps;
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;

        if !finite_positive(self.control_freq_hz) {
            return Err(TrackerError::InvalidConfig(format!(
                "control frequency must be positive, got {} Hz",
                self.control_freq_hz
            )));
        }
        if !finite_positive(self.baseline_timeout_secs) {
            return Err(TrackerError::InvalidConfig(format!(
                "baseline timeout must be positive, got {} s",
                self.baseline_timeout_secs
            )));
        }
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "dead-band eps must be non-negative, got {}",
                self.eps
            )));
        }
        if !(finite_positive(ladder.thresh_1)
            && ladder.thresh_1 < ladder.thresh_2
            && ladder.thresh_2 < ladder.thresh_3)
        {
            return Err(TrackerError::InvalidConfig(format!(
                "thresholds must be positive and ascending, got {} / {} / {}",
                ladder.thresh_1, ladder.thresh_2, ladder.thresh_3
            )));
        }
        for (name, step) in [
            ("step_1", ladder.step_1),
            ("step_2", ladder.step_2),
            ("step_3", ladder.step_3),
            ("step_4", ladder.step_4),
        ] {
            if !finite_positive(step) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be positive, got {step}"
                )));
            }
        }
        if !(ladder.step_1 < ladder.step_2
            && ladder.step_2 < ladder.step_3
            && ladder.step_3 < ladder.step_4)
        {
            log::warn!(
                "step ladder is not ascending ({} / {} / {} / {})",
                ladder.step_1,
                ladder.step_2,
                ladder.step_3,
                ladder.step_4
            );
        }
        Ok(())
    }
}
