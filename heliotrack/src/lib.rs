//! Closed-loop photometric tracking for the solar dish.
//!
//! Four quadrant cameras act as photodiodes; their pairwise luminance
//! differences form the error signal, and an adaptive-step hill climb
//! drives the azimuth and elevation joints toward the light source.
//! States: Idle -> Tracking -> Idle.
//!
//! Correction rules per tick, with `eps` the dead-band:
//!
//! - elevation: `d12 = Q1-Q2`; `d12 > eps` steps positive, `d12 < -eps`
//!   steps negative.
//! - azimuth, while `Q1+Q4 > Q2+Q3` (diagonal-sum rule): same three-zone
//!   rule on `d14 = Q1-Q4`.
//! - azimuth, otherwise (lower-pair rule): `Q2 > Q3 + eps` steps positive,
//!   `Q2 < Q3 - eps` steps negative, with the step magnitude taken from
//!   `d32 = Q3-Q2`. The polarity is opposite the diagonal-sum rule's; the
//!   tuning was validated with exactly these conventions, so neither sign
//!   may change without re-validating against the plate world.
//!
//! Step magnitudes grow with the difference magnitude through a four-regime
//! ladder, so a badly misaligned dish converges quickly while a nearly
//! aligned one creeps. Offsets accumulate without bound; the joints' own
//! range limits are the only saturation downstream.

pub mod callback;
pub mod command;
pub mod config;
pub mod error;
pub mod photodiode;
pub mod state;

pub use callback::{AzimuthMode, LuminanceDiffs, TickReport, TrackerCallbackEvent};
pub use command::{CommandPublisher, JointCommands};
pub use config::{StepLadder, TrackerConfig};
pub use error::TrackerError;
pub use photodiode::{QuadReading, QuadSnapshot, QuadrantReader};
pub use state::TrackerState;

use callback::{CallbackId, TrackerCallback};
use shared::bus::JointStateSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Joint positions captured once at tracking start, radians.
///
/// Commands are always `baseline + accumulated offset`; a new start takes a
/// fresh baseline and zeroes the offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointBaseline {
    pub azimuth: f64,
    pub elevation: f64,
}

/// The tracking controller state machine.
///
/// `start`, `stop` and `tick` are the only entry points; front ends observe
/// through registered callbacks and the read accessors. `tick` is
/// non-reentrant by taking `&mut self`.
pub struct SunTracker {
    state: TrackerState,
    config: TrackerConfig,
    baseline: Option<JointBaseline>,
    azimuth_offset: f64,
    elevation_offset: f64,
    callbacks: Arc<Mutex<HashMap<CallbackId, TrackerCallback>>>,
    next_callback_id: Arc<Mutex<CallbackId>>,
}

impl SunTracker {
    /// Create an idle tracker.
    ///
    /// # Errors
    /// Returns `TrackerError::InvalidConfig` if the configuration fails
    /// validation.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self {
            state: TrackerState::Idle,
            config,
            baseline: None,
            azimuth_offset: 0.0,
            elevation_offset: 0.0,
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            next_callback_id: Arc::new(Mutex::new(0)),
        })
    }

    /// Register a callback for controller events.
    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&TrackerCallbackEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.lock().unwrap();
        let mut next_id = self.next_callback_id.lock().unwrap();

        let callback_id = *next_id;
        *next_id += 1;

        callbacks.insert(callback_id, Arc::new(callback));
        callback_id
    }

    /// Deregister a callback.
    pub fn deregister_callback(&self, callback_id: CallbackId) -> bool {
        self.callbacks.lock().unwrap().remove(&callback_id).is_some()
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    fn emit_event(&self, event: &TrackerCallbackEvent) {
        let callbacks = self.callbacks.lock().unwrap();
        for callback in callbacks.values() {
            callback(event);
        }
    }

    /// Current state.
    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Configuration this tracker was built with.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Baseline of the current (or last) session, if one was captured.
    pub fn baseline(&self) -> Option<JointBaseline> {
        self.baseline
    }

    /// Accumulated `(azimuth, elevation)` offsets in radians.
    pub fn offsets(&self) -> (f64, f64) {
        (self.azimuth_offset, self.elevation_offset)
    }

    /// Capture the session baseline and enter `Tracking`.
    ///
    /// Both joints are read through `joints` with the configured timeout.
    /// The capture is both-or-neither: if either read fails the controller
    /// stays `Idle` and nothing is mutated. Calling while already tracking
    /// is a no-op.
    ///
    /// # Errors
    /// `TrackerError::BaselineUnavailable` naming the first joint that
    /// could not be read.
    pub fn start(&mut self, joints: &dyn JointStateSource) -> Result<(), TrackerError> {
        if self.state.is_tracking() {
            log::debug!("start ignored: already tracking");
            return Ok(());
        }

        let timeout = self.config.baseline_timeout();
        let azimuth = joints
            .read_position(&self.config.azimuth_joint, timeout)
            .ok_or_else(|| TrackerError::BaselineUnavailable {
                joint: self.config.azimuth_joint.clone(),
            })?;
        let elevation = joints
            .read_position(&self.config.elevation_joint, timeout)
            .ok_or_else(|| TrackerError::BaselineUnavailable {
                joint: self.config.elevation_joint.clone(),
            })?;

        let baseline = JointBaseline { azimuth, elevation };
        self.baseline = Some(baseline);
        self.azimuth_offset = 0.0;
        self.elevation_offset = 0.0;
        self.state = TrackerState::Tracking { ticks: 0 };

        log::info!("tracking started: azimuth {azimuth:.4} rad, elevation {elevation:.4} rad");
        self.emit_event(&TrackerCallbackEvent::TrackingStarted { baseline });
        Ok(())
    }

    /// Return to `Idle`.
    ///
    /// Accumulated offsets stay readable but are superseded by the next
    /// baseline capture; no homing command is issued.
    pub fn stop(&mut self) {
        if !self.state.is_tracking() {
            return;
        }
        self.state = TrackerState::Idle;
        log::info!("tracking stopped");
        self.emit_event(&TrackerCallbackEvent::TrackingStopped);
    }

    /// Run one control tick over `snapshot`.
    ///
    /// Returns the absolute commands to publish, or `None` when idle or
    /// when any quadrant has not reported yet (sensors still warming up;
    /// the skip leaves offsets untouched). Commands are re-published every
    /// completed tick even when the offsets did not move.
    pub fn tick(&mut self, snapshot: &QuadSnapshot) -> Option<JointCommands> {
        let TrackerState::Tracking { ticks } = self.state else {
            return None;
        };
        let Some(reading) = snapshot.complete() else {
            log::debug!("tick skipped: waiting for all four quadrants");
            self.emit_event(&TrackerCallbackEvent::WaitingForSensors);
            return None;
        };

        let diffs = LuminanceDiffs::from_reading(&reading);
        let ladder = &self.config.steps;
        let eps = self.config.eps;

        let elevation_step = ladder.step_for(diffs.d12);

        let (azimuth_mode, azimuth_step) = if reading.q1 + reading.q4 > reading.q2 + reading.q3 {
            (AzimuthMode::DiagonalSum, ladder.step_for(diffs.d14))
        } else {
            (AzimuthMode::LowerPair, ladder.step_for(diffs.d32))
        };

        match azimuth_mode {
            AzimuthMode::DiagonalSum => {
                if diffs.d14 > eps {
                    self.azimuth_offset += azimuth_step;
                } else if diffs.d14 < -eps {
                    self.azimuth_offset -= azimuth_step;
                }
            }
            AzimuthMode::LowerPair => {
                // Raw Q2/Q3 comparison decides the sign; d32 only sizes the
                // step.
                if reading.q2 > reading.q3 + eps {
                    self.azimuth_offset += azimuth_step;
                } else if reading.q2 < reading.q3 - eps {
                    self.azimuth_offset -= azimuth_step;
                }
            }
        }

        if diffs.d12 > eps {
            self.elevation_offset += elevation_step;
        } else if diffs.d12 < -eps {
            self.elevation_offset -= elevation_step;
        }

        let baseline = self.baseline?;
        let commands = JointCommands {
            azimuth: baseline.azimuth + self.azimuth_offset,
            elevation: baseline.elevation + self.elevation_offset,
        };
        self.state = TrackerState::Tracking { ticks: ticks + 1 };

        self.emit_event(&TrackerCallbackEvent::TickCompleted {
            report: TickReport {
                reading,
                diffs,
                azimuth_mode,
                azimuth_step,
                elevation_step,
                azimuth_offset: self.azimuth_offset,
                elevation_offset: self.elevation_offset,
                commands,
            },
        });

        Some(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shared::bus::MemoryBus;

    fn snapshot(q1: f64, q2: f64, q3: f64, q4: f64) -> QuadSnapshot {
        QuadSnapshot {
            q1: Some(q1),
            q2: Some(q2),
            q3: Some(q3),
            q4: Some(q4),
        }
    }

    fn started_tracker(bus: &MemoryBus) -> SunTracker {
        bus.set_joint_position("joint_azimuth", 0.1);
        bus.set_joint_position("joint_elevation", -0.2);
        let mut tracker = SunTracker::new(TrackerConfig::default()).unwrap();
        tracker.start(bus).unwrap();
        tracker
    }

    #[test]
    fn starts_idle_with_zero_offsets() {
        let tracker = SunTracker::new(TrackerConfig::default()).unwrap();
        assert_eq!(tracker.state(), &TrackerState::Idle);
        assert_eq!(tracker.offsets(), (0.0, 0.0));
        assert!(tracker.baseline().is_none());
    }

    #[test]
    fn start_captures_baseline_and_enters_tracking() {
        let bus = MemoryBus::new();
        let tracker = started_tracker(&bus);

        assert!(tracker.state().is_tracking());
        let baseline = tracker.baseline().unwrap();
        assert_relative_eq!(baseline.azimuth, 0.1);
        assert_relative_eq!(baseline.elevation, -0.2);
    }

    #[test]
    fn start_fails_closed_when_azimuth_read_fails() {
        let bus = MemoryBus::new();
        bus.set_joint_position("joint_elevation", 0.5);

        let mut tracker = SunTracker::new(TrackerConfig::default()).unwrap();
        let err = tracker.start(&bus).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::BaselineUnavailable { ref joint } if joint == "joint_azimuth"
        ));
        assert_eq!(tracker.state(), &TrackerState::Idle);
        assert!(tracker.baseline().is_none());
    }

    #[test]
    fn start_fails_closed_when_elevation_read_fails() {
        let bus = MemoryBus::new();
        bus.set_joint_position("joint_azimuth", 0.5);

        let mut tracker = SunTracker::new(TrackerConfig::default()).unwrap();
        assert!(tracker.start(&bus).is_err());
        assert_eq!(tracker.state(), &TrackerState::Idle);
        assert!(tracker.baseline().is_none());
    }

    #[test]
    fn second_start_while_tracking_keeps_first_baseline() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);

        // Accumulate some offset, then move the joints under us.
        tracker.tick(&snapshot(150.0, 50.0, 80.0, 80.0));
        bus.set_joint_position("joint_azimuth", 7.0);
        tracker.start(&bus).unwrap();

        let baseline = tracker.baseline().unwrap();
        assert_relative_eq!(baseline.azimuth, 0.1);
        assert_ne!(tracker.offsets(), (0.0, 0.0));
    }

    #[test]
    fn restart_after_stop_rebaselines_and_zeroes_offsets() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);
        tracker.tick(&snapshot(150.0, 50.0, 80.0, 80.0));
        assert_ne!(tracker.offsets(), (0.0, 0.0));

        tracker.stop();
        assert_eq!(tracker.state(), &TrackerState::Idle);

        bus.set_joint_position("joint_azimuth", 1.5);
        tracker.start(&bus).unwrap();
        assert_relative_eq!(tracker.baseline().unwrap().azimuth, 1.5);
        assert_eq!(tracker.offsets(), (0.0, 0.0));
    }

    #[test]
    fn tick_while_idle_does_nothing() {
        let mut tracker = SunTracker::new(TrackerConfig::default()).unwrap();
        assert!(tracker.tick(&snapshot(150.0, 50.0, 80.0, 80.0)).is_none());
        assert_eq!(tracker.offsets(), (0.0, 0.0));
    }

    #[test]
    fn tick_skips_while_any_channel_is_absent() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);

        let partial = QuadSnapshot {
            q1: Some(100.0),
            q2: Some(100.0),
            q3: None,
            q4: Some(100.0),
        };
        assert!(tracker.tick(&partial).is_none());
        assert_eq!(tracker.offsets(), (0.0, 0.0));
        assert_eq!(tracker.state(), &TrackerState::Tracking { ticks: 0 });
    }

    #[test]
    fn balanced_reading_holds_position() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);

        let commands = tracker.tick(&snapshot(100.0, 100.0, 100.0, 100.0)).unwrap();
        assert_eq!(tracker.offsets(), (0.0, 0.0));
        assert_relative_eq!(commands.azimuth, 0.1);
        assert_relative_eq!(commands.elevation, -0.2);
        assert_eq!(tracker.state(), &TrackerState::Tracking { ticks: 1 });
    }

    #[test]
    fn dead_band_swallows_small_differences() {
        let bus = MemoryBus::new();
        bus.set_joint_position("joint_azimuth", 0.0);
        bus.set_joint_position("joint_elevation", 0.0);

        let config = TrackerConfig {
            eps: 0.5,
            ..TrackerConfig::default()
        };
        let mut tracker = SunTracker::new(config).unwrap();
        tracker.start(&bus).unwrap();

        // Differences of exactly eps sit inside the dead band.
        tracker.tick(&snapshot(100.5, 100.0, 100.0, 100.5));
        assert_eq!(tracker.offsets(), (0.0, 0.0));

        // Just past eps corrects.
        tracker.tick(&snapshot(100.6, 100.0, 100.0, 100.0));
        let (azimuth, elevation) = tracker.offsets();
        assert!(azimuth > 0.0);
        assert!(elevation > 0.0);
    }

    #[test]
    fn repeated_ticks_pick_the_same_mode_and_sign() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);

        let modes = Arc::new(Mutex::new(Vec::new()));
        let modes_clone = modes.clone();
        tracker.register_callback(move |event| {
            if let TrackerCallbackEvent::TickCompleted { report } = event {
                modes_clone.lock().unwrap().push(report.azimuth_mode);
            }
        });

        let reading = snapshot(50.0, 120.0, 60.0, 50.0);
        let mut prev_azimuth = 0.0;
        for _ in 0..3 {
            tracker.tick(&reading);
            let (azimuth, _) = tracker.offsets();
            assert!(azimuth > prev_azimuth);
            prev_azimuth = azimuth;
        }
        let modes = modes.lock().unwrap();
        assert!(modes.iter().all(|m| *m == AzimuthMode::LowerPair));
    }

    #[test]
    fn commands_republish_even_without_offset_change() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);

        let balanced = snapshot(100.0, 100.0, 100.0, 100.0);
        let first = tracker.tick(&balanced).unwrap();
        let second = tracker.tick(&balanced).unwrap();
        assert_eq!(first, second);
        assert_eq!(tracker.state(), &TrackerState::Tracking { ticks: 2 });
    }

    #[test]
    fn stop_emits_event_and_is_idempotent() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);

        let events = Arc::new(Mutex::new(0usize));
        let events_clone = events.clone();
        tracker.register_callback(move |event| {
            if matches!(event, TrackerCallbackEvent::TrackingStopped) {
                *events_clone.lock().unwrap() += 1;
            }
        });

        tracker.stop();
        tracker.stop();
        assert_eq!(*events.lock().unwrap(), 1);
    }

    #[test]
    fn callback_registration_and_removal() {
        let tracker = SunTracker::new(TrackerConfig::default()).unwrap();
        let seen = Arc::new(Mutex::new(0usize));
        let seen_clone = seen.clone();

        let id = tracker.register_callback(move |_| {
            *seen_clone.lock().unwrap() += 1;
        });
        assert_eq!(tracker.callback_count(), 1);

        tracker.emit_event(&TrackerCallbackEvent::WaitingForSensors);
        assert_eq!(*seen.lock().unwrap(), 1);

        assert!(tracker.deregister_callback(id));
        tracker.emit_event(&TrackerCallbackEvent::WaitingForSensors);
        assert_eq!(*seen.lock().unwrap(), 1);
        assert!(!tracker.deregister_callback(id));
    }

    #[test]
    fn waiting_for_sensors_is_reported() {
        let bus = MemoryBus::new();
        let mut tracker = started_tracker(&bus);

        let waits = Arc::new(Mutex::new(0usize));
        let waits_clone = waits.clone();
        tracker.register_callback(move |event| {
            if matches!(event, TrackerCallbackEvent::WaitingForSensors) {
                *waits_clone.lock().unwrap() += 1;
            }
        });

        tracker.tick(&QuadSnapshot::default());
        assert_eq!(*waits.lock().unwrap(), 1);
    }
}
