//! Fire-and-forget forwarding of computed joint commands.

use shared::bus::PositionCommandSink;
use std::sync::Arc;

/// Absolute position commands for both axes, radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCommands {
    pub azimuth: f64,
    pub elevation: f64,
}

/// Publisher handles for the two command topics.
///
/// Detached until tracking starts and after it stops; publishing while
/// detached is a silent no-op, which covers a stop command racing an
/// in-flight tick. Delivery is at-most-once: failures are counted and
/// logged as a degraded-mode signal but never retried and never propagate.
pub struct CommandPublisher {
    azimuth_topic: String,
    elevation_topic: String,
    sink: Option<Arc<dyn PositionCommandSink + Send + Sync>>,
    publish_failures: u64,
    consecutive_failures: u64,
}

impl CommandPublisher {
    /// Create a detached publisher for the two topics.
    pub fn new(azimuth_topic: impl Into<String>, elevation_topic: impl Into<String>) -> Self {
        Self {
            azimuth_topic: azimuth_topic.into(),
            elevation_topic: elevation_topic.into(),
            sink: None,
            publish_failures: 0,
            consecutive_failures: 0,
        }
    }

    /// Establish the transport handle. Called when tracking starts.
    pub fn attach(&mut self, sink: Arc<dyn PositionCommandSink + Send + Sync>) {
        self.sink = Some(sink);
        self.consecutive_failures = 0;
    }

    /// Drop the transport handle. Called when tracking stops.
    pub fn detach(&mut self) {
        self.sink = None;
    }

    /// Whether a transport handle is currently established.
    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// Total failed publish attempts since construction.
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures
    }

    /// Forward both axis commands to their topics.
    pub fn publish(&mut self, commands: &JointCommands) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        for (topic, radians) in [
            (self.azimuth_topic.clone(), commands.azimuth),
            (self.elevation_topic.clone(), commands.elevation),
        ] {
            match sink.publish_position(&topic, radians) {
                Ok(()) => self.consecutive_failures = 0,
                Err(e) => {
                    self.publish_failures += 1;
                    self.consecutive_failures += 1;
                    // One warning per failure streak keeps a flaky transport
                    // from flooding the log at the control rate.
                    if self.consecutive_failures == 1 {
                        log::warn!("dropped position command on {topic}: {e}");
                    } else {
                        log::debug!("dropped position command on {topic}: {e}");
                    }
                }
            }
        }
    }
}
