//! In-memory bus for tests and demos.
//!
//! Delivers image frames synchronously on the publisher's thread (the same
//! model as the real transport's delivery callbacks), records published
//! position commands for inspection, and serves joint-state reads from a
//! settable map.

use super::{BusError, BusResult, ImageCallback, ImageSource, JointStateSource,
    PositionCommandSink};
use crate::frame::ImageFrame;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Inner {
    subscribers: Mutex<HashMap<String, Vec<ImageCallback>>>,
    published: Mutex<Vec<(String, f64)>>,
    joint_positions: Mutex<HashMap<String, f64>>,
    publish_failure: AtomicBool,
}

/// In-process implementation of all three bus seams.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `frame` to every subscriber of `topic`, synchronously.
    pub fn publish_image(&self, topic: &str, frame: &ImageFrame) {
        let subscribers = self.inner.subscribers.lock().unwrap();
        if let Some(callbacks) = subscribers.get(topic) {
            for callback in callbacks {
                callback(frame);
            }
        }
    }

    /// Set the position served for `joint` by [`JointStateSource`] reads.
    pub fn set_joint_position(&self, joint: &str, radians: f64) {
        self.inner
            .joint_positions
            .lock()
            .unwrap()
            .insert(joint.to_string(), radians);
    }

    /// Remove `joint` from the state feed, so reads return `None`.
    pub fn clear_joint_position(&self, joint: &str) {
        self.inner.joint_positions.lock().unwrap().remove(joint);
    }

    /// All position commands published so far, in order.
    pub fn published(&self) -> Vec<(String, f64)> {
        self.inner.published.lock().unwrap().clone()
    }

    /// Most recent position published to `topic`, if any.
    pub fn last_published(&self, topic: &str) -> Option<f64> {
        self.inner
            .published
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, v)| *v)
    }

    /// Make subsequent `publish_position` calls fail, for degraded-mode
    /// tests.
    pub fn set_publish_failure(&self, fail: bool) {
        self.inner.publish_failure.store(fail, Ordering::SeqCst);
    }
}

impl ImageSource for MemoryBus {
    fn subscribe_images(&mut self, topic: &str, callback: ImageCallback) -> BusResult<()> {
        self.inner
            .subscribers
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_default()
            .push(callback);
        Ok(())
    }
}

impl PositionCommandSink for MemoryBus {
    fn publish_position(&self, topic: &str, radians: f64) -> BusResult<()> {
        if self.inner.publish_failure.load(Ordering::SeqCst) {
            return Err(BusError::Transport("publish failure injected".to_string()));
        }
        self.inner
            .published
            .lock()
            .unwrap()
            .push((topic.to_string(), radians));
        Ok(())
    }
}

impl JointStateSource for MemoryBus {
    fn read_position(&self, joint: &str, _timeout: Duration) -> Option<f64> {
        self.inner.joint_positions.lock().unwrap().get(joint).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_frame() -> ImageFrame {
        ImageFrame::new(1, 1, vec![1, 2, 3])
    }

    #[test]
    fn frames_reach_all_subscribers() {
        let mut bus = MemoryBus::new();
        let count = Arc::new(Mutex::new(0usize));

        for _ in 0..2 {
            let count = count.clone();
            bus.subscribe_images(
                "plate/cam_q1/image",
                Arc::new(move |_frame: &ImageFrame| {
                    *count.lock().unwrap() += 1;
                }),
            )
            .unwrap();
        }

        bus.publish_image("plate/cam_q1/image", &tiny_frame());
        bus.publish_image("plate/cam_q2/image", &tiny_frame());
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn published_commands_are_recorded_in_order() {
        let bus = MemoryBus::new();
        bus.publish_position("a", 0.1).unwrap();
        bus.publish_position("b", 0.2).unwrap();
        bus.publish_position("a", 0.3).unwrap();

        assert_eq!(bus.published().len(), 3);
        assert_eq!(bus.last_published("a"), Some(0.3));
        assert_eq!(bus.last_published("b"), Some(0.2));
        assert_eq!(bus.last_published("c"), None);
    }

    #[test]
    fn joint_reads_come_from_the_map() {
        let bus = MemoryBus::new();
        let timeout = Duration::from_secs(3);
        assert_eq!(bus.read_position("joint_azimuth", timeout), None);

        bus.set_joint_position("joint_azimuth", 0.25);
        assert_eq!(bus.read_position("joint_azimuth", timeout), Some(0.25));

        bus.clear_joint_position("joint_azimuth");
        assert_eq!(bus.read_position("joint_azimuth", timeout), None);
    }

    #[test]
    fn injected_failure_surfaces_as_transport_error() {
        let bus = MemoryBus::new();
        bus.set_publish_failure(true);
        assert!(bus.publish_position("a", 1.0).is_err());
        bus.set_publish_failure(false);
        assert!(bus.publish_position("a", 1.0).is_ok());
    }
}
