//! Transport seams between the control core and the simulator.
//!
//! The simulator is reached only over publish/subscribe topics. These traits
//! are the narrow seams the core depends on; tests and demos substitute the
//! in-memory bus, deployments use the Gazebo bridge.

pub mod memory;

use crate::frame::ImageFrame;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryBus;

/// Errors produced by bus operations.
#[derive(Error, Debug)]
pub enum BusError {
    /// The underlying transport could not be reached.
    #[error("transport unavailable: {0}")]
    Transport(String),

    /// A message could not be encoded or decoded.
    #[error("malformed message on {topic}: {reason}")]
    Malformed {
        /// Topic the message arrived on.
        topic: String,
        /// Decoder's description of the problem.
        reason: String,
    },
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Callback invoked for every decoded frame on a subscribed image topic.
///
/// Runs on the transport's delivery thread and must not block.
pub type ImageCallback = Arc<dyn Fn(&ImageFrame) + Send + Sync>;

/// Read seam for the quadrant camera topics.
pub trait ImageSource {
    /// Subscribe `callback` to `topic`.
    ///
    /// # Errors
    /// Returns an error if the subscription cannot be established.
    fn subscribe_images(&mut self, topic: &str, callback: ImageCallback) -> BusResult<()>;
}

/// Write seam for the joint position-command topics.
///
/// Delivery is at-most-once: implementations neither retry nor wait for
/// acknowledgment.
pub trait PositionCommandSink {
    /// Publish an absolute joint position in radians.
    ///
    /// # Errors
    /// Returns an error if the transport rejects the message. Callers treat
    /// this as a degraded-mode signal, never as fatal.
    fn publish_position(&self, topic: &str, radians: f64) -> BusResult<()>;
}

/// One-shot read of a joint's absolute position from the live state feed.
///
/// A best-effort bootstrap operation: `None` covers timeout, malformed
/// output and transport failure alike. Runs at most once per tracking start
/// and never from inside the control tick.
pub trait JointStateSource {
    /// Read the current position of `joint` in radians, waiting at most
    /// `timeout`.
    fn read_position(&self, joint: &str, timeout: Duration) -> Option<f64>;
}
