//! Gazebo Transport access through the `gz` command-line tool.
//!
//! The simulator's native transport has no Rust bindings, so every
//! operation shells out to `gz topic`: subscriptions hold a long-lived
//! echo child per topic, one-shot reads and publishes run a child to
//! completion. Every failure degrades to "no data" or a transport error;
//! nothing here panics or retries.

pub mod echo;

use shared::bus::{
    BusError, BusResult, ImageCallback, ImageSource, JointStateSource, PositionCommandSink,
};
use shared::TopicSet;
use std::io::{BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

/// Bus access backed by `gz topic` subprocesses.
///
/// Holds the topic layout of one deployment and the spawned echo children;
/// dropping the transport kills them.
pub struct GzTransport {
    topics: TopicSet,
    gz_binary: String,
    subscribers: Vec<Child>,
}

impl GzTransport {
    /// Create a transport using the `gz` tool from `PATH`.
    pub fn new(topics: TopicSet) -> Self {
        Self::with_binary(topics, "gz")
    }

    /// Create a transport using a specific tool binary.
    pub fn with_binary(topics: TopicSet, gz_binary: impl Into<String>) -> Self {
        Self {
            topics,
            gz_binary: gz_binary.into(),
            subscribers: Vec::new(),
        }
    }

    /// Topic layout this transport talks to.
    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// Run a `gz` invocation to completion, bounded by `timeout`.
    ///
    /// The child is killed on timeout. Spawn failures and timeouts both
    /// yield `None`.
    fn capture_with_timeout(&self, args: &[&str], timeout: Duration) -> Option<String> {
        let mut child = match Command::new(&self.gz_binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("could not spawn {}: {e}", self.gz_binary);
                return None;
            }
        };
        let stdout = child.stdout.take()?;

        let (sender, receiver) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let mut output = String::new();
            let mut reader = BufReader::new(stdout);
            let _ = reader.read_to_string(&mut output);
            let _ = sender.send(output);
        });

        match receiver.recv_timeout(timeout) {
            Ok(output) => {
                let _ = child.wait();
                Some(output)
            }
            Err(_) => {
                log::warn!("gz read timed out after {timeout:?}");
                let _ = child.kill();
                let _ = child.wait();
                None
            }
        }
    }
}

impl ImageSource for GzTransport {
    fn subscribe_images(&mut self, topic: &str, callback: ImageCallback) -> BusResult<()> {
        let mut child = Command::new(&self.gz_binary)
            .args(["topic", "-e", "-t", topic])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                BusError::Transport(format!("spawning {} topic -e: {e}", self.gz_binary))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BusError::Transport("echo child has no stdout".to_string()))?;

        let topic_name = topic.to_string();
        thread::spawn(move || {
            echo::pump_image_stream(BufReader::new(stdout), &topic_name, &callback);
            log::debug!("echo stream for {topic_name} ended");
        });

        self.subscribers.push(child);
        Ok(())
    }
}

impl PositionCommandSink for GzTransport {
    fn publish_position(&self, topic: &str, radians: f64) -> BusResult<()> {
        let payload = format!("data: {radians}");
        let status = Command::new(&self.gz_binary)
            .args(["topic", "-t", topic, "-m", "gz.msgs.Double", "-p", payload.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| BusError::Transport(format!("running {}: {e}", self.gz_binary)))?;
        if status.success() {
            Ok(())
        } else {
            Err(BusError::Transport(format!(
                "gz topic publish exited with {status}"
            )))
        }
    }
}

impl JointStateSource for GzTransport {
    fn read_position(&self, joint: &str, timeout: Duration) -> Option<f64> {
        let topic = self.topics.joint_state();
        let output =
            self.capture_with_timeout(&["topic", "-e", "-t", topic.as_str(), "-n", "1"], timeout)?;
        echo::joint_position(&output, joint)
    }
}

impl Drop for GzTransport {
    fn drop(&mut self) {
        for child in &mut self.subscribers {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
