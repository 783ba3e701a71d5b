//! Latest-value aggregation of the four quadrant luminances.
//!
//! One asynchronous producer callback per quadrant writes into a shared
//! four-slot map; the control tick reads a copy. A single lock covers both
//! paths. Each channel is independently latest-known: per-channel updates
//! are atomic, but there is no cross-channel synchronization instant.

use shared::bus::{BusResult, ImageSource};
use shared::photometry::{mean_luminance, CaptureRegion};
use shared::{ImageFrame, Quadrant, TopicSet};
use std::sync::{Arc, Mutex};

/// Most recent luminance per quadrant; `None` until the first complete
/// frame arrives on that channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuadSnapshot {
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
    pub q4: Option<f64>,
}

impl QuadSnapshot {
    /// Value for one quadrant.
    pub fn get(&self, quadrant: Quadrant) -> Option<f64> {
        match quadrant {
            Quadrant::Q1 => self.q1,
            Quadrant::Q2 => self.q2,
            Quadrant::Q3 => self.q3,
            Quadrant::Q4 => self.q4,
        }
    }

    fn set(&mut self, quadrant: Quadrant, value: f64) {
        match quadrant {
            Quadrant::Q1 => self.q1 = Some(value),
            Quadrant::Q2 => self.q2 = Some(value),
            Quadrant::Q3 => self.q3 = Some(value),
            Quadrant::Q4 => self.q4 = Some(value),
        }
    }

    /// All four values, or `None` while any channel is still absent.
    pub fn complete(&self) -> Option<QuadReading> {
        Some(QuadReading {
            q1: self.q1?,
            q2: self.q2?,
            q3: self.q3?,
            q4: self.q4?,
        })
    }
}

/// A snapshot with every quadrant reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadReading {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

/// Thread-safe latest-value store for the quadrant photodiodes.
///
/// Clones share state, so the same reader can be handed to the transport
/// callbacks and the control loop.
#[derive(Clone, Default)]
pub struct QuadrantReader {
    values: Arc<Mutex<QuadSnapshot>>,
    region: CaptureRegion,
}

impl QuadrantReader {
    /// Create an empty reader averaging over `region` of each frame.
    pub fn new(region: CaptureRegion) -> Self {
        Self {
            values: Arc::new(Mutex::new(QuadSnapshot::default())),
            region,
        }
    }

    /// Subscribe one update callback per quadrant on `source`.
    ///
    /// # Errors
    /// Returns the first subscription error; earlier subscriptions stay in
    /// place.
    pub fn attach<S: ImageSource + ?Sized>(
        &self,
        source: &mut S,
        topics: &TopicSet,
    ) -> BusResult<()> {
        for quadrant in Quadrant::ALL {
            let reader = self.clone();
            source.subscribe_images(
                &topics.image(quadrant),
                Arc::new(move |frame: &ImageFrame| reader.update(quadrant, frame)),
            )?;
        }
        Ok(())
    }

    /// Decode `frame` and replace the stored value for `quadrant`.
    ///
    /// Truncated frames are dropped and the previous value stays in effect.
    pub fn update(&self, quadrant: Quadrant, frame: &ImageFrame) {
        let Some(luminance) = mean_luminance(frame, self.region) else {
            log::debug!(
                "{quadrant}: dropped frame ({} of {} bytes)",
                frame.data.len(),
                frame.expected_len()
            );
            return;
        };
        self.values.lock().unwrap().set(quadrant, luminance);
    }

    /// Copy of the four most-recent values as of call time.
    pub fn snapshot(&self) -> QuadSnapshot {
        *self.values.lock().unwrap()
    }
}
