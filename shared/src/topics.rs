//! Topic naming for one deployment of the tracker plate model.

use crate::quadrant::Quadrant;
use serde::{Deserialize, Serialize};

/// Names of the simulator entities the tracker talks to.
///
/// Defaults match the shipped Gazebo world: four `plate/cam_q*/image` topics,
/// `cmd_pos` topics under the three-link model, and the world-scoped
/// `joint_state` feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSet {
    /// Prefix of the quadrant camera topics (`<prefix>/cam_q1/image`, ...)
    pub image_prefix: String,
    /// Model name carrying the azimuth and elevation joints
    pub model: String,
    /// World name scoping the joint-state topic
    pub world: String,
}

impl Default for TopicSet {
    fn default() -> Self {
        Self {
            image_prefix: "plate".to_string(),
            model: "three_link_model".to_string(),
            world: "three_link_with_tracker_plate_world".to_string(),
        }
    }
}

impl TopicSet {
    /// Image topic for one quadrant camera.
    pub fn image(&self, quadrant: Quadrant) -> String {
        format!("{}/{}/image", self.image_prefix, quadrant.camera_name())
    }

    /// Absolute position-command topic for a named joint.
    pub fn position_command(&self, joint: &str) -> String {
        format!("/model/{}/joint/{}/cmd_pos", self.model, joint)
    }

    /// Live joint-state topic for the whole model.
    pub fn joint_state(&self) -> String {
        format!("/world/{}/model/{}/joint_state", self.world, self.model)
    }
}
