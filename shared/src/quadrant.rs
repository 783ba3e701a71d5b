//! Quadrant photodiode identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four luminance sensors arranged symmetrically around the dish
/// boresight.
///
/// The quadrants are fixed by the plate model: Q1/Q2 sit across the
/// elevation axis, Q1/Q4 across the azimuth axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quadrant {
    /// All quadrants in index order.
    pub const ALL: [Quadrant; 4] = [Quadrant::Q1, Quadrant::Q2, Quadrant::Q3, Quadrant::Q4];

    /// Camera name used in the simulator's topic layout (`cam_q1`..`cam_q4`).
    pub fn camera_name(&self) -> &'static str {
        match self {
            Quadrant::Q1 => "cam_q1",
            Quadrant::Q2 => "cam_q2",
            Quadrant::Q3 => "cam_q3",
            Quadrant::Q4 => "cam_q4",
        }
    }

    /// Stable index in 0..4, matching `ALL` ordering.
    pub fn index(&self) -> usize {
        match self {
            Quadrant::Q1 => 0,
            Quadrant::Q2 => 1,
            Quadrant::Q3 => 2,
            Quadrant::Q4 => 3,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Quadrant::Q1 => write!(f, "Q1"),
            Quadrant::Q2 => write!(f, "Q2"),
            Quadrant::Q3 => write!(f, "Q3"),
            Quadrant::Q4 => write!(f, "Q4"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_all_ordering() {
        for (i, q) in Quadrant::ALL.iter().enumerate() {
            assert_eq!(q.index(), i);
        }
    }

    #[test]
    fn camera_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            Quadrant::ALL.iter().map(|q| q.camera_name()).collect();
        assert_eq!(names.len(), 4);
    }
}
