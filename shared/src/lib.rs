//! Shared types and transport seams for the dish tracking system.
//!
//! Everything here is a leaf: raw camera frames, quadrant identifiers,
//! luminance photometry, topic naming, and the narrow bus traits the control
//! core talks through. The physics simulator itself is an external
//! collaborator reached only over its publish/subscribe topics.

pub mod bus;
pub mod frame;
pub mod photometry;
pub mod quadrant;
pub mod topics;

pub use frame::ImageFrame;
pub use quadrant::Quadrant;
pub use topics::TopicSet;
