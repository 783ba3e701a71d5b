use thiserror::Error;

/// Errors produced by the tracking controller.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The one-shot position read failed for a joint. Tracking did not
    /// start and no state was committed.
    #[error("could not read initial position of {joint}")]
    BaselineUnavailable {
        /// Joint whose read timed out or returned nothing usable.
        joint: String,
    },

    /// Configuration validation failure.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
