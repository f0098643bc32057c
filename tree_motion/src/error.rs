use thiserror::Error;

/// Contract violations at the engine's construction boundaries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MotionError {
    /// A hand observation did not carry the fixed landmark count.
    #[error("expected {expected} hand landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    /// A supplied formation does not match the group's particle count.
    #[error("formation holds {actual} particles but the group needs {expected}")]
    FormationMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, MotionError>;
