// src/error.rs
use std::fmt;
use thiserror::Error;

/// Solver input categories. Each one is solved, stored and invalidated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveCategory {
    Face,
    Pose,
    LeftHand,
    RightHand,
}

impl SolveCategory {
    pub const ALL: [SolveCategory; 4] = [
        SolveCategory::Face,
        SolveCategory::Pose,
        SolveCategory::LeftHand,
        SolveCategory::RightHand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SolveCategory::Face => "face",
            SolveCategory::Pose => "pose",
            SolveCategory::LeftHand => "left_hand",
            SolveCategory::RightHand => "right_hand",
        }
    }
}

impl fmt::Display for SolveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised by a kinematic solver for one category of one frame.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SolveError(pub String);

impl SolveError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum RigError {
    #[error("{category} solve failed: {reason}")]
    Solve {
        category: SolveCategory,
        reason: String,
    },

    #[error("no {category} landmarks this frame")]
    StaleFrame { category: SolveCategory },

    #[error("bone '{0}' is not present on the active skeleton")]
    MissingBone(String),

    #[error("no rotation supplied for bone '{0}'")]
    MissingRotation(String),

    #[error("bone '{0}' is protected and cannot be retargeted")]
    ProtectedBone(String),

    #[error("stored axis configuration is corrupt: {0}")]
    ConfigCorruption(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, RigError>;
