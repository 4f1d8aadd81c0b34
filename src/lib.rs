// src/lib.rs
pub mod app;
pub mod axis;
pub mod bones;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod face;
pub mod idle;
pub mod landmarks;
pub mod mode;
pub mod replay;
pub mod retarget;
pub mod skeleton;
pub mod solver;
pub mod storage;
pub mod tracking;

pub use app::{RigSession, TickReport};
pub use axis::{AxisCorrectionConfig, Xyz};
pub use config::{EngineSettings, SensitivitySettings, SkeletonProfile, SolverConfig};
pub use error::{RigError, SolveCategory, SolveError};
pub use landmarks::{Landmark, LandmarkFrame};
pub use mode::AnimationMode;
pub use retarget::RetargetEngine;
pub use skeleton::Skeleton;
pub use solver::{KinematicSolver, SolvedPose};
