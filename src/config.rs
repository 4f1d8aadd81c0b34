// src/config.rs
use serde::{Deserialize, Serialize};

/// Skeleton conventions the engine knows how to drive.
///
/// `Normalized` rigs take solver rotations on their native axes with a tuned
/// sign table; `Legacy` rigs need the solver's Y and Z swapped instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonProfile {
    #[default]
    Normalized,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub profile: SkeletonProfile,
    /// Expression weights move `delta * expression_rate` of the way per tick.
    pub expression_rate: f64,
    /// Base bone blend rate; multiplied by the region speed.
    pub bone_rate: f64,
    /// Spine and chest follow the noisy torso estimate at 30%.
    pub torso_damping: f64,
    pub neck_damping: f64,
    /// Blink when the camera is off and no face data exists.
    pub auto_blink: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            profile: SkeletonProfile::Normalized,
            expression_rate: 12.0,
            bone_rate: 4.0,  // 8 was too jittery
            torso_damping: 0.3,
            neck_damping: 0.7,
            auto_blink: true,
        }
    }
}

/// Per-region speed and amplitude multipliers, adjustable and persisted by
/// the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivitySettings {
    pub arm_speed: f64,
    pub hand_speed: f64,
    pub finger_speed: f64,
    /// Rotation scale for legacy rigs, which under-rotate at 1.0.
    pub arm_amplitude: f64,
    pub hand_amplitude: f64,
    pub finger_amplitude: f64,
    /// Not read here. Stored for the host, which hands them to its landmark
    /// detector.
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
}

impl Default for SensitivitySettings {
    fn default() -> Self {
        Self {
            arm_speed: 1.0,
            hand_speed: 1.0,
            finger_speed: 1.0,
            arm_amplitude: 1.3,
            hand_amplitude: 1.2,
            finger_amplitude: 1.2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Minimal configuration handed to every solver call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub image_width: u32,
    pub image_height: u32,
    pub smooth_blink: bool,
    /// Eye openness thresholds `[closed, open]`.
    pub blink_settings: [f64; 2],
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            image_width: 640,
            image_height: 480,
            smooth_blink: false,
            blink_settings: [0.25, 0.75],
        }
    }
}
