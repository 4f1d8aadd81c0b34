// src/face.rs - Expression weights and head rotation
use crate::axis::{AxisCorrectionConfig, Xyz};
use crate::config::EngineSettings;
use crate::retarget::{clamp_factor, RetargetEngine};
use crate::skeleton::Skeleton;
use crate::solver::SolvedPose;
use serde::Serialize;
use tracing::trace;

pub const BLINK_LEFT: &str = "blinkLeft";
pub const BLINK_RIGHT: &str = "blinkRight";
const HEAD_BONE: &str = "neck";

/// What drove the face on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceOutcome {
    Tracked,
    AutoBlink,
    /// No valid face data; weights stay where they were.
    Frozen,
}

impl FaceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaceOutcome::Tracked => "tracked",
            FaceOutcome::AutoBlink => "auto_blink",
            FaceOutcome::Frozen => "frozen",
        }
    }
}

#[derive(Debug, Default)]
pub struct FaceExpressionDriver {
    clock: f64,
}

impl FaceExpressionDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.clock = 0.0;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        skeleton: &mut Skeleton,
        axes: &AxisCorrectionConfig,
        engine: &mut RetargetEngine,
        solved: &SolvedPose,
        camera_active: bool,
        delta: f64,
        settings: &EngineSettings,
    ) -> FaceOutcome {
        self.clock += delta.max(0.0);
        let factor = clamp_factor(delta * settings.expression_rate);

        let Some(face) = solved.face.current() else {
            if !camera_active && settings.auto_blink {
                // Eyes shut for the top slice of each sine period
                let closed = if (self.clock * 3.0).sin() > 0.8 { 1.0 } else { 0.0 };
                lerp_expression(skeleton, BLINK_LEFT, closed, factor);
                lerp_expression(skeleton, BLINK_RIGHT, closed, factor);
                return FaceOutcome::AutoBlink;
            }
            return FaceOutcome::Frozen;
        };

        for (name, weight) in face.mouth.expressions() {
            lerp_expression(skeleton, name, weight, factor);
        }

        // Measured openness is steadier than the solver's estimate
        let eyes = solved.measured_eyes.current().copied().or(face.eye);
        if let Some(eyes) = eyes {
            lerp_expression(skeleton, BLINK_LEFT, 1.0 - eyes.left, factor);
            lerp_expression(skeleton, BLINK_RIGHT, 1.0 - eyes.right, factor);
        }

        if let Some(head) = face.head.as_ref() {
            let result = engine.apply_channel(
                skeleton,
                axes,
                HEAD_BONE,
                Some(head),
                delta * settings.bone_rate,
                &Xyz::splat(settings.neck_damping),
            );
            if let Err(e) = result {
                trace!("head rotation skipped: {}", e);
            }
        }

        FaceOutcome::Tracked
    }
}

/// A non-finite target counts as 0 so one bad solve cannot poison the weight.
fn lerp_expression(skeleton: &mut Skeleton, name: &str, target: f64, factor: f64) {
    let target = if target.is_finite() { target } else { 0.0 };
    let current = skeleton.expression(name);
    skeleton.set_expression(name, current + (target - current) * factor);
}
