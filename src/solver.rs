// src/solver.rs - Seam to the external kinematic solver and its results
use crate::axis::Xyz;
use crate::bones::Side;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::landmarks::{EyeOpenness, Landmark};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Viseme weights keyed by vowel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MouthShape {
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "I")]
    pub i: f64,
    #[serde(rename = "E")]
    pub e: f64,
    #[serde(rename = "O")]
    pub o: f64,
    #[serde(rename = "U")]
    pub u: f64,
}

impl MouthShape {
    /// `(expression name, weight)` in the order the rig exposes them.
    pub fn expressions(&self) -> [(&'static str, f64); 5] {
        [
            ("aa", self.a),
            ("ih", self.i),
            ("ee", self.e),
            ("oh", self.o),
            ("ou", self.u),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceRig {
    #[serde(default)]
    pub mouth: MouthShape,
    /// The solver's own eye openness estimate.
    #[serde(default)]
    pub eye: Option<EyeOpenness>,
    pub head: Option<Xyz>,
}

/// Body channels keyed by solver name (`Spine`, `LeftUpperArm`, `RightHand`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseRig {
    pub channels: BTreeMap<String, Xyz>,
}

impl PoseRig {
    pub fn channel(&self, name: &str) -> Option<Xyz> {
        self.channels.get(name).copied()
    }
}

/// One hand: `{Side}Wrist` plus fifteen finger channels (`LeftRingProximal`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandRig {
    pub channels: BTreeMap<String, Xyz>,
}

impl HandRig {
    pub fn channel(&self, name: &str) -> Option<Xyz> {
        self.channels.get(name).copied()
    }
}

/// The latest result for one solver category.
///
/// A failed or missing solve keeps the last value but clears `valid`; the
/// engine only writes bones from valid fragments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment<T> {
    pub value: Option<T>,
    pub valid: bool,
    /// Landmark frame that produced `value`.
    pub frame: u64,
}

impl<T> Default for Fragment<T> {
    fn default() -> Self {
        Self {
            value: None,
            valid: false,
            frame: 0,
        }
    }
}

impl<T> Fragment<T> {
    pub fn store(&mut self, value: T, frame: u64) {
        self.value = Some(value);
        self.valid = true;
        self.frame = frame;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// The value, only while it may drive the rig.
    pub fn current(&self) -> Option<&T> {
        if self.valid {
            self.value.as_ref()
        } else {
            None
        }
    }
}

/// Everything solved so far, by category. Hand fragments are keyed by the
/// skeleton side they drive, after mirroring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolvedPose {
    pub face: Fragment<FaceRig>,
    pub pose: Fragment<PoseRig>,
    pub left_hand: Fragment<HandRig>,
    pub right_hand: Fragment<HandRig>,
    /// Eye openness measured from the raw face mesh.
    pub measured_eyes: Fragment<EyeOpenness>,
}

impl SolvedPose {
    pub fn hand(&self, side: Side) -> &Fragment<HandRig> {
        match side {
            Side::Left => &self.left_hand,
            Side::Right => &self.right_hand,
        }
    }

    pub fn hand_mut(&mut self, side: Side) -> &mut Fragment<HandRig> {
        match side {
            Side::Left => &mut self.left_hand,
            Side::Right => &mut self.right_hand,
        }
    }
}

/// The external solver. Every call may fail independently.
pub trait KinematicSolver {
    fn solve_face(&mut self, face: &[Landmark], config: &SolverConfig) -> Result<FaceRig, SolveError>;

    fn solve_pose(
        &mut self,
        world: &[Landmark],
        image: &[Landmark],
        config: &SolverConfig,
    ) -> Result<PoseRig, SolveError>;

    /// `side` is the anatomical side the result should be labelled with.
    fn solve_hand(&mut self, hand: &[Landmark], side: Side) -> Result<HandRig, SolveError>;
}
