// src/landmarks.rs - One landmark detector result
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub const HAND_LANDMARK_COUNT: usize = 21;
pub const FACE_MESH_MIN_LANDMARKS: usize = 468;

/// Eye contour rings on the face mesh, listed as alternating upper/lower lid
/// points so consecutive pairs span the eye vertically.
const LEFT_EYE_RING: [usize; 16] = [
    362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398,
];
const RIGHT_EYE_RING: [usize; 16] = [
    33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
];

/// Aspect ratio of a fully open eye.
const OPEN_EYE_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Everything the detector produced for one camera frame. Fields the detector
/// did not find are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkFrame {
    pub face_landmarks: Option<Vec<Landmark>>,
    pub pose_landmarks: Option<Vec<Landmark>>,
    pub pose_landmarks_3d: Option<Vec<Landmark>>,
    /// As labelled by the detector, which sees a mirrored image.
    pub left_hand_landmarks: Option<Vec<Landmark>>,
    pub right_hand_landmarks: Option<Vec<Landmark>>,
}

impl LandmarkFrame {
    /// Hand landmarks for a detector label, only when the full set is present.
    pub fn hand(&self, detector_left: bool) -> Option<&[Landmark]> {
        let hand = if detector_left {
            self.left_hand_landmarks.as_deref()
        } else {
            self.right_hand_landmarks.as_deref()
        };
        hand.filter(|lms| lms.len() >= HAND_LANDMARK_COUNT)
    }

    pub fn face(&self) -> Option<&[Landmark]> {
        self.face_landmarks.as_deref().filter(|lms| !lms.is_empty())
    }

    pub fn pose(&self) -> Option<&[Landmark]> {
        self.pose_landmarks.as_deref().filter(|lms| !lms.is_empty())
    }

    pub fn pose_3d(&self) -> Option<&[Landmark]> {
        self.pose_landmarks_3d.as_deref().filter(|lms| !lms.is_empty())
    }
}

/// Eye openness measured straight from the face mesh, 0 = closed, 1 = open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeOpenness {
    pub left: f64,
    pub right: f64,
}

impl EyeOpenness {
    /// `None` unless the full face mesh is available.
    pub fn measure(face: &[Landmark]) -> Option<Self> {
        if face.len() < FACE_MESH_MIN_LANDMARKS {
            return None;
        }
        Some(Self {
            left: openness(eye_aspect_ratio(face, &LEFT_EYE_RING)?),
            right: openness(eye_aspect_ratio(face, &RIGHT_EYE_RING)?),
        })
    }
}

fn openness(ratio: f64) -> f64 {
    (ratio / OPEN_EYE_RATIO).clamp(0.0, 1.0)
}

/// Mean lid-to-lid distance over eye width, in the image plane.
fn eye_aspect_ratio(face: &[Landmark], ring: &[usize]) -> Option<f64> {
    let planar = |a: &Landmark, b: &Landmark| ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();

    let vertical: Vec<f64> = ring
        .chunks_exact(2)
        .map(|pair| planar(&face[pair[0]], &face[pair[1]]))
        .collect();
    let width = planar(&face[ring[0]], &face[ring[ring.len() - 1]]);

    if width <= f64::EPSILON || vertical.is_empty() {
        return None;
    }
    let mean = vertical.iter().sum::<f64>() / vertical.len() as f64;
    Some(mean / width)
}
