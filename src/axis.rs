// src/axis.rs - Per-bone axis sign/scale correction
use crate::bones::{Side, FINGER_SEGMENTS};
use crate::config::SkeletonProfile;
use crate::error::{Result, RigError};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An `{x, y, z}` triple. Used both for solver Euler rotations (radians) and
/// for per-axis multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    pub const ONE: Xyz = Xyz { x: 1.0, y: 1.0, z: 1.0 };
    pub const ZERO: Xyz = Xyz { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Component-wise product.
    pub fn scaled(&self, by: &Xyz) -> Xyz {
        Xyz::from(self.to_vector().component_mul(&by.to_vector()))
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vector3<f64>> for Xyz {
    fn from(v: Vector3<f64>) -> Self {
        Xyz::new(v.x, v.y, v.z)
    }
}

impl Default for Xyz {
    fn default() -> Self {
        Xyz::ZERO
    }
}

/// Finger multiplier that ships with the normalized profile.
pub const DEFAULT_FINGER_AXIS: Xyz = Xyz::new(-1.0, -1.0, 1.0);

/// Mutable map of axis key -> multiplier. Keys are usually bone ids; the
/// upper arms use `leftArm` / `rightArm` (see `bones::axis_key`).
///
/// Reads go straight to the map, so a `set` is visible on the next frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxisCorrectionConfig {
    entries: BTreeMap<String, Xyz>,
}

impl AxisCorrectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_profile(profile: SkeletonProfile) -> Self {
        let mut config = Self::new();
        match profile {
            SkeletonProfile::Normalized => {
                config.set("leftArm", Xyz::new(1.0, 1.0, 1.0));
                config.set("rightArm", Xyz::new(-1.0, 1.0, 1.0));
                config.set("leftHand", Xyz::new(1.0, 1.0, -1.0));
                config.set("rightHand", Xyz::new(-1.0, 1.0, -1.0));
                config.set("neck", Xyz::new(-1.0, 1.0, -1.0));
                for side in [Side::Left, Side::Right] {
                    for (_, segment) in FINGER_SEGMENTS {
                        config.set(
                            &format!("{}{}", side.bone_prefix(), segment),
                            DEFAULT_FINGER_AXIS,
                        );
                    }
                }
            }
            // The legacy rig swizzles axes in the channel table instead.
            SkeletonProfile::Legacy => {}
        }
        config
    }

    pub fn get(&self, key: &str) -> Xyz {
        self.entries.get(key).copied().unwrap_or(Xyz::ONE)
    }

    pub fn set(&mut self, key: &str, value: Xyz) {
        self.entries.insert(key.to_string(), value);
    }

    /// Sets one component; `axis` is `'x'`, `'y'` or `'z'`.
    pub fn set_component(&mut self, key: &str, axis: char, value: f64) -> bool {
        let mut current = self.get(key);
        match axis {
            'x' => current.x = value,
            'y' => current.y = value,
            'z' => current.z = value,
            _ => return false,
        }
        self.set(key, current);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<Xyz> {
        self.entries.remove(key)
    }

    pub fn reset_to_default(&mut self, profile: SkeletonProfile) {
        *self = Self::for_profile(profile);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Xyz)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flat `{ "leftArm": {"x":1,"y":1,"z":1}, ... }` JSON.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replaces the whole mapping. Rejects anything that is not a flat map of
    /// finite triples; the current mapping is left untouched on error.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let imported: AxisCorrectionConfig = serde_json::from_str(json)
            .map_err(|e| RigError::ConfigCorruption(e.to_string()))?;

        if let Some((key, _)) = imported.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RigError::ConfigCorruption(format!(
                "non-finite multiplier for '{}'",
                key
            )));
        }

        *self = imported;
        Ok(())
    }
}
