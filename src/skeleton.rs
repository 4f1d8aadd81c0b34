// src/skeleton.rs
use crate::bones::humanoid_bones;
use nalgebra::UnitQuaternion;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Bone {
    pub parent: Option<String>,
    /// Local rotation relative to the parent. The renderer resolves world
    /// transforms itself.
    pub rotation: UnitQuaternion<f64>,
}

/// The active rig: named bones plus expression (blend shape) weights.
#[derive(Debug, Clone)]
pub struct Skeleton {
    id: Uuid,
    bones: HashMap<String, Bone>,
    expressions: HashMap<String, f64>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            bones: HashMap::new(),
            expressions: HashMap::new(),
        }
    }

    /// Standard humanoid bone set at rest.
    pub fn humanoid() -> Self {
        let mut skeleton = Self::new();
        for (name, parent) in humanoid_bones() {
            skeleton.add_bone(&name, parent.as_deref());
        }
        skeleton
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn add_bone(&mut self, name: &str, parent: Option<&str>) {
        self.bones.insert(
            name.to_string(),
            Bone {
                parent: parent.map(str::to_string),
                rotation: UnitQuaternion::identity(),
            },
        );
    }

    pub fn has_bone(&self, name: &str) -> bool {
        self.bones.contains_key(name)
    }

    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.bones.get(name)
    }

    pub(crate) fn bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        self.bones.get_mut(name)
    }

    /// Hard-sets a local rotation. Returns false when the bone does not exist.
    pub fn set_rotation(&mut self, name: &str, rotation: UnitQuaternion<f64>) -> bool {
        match self.bones.get_mut(name) {
            Some(bone) => {
                bone.rotation = rotation;
                true
            }
            None => false,
        }
    }

    pub fn rotation(&self, name: &str) -> Option<UnitQuaternion<f64>> {
        self.bones.get(name).map(|b| b.rotation)
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn expression(&self, name: &str) -> f64 {
        self.expressions.get(name).copied().unwrap_or(0.0)
    }

    pub fn set_expression(&mut self, name: &str, weight: f64) {
        self.expressions
            .insert(name.to_string(), weight.clamp(0.0, 1.0));
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}
