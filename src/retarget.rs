// src/retarget.rs - Solved rotations onto skeleton bones
use crate::axis::{AxisCorrectionConfig, Xyz};
use crate::bones::{axis_key, is_protected, map_bone_name, Side, FINGER_SEGMENTS};
use crate::config::{EngineSettings, SensitivitySettings, SkeletonProfile};
use crate::error::{Result, RigError};
use crate::skeleton::Skeleton;
use crate::solver::SolvedPose;
use crate::tracking::HandDetectionState;
use nalgebra::{UnitQuaternion, Vector3};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::{trace, warn};

/// Euler angles (radians) applied X then Y then Z about the local axes.
pub fn euler_to_quaternion(euler: &Xyz) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), euler.x)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), euler.y)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), euler.z)
}

/// `rotation ⊙ axis(bone) ⊙ flip`, before conversion to a quaternion.
pub fn target_rotation(axes: &AxisCorrectionConfig, bone_id: &str, rotation: &Xyz, flip: &Xyz) -> Xyz {
    rotation.scaled(&axes.get(axis_key(bone_id))).scaled(flip)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Torso,
    Arm,
    Hand,
    Finger,
}

/// Reorders/negates solver axes to match a skeleton's local axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRemap {
    Identity,
    /// `(-x, -z, y)`
    FingerCurl,
    /// `(x, -z, y)`
    SwapYz,
}

impl AxisRemap {
    pub fn apply(self, v: &Xyz) -> Xyz {
        match self {
            AxisRemap::Identity => *v,
            AxisRemap::FingerCurl => Xyz::new(-v.x, -v.z, v.y),
            AxisRemap::SwapYz => Xyz::new(v.x, -v.z, v.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSource {
    /// Named channel of the pose fragment.
    Pose,
    /// Named channel of one hand fragment.
    Hand(Side),
    /// Hand wrist channel, only alongside the pose's `{Side}Hand` channel.
    /// With `pose_z` the pose supplies the Z component.
    Wrist {
        side: Side,
        pose_channel: String,
        pose_z: bool,
    },
}

impl ChannelSource {
    /// `None` when a fragment this source needs is not valid. `Some(None)`
    /// when the fragments are there but the channel is not.
    fn resolve(&self, channel: &str, solved: &SolvedPose) -> Option<Option<Xyz>> {
        match self {
            ChannelSource::Pose => solved.pose.current().map(|p| p.channel(channel)),
            ChannelSource::Hand(side) => solved.hand(*side).current().map(|h| h.channel(channel)),
            ChannelSource::Wrist {
                side,
                pose_channel,
                pose_z,
            } => {
                let hand = solved.hand(*side).current()?;
                let pose = solved.pose.current()?;
                Some(match (hand.channel(channel), pose.channel(pose_channel)) {
                    (Some(wrist), Some(anchor)) if *pose_z => Some(Xyz::new(wrist.x, wrist.y, anchor.z)),
                    (Some(wrist), Some(_)) => Some(wrist),
                    _ => None,
                })
            }
        }
    }
}

/// One row of the retargeting table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub channel: String,
    pub source: ChannelSource,
    pub bone: String,
    pub region: Region,
    pub remap: AxisRemap,
    /// Only driven while this side's hand is tracked.
    pub gate: Option<Side>,
    /// Scaled by the region's amplitude setting.
    pub amplified: bool,
}

struct ProfileRules {
    torso_bones: &'static [&'static str],
    arm_remap: AxisRemap,
    wrist_remap: AxisRemap,
    finger_remap: AxisRemap,
    wrist_pose_z: bool,
    gate_arms: bool,
    amplify_limbs: bool,
}

impl ProfileRules {
    fn for_profile(profile: SkeletonProfile) -> Self {
        match profile {
            SkeletonProfile::Normalized => Self {
                torso_bones: &["Spine"],
                arm_remap: AxisRemap::Identity,
                wrist_remap: AxisRemap::Identity,
                finger_remap: AxisRemap::FingerCurl,
                wrist_pose_z: true,
                gate_arms: false,
                amplify_limbs: false,
            },
            SkeletonProfile::Legacy => Self {
                torso_bones: &["Chest", "Spine"],
                arm_remap: AxisRemap::SwapYz,
                wrist_remap: AxisRemap::SwapYz,
                finger_remap: AxisRemap::SwapYz,
                wrist_pose_z: false,
                gate_arms: true,
                amplify_limbs: true,
            },
        }
    }
}

fn build_channel_table(profile: SkeletonProfile) -> Vec<ChannelSpec> {
    let rules = ProfileRules::for_profile(profile);
    let mut table = Vec::new();

    // The torso bones all follow the solver's single spine estimate
    for bone in rules.torso_bones {
        table.push(ChannelSpec {
            channel: "Spine".to_string(),
            source: ChannelSource::Pose,
            bone: map_bone_name(bone).to_string(),
            region: Region::Torso,
            remap: AxisRemap::Identity,
            gate: None,
            amplified: false,
        });
    }

    for side in [Side::Left, Side::Right] {
        let (ch, bn) = (side.channel_prefix(), side.bone_prefix());

        for segment in ["UpperArm", "LowerArm"] {
            let channel = format!("{}{}", ch, segment);
            table.push(ChannelSpec {
                bone: map_bone_name(&channel).to_string(),
                channel,
                source: ChannelSource::Pose,
                region: Region::Arm,
                remap: rules.arm_remap,
                gate: rules.gate_arms.then_some(side),
                amplified: rules.amplify_limbs,
            });
        }

        let wrist = format!("{}Wrist", ch);
        table.push(ChannelSpec {
            bone: map_bone_name(&wrist).to_string(),
            channel: wrist,
            source: ChannelSource::Wrist {
                side,
                pose_channel: format!("{}Hand", ch),
                pose_z: rules.wrist_pose_z,
            },
            region: Region::Hand,
            remap: rules.wrist_remap,
            gate: Some(side),
            amplified: rules.amplify_limbs,
        });

        for (solver_segment, bone_segment) in FINGER_SEGMENTS {
            table.push(ChannelSpec {
                channel: format!("{}{}", ch, solver_segment),
                source: ChannelSource::Hand(side),
                bone: format!("{}{}", bn, bone_segment),
                region: Region::Finger,
                remap: rules.finger_remap,
                gate: Some(side),
                amplified: rules.amplify_limbs,
            });
        }
    }

    table
}

static NORMALIZED_CHANNELS: Lazy<Vec<ChannelSpec>> =
    Lazy::new(|| build_channel_table(SkeletonProfile::Normalized));
static LEGACY_CHANNELS: Lazy<Vec<ChannelSpec>> = Lazy::new(|| build_channel_table(SkeletonProfile::Legacy));

pub fn channel_table(profile: SkeletonProfile) -> &'static [ChannelSpec] {
    match profile {
        SkeletonProfile::Normalized => &NORMALIZED_CHANNELS,
        SkeletonProfile::Legacy => &LEGACY_CHANNELS,
    }
}

/// Slerp factors for one tick, per region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendFactors {
    pub torso: f64,
    pub arm: f64,
    pub hand: f64,
    pub finger: f64,
    pub torso_damping: f64,
    pub arm_amplitude: f64,
    pub hand_amplitude: f64,
    pub finger_amplitude: f64,
}

impl BlendFactors {
    pub fn new(delta: f64, settings: &EngineSettings, sensitivity: &SensitivitySettings) -> Self {
        let base = delta * settings.bone_rate;
        Self {
            torso: clamp_factor(base),
            arm: clamp_factor(base * sensitivity.arm_speed),
            hand: clamp_factor(base * sensitivity.hand_speed),
            finger: clamp_factor(base * sensitivity.finger_speed),
            torso_damping: settings.torso_damping,
            arm_amplitude: sensitivity.arm_amplitude,
            hand_amplitude: sensitivity.hand_amplitude,
            finger_amplitude: sensitivity.finger_amplitude,
        }
    }

    pub fn for_region(&self, region: Region) -> f64 {
        match region {
            Region::Torso => self.torso,
            Region::Arm => self.arm,
            Region::Hand => self.hand,
            Region::Finger => self.finger,
        }
    }

    pub fn amplitude_for(&self, region: Region) -> f64 {
        match region {
            Region::Torso => 1.0,
            Region::Arm => self.arm_amplitude,
            Region::Hand => self.hand_amplitude,
            Region::Finger => self.finger_amplitude,
        }
    }
}

/// NaN collapses to 0 so a bad delta never writes.
pub fn clamp_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Blends solved rotations into skeleton bones.
///
/// Bad channels are absorbed per call: each missing bone or rotation is
/// warned about once per bone id and problem until `reset`.
#[derive(Debug)]
pub struct RetargetEngine {
    profile: SkeletonProfile,
    warned: HashSet<(String, &'static str)>,
}

impl RetargetEngine {
    pub fn new(profile: SkeletonProfile) -> Self {
        Self {
            profile,
            warned: HashSet::new(),
        }
    }

    pub fn profile(&self) -> SkeletonProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: SkeletonProfile) {
        self.profile = profile;
        self.reset();
    }

    /// Forgets per-bone state (for a new skeleton).
    pub fn reset(&mut self) {
        self.warned.clear();
    }

    pub fn warning_count(&self) -> usize {
        self.warned.len()
    }

    /// Slerps `bone_id` toward `rotation ⊙ axis ⊙ flip` by `factor`.
    ///
    /// A factor of 0 (or less) leaves the bone alone and 1 sets it exactly.
    /// The protected root is always rejected.
    pub fn apply_channel(
        &mut self,
        skeleton: &mut Skeleton,
        axes: &AxisCorrectionConfig,
        bone_id: &str,
        rotation: Option<&Xyz>,
        factor: f64,
        flip: &Xyz,
    ) -> Result<()> {
        if is_protected(bone_id) {
            return Err(RigError::ProtectedBone(bone_id.to_string()));
        }

        let Some(rotation) = rotation.filter(|r| r.is_finite()) else {
            self.warn_once(bone_id, "no usable rotation");
            return Err(RigError::MissingRotation(bone_id.to_string()));
        };

        let target = euler_to_quaternion(&target_rotation(axes, bone_id, rotation, flip));
        let Some(bone) = skeleton.bone_mut(bone_id) else {
            self.warn_once(bone_id, "not on this skeleton");
            return Err(RigError::MissingBone(bone_id.to_string()));
        };

        let factor = clamp_factor(factor);
        if factor <= 0.0 {
            return Ok(());
        }
        if factor >= 1.0 {
            bone.rotation = target;
        } else if let Some(blended) = bone.rotation.try_slerp(&target, factor, 1.0e-9) {
            bone.rotation = blended;
        }
        Ok(())
    }

    /// Drives torso, arms, wrists and fingers from valid fragments.
    /// Returns how many bones were driven.
    pub fn drive_body(
        &mut self,
        skeleton: &mut Skeleton,
        axes: &AxisCorrectionConfig,
        solved: &SolvedPose,
        hands: &HandDetectionState,
        blend: &BlendFactors,
    ) -> usize {
        let torso_flip = Xyz::splat(blend.torso_damping);
        let mut driven = 0;

        for spec in channel_table(self.profile) {
            if spec.gate.is_some_and(|side| !hands.is_tracked(side)) {
                continue;
            }
            // Invalid fragment: the bone keeps its last pose
            let Some(raw) = spec.source.resolve(&spec.channel, solved) else {
                continue;
            };

            let mut rotation = raw.map(|r| spec.remap.apply(&r));
            if spec.amplified {
                let amplitude = Xyz::splat(blend.amplitude_for(spec.region));
                rotation = rotation.map(|r| r.scaled(&amplitude));
            }
            let flip = if spec.region == Region::Torso {
                torso_flip
            } else {
                Xyz::ONE
            };

            match self.apply_channel(
                skeleton,
                axes,
                &spec.bone,
                rotation.as_ref(),
                blend.for_region(spec.region),
                &flip,
            ) {
                Ok(()) => driven += 1,
                Err(e) => trace!("skipped {}: {}", spec.channel, e),
            }
        }

        driven
    }

    fn warn_once(&mut self, bone_id: &str, what: &'static str) {
        if self.warned.insert((bone_id.to_string(), what)) {
            warn!("bone '{}': {}, skipping", bone_id, what);
        }
    }
}
