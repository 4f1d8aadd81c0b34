// src/idle.rs - Baseline clip played while no hands are tracked
use crate::bones::{clip_bone, is_protected};
use crate::config::SkeletonProfile;
use crate::skeleton::Skeleton;
use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A keyframe track as authored, named after the source rig's node
/// (`mixamorigLeftArm.quaternion`). Quaternion values are flat `x, y, z, w`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTrack {
    pub name: String,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceClip {
    pub name: String,
    pub duration: f64,
    pub tracks: Vec<SourceTrack>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotationTrack {
    pub bone: String,
    times: Vec<f64>,
    values: Vec<UnitQuaternion<f64>>,
}

impl RotationTrack {
    pub fn new(bone: &str, keys: Vec<(f64, UnitQuaternion<f64>)>) -> Self {
        let (times, values) = keys.into_iter().unzip();
        Self {
            bone: bone.to_string(),
            times,
            values,
        }
    }

    /// Rotation at `time`, slerping between the surrounding keys and holding
    /// the first/last key outside the keyed range.
    pub fn sample(&self, time: f64) -> Option<UnitQuaternion<f64>> {
        let (first, last) = (self.values.first()?, self.values.last()?);
        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            return Some(*first);
        }
        if next >= self.times.len() {
            return Some(*last);
        }

        let (t0, t1) = (self.times[next - 1], self.times[next]);
        let (q0, q1) = (&self.values[next - 1], &self.values[next]);
        let span = t1 - t0;
        if span <= f64::EPSILON {
            return Some(*q1);
        }
        let t = (time - t0) / span;
        Some(q0.try_slerp(q1, t, 1.0e-9).unwrap_or(*q0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdleClip {
    pub name: String,
    pub duration: f64,
    pub tracks: Vec<RotationTrack>,
}

impl IdleClip {
    /// Remaps authored tracks onto humanoid bone ids. Tracks for unknown
    /// nodes and non-rotation tracks are dropped; returns `None` when nothing
    /// maps. Legacy rigs face the other way, so their X and Z flip.
    pub fn from_source(source: &SourceClip, profile: SkeletonProfile) -> Option<Self> {
        let mut tracks = Vec::new();

        for track in &source.tracks {
            let mut parts = track.name.splitn(2, '.');
            let node = parts.next().unwrap_or_default();
            let property = parts.next().unwrap_or("quaternion");
            if property != "quaternion" {
                continue;
            }
            let Some(bone) = clip_bone(node) else {
                continue;
            };
            if track.values.len() != track.times.len() * 4 {
                warn!(
                    "clip track '{}' has {} values for {} keys, dropping",
                    track.name,
                    track.values.len(),
                    track.times.len()
                );
                continue;
            }
            if !track.values.chunks_exact(4).all(is_rotation) {
                warn!("clip track '{}' has a degenerate or non-finite key, dropping", track.name);
                continue;
            }

            let keys = track
                .times
                .iter()
                .zip(track.values.chunks_exact(4))
                .map(|(&t, v)| {
                    let (x, z) = match profile {
                        SkeletonProfile::Legacy => (-v[0], -v[2]),
                        SkeletonProfile::Normalized => (v[0], v[2]),
                    };
                    (t, UnitQuaternion::from_quaternion(Quaternion::new(v[3], x, v[1], z)))
                })
                .collect();
            tracks.push(RotationTrack::new(bone, keys));
        }

        if tracks.is_empty() {
            warn!("clip '{}' has no tracks for humanoid bones", source.name);
            return None;
        }
        debug!("clip '{}' mapped {} of {} tracks", source.name, tracks.len(), source.tracks.len());
        Some(Self {
            name: source.name.clone(),
            duration: source.duration,
            tracks,
        })
    }
}

/// Flat `x, y, z, w` values that normalize to a real rotation.
fn is_rotation(v: &[f64]) -> bool {
    v.iter().all(|c| c.is_finite()) && Quaternion::new(v[3], v[0], v[1], v[2]).norm() > 1.0e-9
}

/// Plays one looping clip into the skeleton.
#[derive(Debug)]
pub struct IdleAnimationPlayer {
    clip: Option<IdleClip>,
    time: f64,
    playing: bool,
}

impl Default for IdleAnimationPlayer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl IdleAnimationPlayer {
    pub fn new(clip: Option<IdleClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            playing: true,
        }
    }

    pub fn set_clip(&mut self, clip: Option<IdleClip>) {
        self.clip = clip;
        self.time = 0.0;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Restart from the top.
    pub fn play(&mut self) {
        self.time = 0.0;
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.time = 0.0;
        self.playing = false;
    }

    /// Advances by `delta` seconds, wrapping at the clip's end.
    pub fn advance(&mut self, delta: f64) {
        if !self.playing || !delta.is_finite() || delta <= 0.0 {
            return;
        }
        let duration = self.clip.as_ref().map_or(0.0, |c| c.duration);
        self.time += delta;
        if duration > 0.0 {
            self.time %= duration;
        }
    }

    /// Writes the pose at the current time. The root is never written.
    pub fn apply(&self, skeleton: &mut Skeleton) -> usize {
        let Some(clip) = &self.clip else {
            return 0;
        };
        let mut written = 0;
        for track in clip.tracks.iter().filter(|t| !is_protected(&t.bone)) {
            if let Some(rotation) = track.sample(self.time) {
                if skeleton.set_rotation(&track.bone, rotation) {
                    written += 1;
                }
            }
        }
        written
    }
}
