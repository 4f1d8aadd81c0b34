// src/bones.rs - Solver channel names, clip track names and skeleton bone ids
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Root bone. Writing it would let the character drift out of frame.
pub const PROTECTED_ROOT: &str = "hips";

/// Solver channel name -> skeleton bone id.
static SOLVER_BONE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Torso
        ("Hips", "hips"),
        ("Spine", "spine"),
        ("Chest", "chest"),
        ("Neck", "neck"),
        ("Head", "head"),
        // Left arm
        ("LeftShoulder", "leftShoulder"),
        ("LeftUpperArm", "leftUpperArm"),
        ("LeftLowerArm", "leftLowerArm"),
        ("LeftHand", "leftHand"),
        ("LeftWrist", "leftHand"),
        // Right arm
        ("RightShoulder", "rightShoulder"),
        ("RightUpperArm", "rightUpperArm"),
        ("RightLowerArm", "rightLowerArm"),
        ("RightHand", "rightHand"),
        ("RightWrist", "rightHand"),
        // Legs
        ("LeftUpperLeg", "leftUpperLeg"),
        ("LeftLowerLeg", "leftLowerLeg"),
        ("LeftFoot", "leftFoot"),
        ("RightUpperLeg", "rightUpperLeg"),
        ("RightLowerLeg", "rightLowerLeg"),
        ("RightFoot", "rightFoot"),
    ])
});

/// Clip track prefix (Mixamo naming) -> skeleton bone id.
static CLIP_BONE_MAP: Lazy<HashMap<String, String>> = Lazy::new(|| {
    let mut map: HashMap<String, String> = [
        ("mixamorigHips", "hips"),
        ("mixamorigSpine", "spine"),
        ("mixamorigSpine1", "chest"),
        ("mixamorigSpine2", "upperChest"),
        ("mixamorigNeck", "neck"),
        ("mixamorigHead", "head"),
        ("mixamorigLeftShoulder", "leftShoulder"),
        ("mixamorigLeftArm", "leftUpperArm"),
        ("mixamorigLeftForeArm", "leftLowerArm"),
        ("mixamorigLeftHand", "leftHand"),
        ("mixamorigRightShoulder", "rightShoulder"),
        ("mixamorigRightArm", "rightUpperArm"),
        ("mixamorigRightForeArm", "rightLowerArm"),
        ("mixamorigRightHand", "rightHand"),
        ("mixamorigLeftUpLeg", "leftUpperLeg"),
        ("mixamorigLeftLeg", "leftLowerLeg"),
        ("mixamorigLeftFoot", "leftFoot"),
        ("mixamorigLeftToeBase", "leftToes"),
        ("mixamorigRightUpLeg", "rightUpperLeg"),
        ("mixamorigRightLeg", "rightLowerLeg"),
        ("mixamorigRightFoot", "rightFoot"),
        ("mixamorigRightToeBase", "rightToes"),
    ]
    .into_iter()
    .map(|(track, bone)| (track.to_string(), bone.to_string()))
    .collect();

    // Fingers follow mixamorig{Side}Hand{Finger}{1,2,3}
    for side in [Side::Left, Side::Right] {
        let (track_side, bone_side) = (side.channel_prefix(), side.bone_prefix());
        for (finger, bone_finger) in [
            ("Index", "Index"),
            ("Middle", "Middle"),
            ("Ring", "Ring"),
            ("Pinky", "Little"),
        ] {
            for (n, segment) in [(1, "Proximal"), (2, "Intermediate"), (3, "Distal")] {
                map.insert(
                    format!("mixamorig{}Hand{}{}", track_side, finger, n),
                    format!("{}{}{}", bone_side, bone_finger, segment),
                );
            }
        }
        for (n, segment) in [(1, "Metacarpal"), (2, "Proximal"), (3, "Distal")] {
            map.insert(
                format!("mixamorig{}HandThumb{}", track_side, n),
                format!("{}Thumb{}", bone_side, segment),
            );
        }
    }

    map
});

/// Maps a solver channel name to a skeleton bone id. Unknown names come back
/// unchanged so the later bone lookup is what fails.
pub fn map_bone_name(channel: &str) -> &str {
    SOLVER_BONE_MAP.get(channel).copied().unwrap_or(channel)
}

/// Maps a clip track target (`mixamorigLeftArm` or `mixamorigLeftArm.quaternion`)
/// to a bone id. Tracks for bones outside the humanoid set return `None`.
pub fn clip_bone(track_name: &str) -> Option<&'static str> {
    let node = track_name.split('.').next().unwrap_or(track_name);
    CLIP_BONE_MAP.get(node).map(String::as_str)
}

/// The AxisCorrectionConfig entry that governs `bone_id`.
pub fn axis_key(bone_id: &str) -> &str {
    match bone_id {
        "leftUpperArm" => "leftArm",
        "rightUpperArm" => "rightArm",
        other => other,
    }
}

pub fn is_protected(bone_id: &str) -> bool {
    bone_id == PROTECTED_ROOT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Prefix used by solver channels (`LeftWrist`).
    pub fn channel_prefix(self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }

    /// Prefix used by bone ids (`leftHand`).
    pub fn bone_prefix(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Finger segments in the order the solver reports them, paired with the bone
/// segment they drive. The solver's thumb "Intermediate" is the rig's metacarpal.
pub const FINGER_SEGMENTS: [(&str, &str); 15] = [
    ("RingProximal", "RingProximal"),
    ("RingIntermediate", "RingIntermediate"),
    ("RingDistal", "RingDistal"),
    ("IndexProximal", "IndexProximal"),
    ("IndexIntermediate", "IndexIntermediate"),
    ("IndexDistal", "IndexDistal"),
    ("MiddleProximal", "MiddleProximal"),
    ("MiddleIntermediate", "MiddleIntermediate"),
    ("MiddleDistal", "MiddleDistal"),
    ("ThumbProximal", "ThumbProximal"),
    ("ThumbIntermediate", "ThumbMetacarpal"),
    ("ThumbDistal", "ThumbDistal"),
    ("LittleProximal", "LittleProximal"),
    ("LittleIntermediate", "LittleIntermediate"),
    ("LittleDistal", "LittleDistal"),
];

/// Bone ids of a standard humanoid, parent first.
pub fn humanoid_bones() -> Vec<(String, Option<String>)> {
    let mut bones: Vec<(String, Option<String>)> = vec![
        ("hips".into(), None),
        ("spine".into(), Some("hips".into())),
        ("chest".into(), Some("spine".into())),
        ("upperChest".into(), Some("chest".into())),
        ("neck".into(), Some("upperChest".into())),
        ("head".into(), Some("neck".into())),
    ];

    for side in [Side::Left, Side::Right] {
        let p = side.bone_prefix();
        let chain = [
            ("Shoulder", "upperChest".to_string()),
            ("UpperArm", format!("{}Shoulder", p)),
            ("LowerArm", format!("{}UpperArm", p)),
            ("Hand", format!("{}LowerArm", p)),
        ];
        for (name, parent) in chain {
            bones.push((format!("{}{}", p, name), Some(parent)));
        }

        for finger in ["Thumb", "Index", "Middle", "Ring", "Little"] {
            let segments: [&str; 3] = if finger == "Thumb" {
                ["Metacarpal", "Proximal", "Distal"]
            } else {
                ["Proximal", "Intermediate", "Distal"]
            };
            let mut parent = format!("{}Hand", p);
            for segment in segments {
                let bone = format!("{}{}{}", p, finger, segment);
                bones.push((bone.clone(), Some(parent)));
                parent = bone;
            }
        }

        let leg = [
            ("UpperLeg", "hips".to_string()),
            ("LowerLeg", format!("{}UpperLeg", p)),
            ("Foot", format!("{}LowerLeg", p)),
            ("Toes", format!("{}Foot", p)),
        ];
        for (name, parent) in leg {
            bones.push((format!("{}{}", p, name), Some(parent)));
        }
    }

    bones
}
