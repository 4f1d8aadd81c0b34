use nalgebra::UnitQuaternion;
use rig_driver::bones::Side;
use rig_driver::idle::{IdleClip, SourceClip, SourceTrack};
use rig_driver::landmarks::HAND_LANDMARK_COUNT;
use rig_driver::retarget::euler_to_quaternion;
use rig_driver::solver::{FaceRig, HandRig, MouthShape, PoseRig};
use rig_driver::storage::MemoryStorage;
use rig_driver::{
    AnimationMode, EngineSettings, KinematicSolver, Landmark, LandmarkFrame, RigSession, Skeleton, SolveError,
    SolverConfig, Xyz,
};
use std::collections::BTreeMap;

/// Scripted solver: fixed channels, with per-category failure switches.
#[derive(Default)]
struct ScriptedSolver {
    pose: BTreeMap<String, Xyz>,
    hand: Vec<(&'static str, Xyz)>,
    mouth_a: f64,
    fail_face: bool,
    hand_calls: Vec<Side>,
}

impl KinematicSolver for ScriptedSolver {
    fn solve_face(&mut self, _: &[Landmark], _: &SolverConfig) -> Result<FaceRig, SolveError> {
        if self.fail_face {
            return Err(SolveError::new("face solver threw"));
        }
        Ok(FaceRig {
            mouth: MouthShape {
                a: self.mouth_a,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn solve_pose(&mut self, _: &[Landmark], _: &[Landmark], _: &SolverConfig) -> Result<PoseRig, SolveError> {
        Ok(PoseRig {
            channels: self.pose.clone(),
        })
    }

    fn solve_hand(&mut self, _: &[Landmark], side: Side) -> Result<HandRig, SolveError> {
        self.hand_calls.push(side);
        let channels = self
            .hand
            .iter()
            .map(|(segment, v)| (format!("{}{}", side.channel_prefix(), segment), *v))
            .collect();
        Ok(HandRig { channels })
    }
}

fn landmarks(n: usize) -> Option<Vec<Landmark>> {
    Some(vec![Landmark::new(0.5, 0.5, 0.0); n])
}

fn pose_frame() -> LandmarkFrame {
    LandmarkFrame {
        pose_landmarks: landmarks(33),
        pose_landmarks_3d: landmarks(33),
        ..Default::default()
    }
}

fn session() -> RigSession {
    RigSession::new(
        Skeleton::humanoid(),
        EngineSettings::default(),
        Box::new(MemoryStorage::new()),
    )
}

fn identity(session: &RigSession, bone: &str) -> bool {
    session.skeleton().rotation(bone) == Some(UnitQuaternion::identity())
}

fn spine_only_clip() -> IdleClip {
    let q = UnitQuaternion::from_euler_angles(0.2, 0.0, 0.0);
    let source = SourceClip {
        name: "idle".into(),
        duration: 4.0,
        tracks: vec![SourceTrack {
            name: "mixamorigSpine.quaternion".into(),
            times: vec![0.0],
            values: vec![q.i, q.j, q.k, q.w],
        }],
    };
    IdleClip::from_source(&source, Default::default()).unwrap()
}

#[test]
fn scenario_a_pose_without_hands_stays_idle() {
    let mut session = session().with_idle_clip(Some(spine_only_clip()));
    let mut solver = ScriptedSolver::default();
    solver
        .pose
        .insert("LeftUpperArm".into(), Xyz::new(0.5, 0.2, -0.3));

    session.on_landmarks(&pose_frame(), &mut solver);
    let report = session.tick(0.1, true);

    assert!(!session.hand_state().has_hand_detection);
    assert_eq!(report.mode, AnimationMode::Idle);
    for bone in ["leftUpperArm", "leftLowerArm", "leftHand", "rightUpperArm", "rightHand"] {
        assert!(identity(&session, bone), "{} moved", bone);
    }
    assert!((session.idle_time() - 0.1).abs() < 1e-12);
    assert!(!identity(&session, "spine"));
}

#[test]
fn scenario_b_detector_right_hand_drives_left_side() {
    let mut session = session();
    let mut solver = ScriptedSolver {
        hand: vec![
            ("Wrist", Xyz::new(0.2, 0.1, 0.0)),
            ("IndexProximal", Xyz::new(0.3, 0.0, 0.1)),
        ],
        ..Default::default()
    };
    solver.pose.insert("LeftHand".into(), Xyz::new(0.0, 0.0, 0.4));
    solver.pose.insert("RightHand".into(), Xyz::new(0.0, 0.0, 0.4));

    let frame = LandmarkFrame {
        right_hand_landmarks: landmarks(HAND_LANDMARK_COUNT),
        ..pose_frame()
    };
    session.on_landmarks(&frame, &mut solver);
    let report = session.tick(0.05, true);

    let hands = session.hand_state();
    assert!(hands.has_left_hand);
    assert!(!hands.has_right_hand);
    assert_eq!(solver.hand_calls, vec![Side::Left]);
    assert_eq!(report.mode, AnimationMode::Live);

    assert!(!identity(&session, "leftHand"));
    assert!(!identity(&session, "leftIndexProximal"));
    assert!(identity(&session, "rightHand"));
    assert!(identity(&session, "rightIndexProximal"));
}

#[test]
fn scenario_c_axis_correction_shapes_the_target() {
    let mut session = session();
    session.set_axis("leftArm", Xyz::new(-1.0, 1.0, -1.0));

    let mut solver = ScriptedSolver::default();
    solver
        .pose
        .insert("LeftUpperArm".into(), Xyz::new(0.5, 0.2, -0.3));
    let frame = LandmarkFrame {
        left_hand_landmarks: landmarks(HAND_LANDMARK_COUNT),
        ..pose_frame()
    };

    session.on_landmarks(&frame, &mut solver);
    // Long enough tick that the blend factor saturates at 1
    session.tick(1.0, true);

    assert_eq!(
        session.skeleton().rotation("leftUpperArm"),
        Some(euler_to_quaternion(&Xyz::new(-0.5, 0.2, 0.3)))
    );
}

#[test]
fn scenario_d_face_failure_freezes_expressions_only() {
    let mut session = session();
    let mut solver = ScriptedSolver {
        mouth_a: 1.0,
        ..Default::default()
    };
    solver.pose.insert("Spine".into(), Xyz::new(0.1, 0.0, 0.0));
    let frame = LandmarkFrame {
        face_landmarks: landmarks(10),
        left_hand_landmarks: landmarks(HAND_LANDMARK_COUNT),
        ..pose_frame()
    };

    session.on_landmarks(&frame, &mut solver);
    session.tick(0.02, true);
    let aa = session.skeleton().expression("aa");
    let spine = session.skeleton().rotation("spine");
    assert!(aa > 0.0);
    let errors_before = session.metrics().error_count;

    solver.fail_face = true;
    solver.mouth_a = 0.0;
    solver.pose.insert("Spine".into(), Xyz::new(0.6, 0.0, 0.0));
    session.on_landmarks(&frame, &mut solver);
    session.tick(0.02, true);

    assert_eq!(session.metrics().error_count, errors_before + 1);
    assert_eq!(session.skeleton().expression("aa"), aa);
    assert_ne!(session.skeleton().rotation("spine"), spine);
    assert!(!session.solved().face.valid);
    assert!(session.solved().face.value.is_some());
}

#[test]
fn mode_switch_resets_the_idle_clip() {
    let mut session = session().with_idle_clip(Some(spine_only_clip()));
    let mut solver = ScriptedSolver::default();

    session.tick(0.5, true);
    assert!((session.idle_time() - 0.5).abs() < 1e-12);

    let live = LandmarkFrame {
        left_hand_landmarks: landmarks(HAND_LANDMARK_COUNT),
        ..Default::default()
    };
    session.on_landmarks(&live, &mut solver);
    assert_eq!(session.tick(0.1, true).mode, AnimationMode::Live);
    assert_eq!(session.idle_time(), 0.0);

    session.on_landmarks(&LandmarkFrame::default(), &mut solver);
    session.tick(0.25, true);
    assert_eq!(session.mode(), AnimationMode::Idle);
    assert!((session.idle_time() - 0.25).abs() < 1e-12);
}

#[test]
fn snapshots_reach_subscribers_at_reduced_cadence() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let summaries = Rc::new(RefCell::new(Vec::new()));
    let sink = summaries.clone();
    let mut session = session();
    session.subscribe(Box::new(move |snapshot| {
        sink.borrow_mut().push(snapshot.mapping_summary.clone())
    }));

    for _ in 0..90 {
        session.tick(1.0 / 60.0, true);
    }
    let delivered = summaries.borrow();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|s| s == "no hand detection"));
}

#[test]
fn skeleton_swap_mid_live_starts_from_a_clean_baseline() {
    let mut partial = Skeleton::new();
    partial.add_bone("hips", None);
    partial.add_bone("spine", Some("hips"));
    let mut session = RigSession::new(partial, EngineSettings::default(), Box::new(MemoryStorage::new()))
        .with_idle_clip(Some(spine_only_clip()));

    let mut solver = ScriptedSolver::default();
    solver.pose.insert("Spine".into(), Xyz::new(0.4, 0.0, 0.0));
    solver.pose.insert("LeftUpperArm".into(), Xyz::new(0.3, 0.0, 0.0));
    let frame = LandmarkFrame {
        left_hand_landmarks: landmarks(HAND_LANDMARK_COUNT),
        ..pose_frame()
    };

    session.on_landmarks(&frame, &mut solver);
    assert_eq!(session.tick(0.1, true).mode, AnimationMode::Live);
    assert!(session.engine().warning_count() > 0);
    let old_spine = session.skeleton().rotation("spine");
    assert_ne!(old_spine, Some(UnitQuaternion::identity()));

    let previous = session.set_skeleton(Skeleton::humanoid());
    assert_eq!(session.engine().warning_count(), 0);
    assert_eq!(session.idle_time(), 0.0);
    assert!(identity(&session, "spine"));

    session.on_landmarks(&frame, &mut solver);
    assert_eq!(session.tick(0.1, true).mode, AnimationMode::Live);
    assert!(!identity(&session, "spine"));
    assert!(!identity(&session, "leftUpperArm"));
    assert_eq!(previous.rotation("spine"), old_spine);
    assert!(!previous.has_bone("leftUpperArm"));

    // Swapping while idle rewinds the clip
    session.on_landmarks(&LandmarkFrame::default(), &mut solver);
    session.tick(0.3, true);
    assert!((session.idle_time() - 0.3).abs() < 1e-12);
    session.set_skeleton(Skeleton::humanoid());
    assert_eq!(session.idle_time(), 0.0);
}
