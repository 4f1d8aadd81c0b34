// src/app.rs - One retargeting session: owns the rig, config and engines
use crate::axis::{AxisCorrectionConfig, Xyz};
use crate::config::{EngineSettings, SensitivitySettings, SkeletonProfile, SolverConfig};
use crate::diagnostics::{DebugSnapshot, SnapshotSubscriber, SnapshotThrottle};
use crate::error::{Result, SolveCategory};
use crate::face::{FaceExpressionDriver, FaceOutcome};
use crate::idle::{IdleAnimationPlayer, IdleClip};
use crate::landmarks::{EyeOpenness, LandmarkFrame};
use crate::mode::{AnimationMode, ModeStateMachine};
use crate::retarget::{BlendFactors, RetargetEngine};
use crate::skeleton::Skeleton;
use crate::solver::{KinematicSolver, SolvedPose};
use crate::storage::{self, SessionStorage};
use crate::tracking::{mark_stale, solve_category, HandDetectionState, HandMirrorAdapter, SolveMetrics};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// What one render tick did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    pub mode: AnimationMode,
    pub bones_driven: usize,
    pub idle_bones: usize,
    pub face: FaceOutcome,
}

/// Everything one performer/rig pairing needs between frames. The host feeds
/// it landmark frames as they arrive and calls `tick` once per rendered frame.
pub struct RigSession {
    skeleton: Skeleton,
    settings: EngineSettings,
    sensitivity: SensitivitySettings,
    solver_config: SolverConfig,
    axes: AxisCorrectionConfig,
    storage: Box<dyn SessionStorage>,

    hands: HandMirrorAdapter,
    solved: SolvedPose,
    metrics: SolveMetrics,

    engine: RetargetEngine,
    face: FaceExpressionDriver,
    mode: ModeStateMachine,
    idle: IdleAnimationPlayer,
    throttle: SnapshotThrottle,

    landmark_frames: u64,
    ticks: u64,
    last_face: Option<FaceOutcome>,
}

impl RigSession {
    /// Stored axis and sensitivity settings are loaded from `storage`,
    /// falling back to defaults for `settings.profile`.
    pub fn new(skeleton: Skeleton, settings: EngineSettings, storage: Box<dyn SessionStorage>) -> Self {
        let axes = storage::load_axis_config(storage.as_ref(), settings.profile);
        let sensitivity = storage::load_sensitivity(storage.as_ref());
        info!(
            "session for skeleton {} ({} bones, {:?} profile)",
            skeleton.id(),
            skeleton.bone_count(),
            settings.profile
        );

        Self {
            skeleton,
            engine: RetargetEngine::new(settings.profile),
            settings,
            sensitivity,
            solver_config: SolverConfig::default(),
            axes,
            storage,
            hands: HandMirrorAdapter::new(),
            solved: SolvedPose::default(),
            metrics: SolveMetrics::new(),
            face: FaceExpressionDriver::new(),
            mode: ModeStateMachine::new(),
            idle: IdleAnimationPlayer::new(None),
            throttle: SnapshotThrottle::default(),
            landmark_frames: 0,
            ticks: 0,
            last_face: None,
        }
    }

    pub fn with_idle_clip(mut self, clip: Option<IdleClip>) -> Self {
        self.idle.set_clip(clip);
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    /// Landmark callback. Each category is solved on its own; a failure is
    /// absorbed, counted and leaves that category's last value in place.
    pub fn on_landmarks(&mut self, frame: &LandmarkFrame, solver: &mut dyn KinematicSolver) {
        let start = Instant::now();
        self.landmark_frames += 1;
        let frame_no = self.landmark_frames;
        let config = &self.solver_config;

        match frame.face() {
            Some(face) => {
                solve_category(&mut self.solved.face, SolveCategory::Face, frame_no, &mut self.metrics, || {
                    solver.solve_face(face, config)
                });
                match EyeOpenness::measure(face) {
                    Some(eyes) => self.solved.measured_eyes.store(eyes, frame_no),
                    None => self.solved.measured_eyes.invalidate(),
                }
            }
            None => {
                mark_stale(&mut self.solved.face, SolveCategory::Face, &mut self.metrics);
                self.solved.measured_eyes.invalidate();
            }
        }

        // The pose solver needs world landmarks as well as image ones
        match (frame.pose_3d(), frame.pose()) {
            (Some(world), Some(image)) => {
                solve_category(&mut self.solved.pose, SolveCategory::Pose, frame_no, &mut self.metrics, || {
                    solver.solve_pose(world, image, config)
                });
            }
            _ => mark_stale(&mut self.solved.pose, SolveCategory::Pose, &mut self.metrics),
        }

        self.hands
            .solve_hands(frame, frame_no, solver, &mut self.solved, &mut self.metrics);
        self.metrics.end_frame(start.elapsed());
    }

    /// Per-render-frame update. The mode is settled before any bone is
    /// written; with the camera off there is no tracking data at all.
    pub fn tick(&mut self, delta: f64, camera_active: bool) -> TickReport {
        self.ticks += 1;
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };

        if !camera_active {
            self.hands.reset();
            self.invalidate_solved();
        }

        let hands = self.hands.state();
        if self.mode.evaluate(hands.has_hand_detection).is_some() {
            self.engine.reset();
            match self.mode.mode() {
                AnimationMode::Idle => self.idle.play(),
                AnimationMode::Live => self.idle.stop(),
            }
        }

        let mut report = TickReport {
            mode: self.mode.mode(),
            bones_driven: 0,
            idle_bones: 0,
            face: FaceOutcome::Frozen,
        };

        match report.mode {
            AnimationMode::Idle => {
                self.idle.advance(delta);
                report.idle_bones = self.idle.apply(&mut self.skeleton);
            }
            AnimationMode::Live => {
                let blend = BlendFactors::new(delta, &self.settings, &self.sensitivity);
                report.bones_driven =
                    self.engine
                        .drive_body(&mut self.skeleton, &self.axes, &self.solved, &hands, &blend);
            }
        }

        report.face = self.face.update(
            &mut self.skeleton,
            &self.axes,
            &mut self.engine,
            &self.solved,
            camera_active,
            delta,
            &self.settings,
        );
        self.last_face = Some(report.face);

        if self.throttle.due(delta) {
            let snapshot = self.debug_snapshot();
            self.throttle.deliver(&snapshot);
        }

        report
    }

    /// Swaps the active rig and returns the previous one. Per-bone state
    /// starts clean for the new skeleton.
    pub fn set_skeleton(&mut self, skeleton: Skeleton) -> Skeleton {
        info!("skeleton swapped to {}", skeleton.id());
        let previous = std::mem::replace(&mut self.skeleton, skeleton);
        self.engine.reset();
        self.face.reset();
        match self.mode.mode() {
            AnimationMode::Idle => self.idle.play(),
            AnimationMode::Live => self.idle.stop(),
        }
        previous
    }

    /// Switches conventions; the axis table is reloaded for the new profile.
    pub fn set_profile(&mut self, profile: SkeletonProfile) {
        self.settings.profile = profile;
        self.engine.set_profile(profile);
        self.axes = storage::load_axis_config(self.storage.as_ref(), profile);
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn axes(&self) -> &AxisCorrectionConfig {
        &self.axes
    }

    /// Takes effect on the next tick.
    pub fn set_axis(&mut self, key: &str, value: Xyz) {
        debug!("axis {} = {:?}", key, value);
        self.axes.set(key, value);
    }

    pub fn export_axis_config(&self) -> Result<String> {
        self.axes.export_json()
    }

    pub fn import_axis_config(&mut self, json: &str) -> Result<()> {
        self.axes.import_json(json)
    }

    pub fn save_axis_config(&mut self) -> Result<()> {
        storage::save_axis_config(self.storage.as_mut(), &self.axes)
    }

    pub fn load_axis_config(&mut self) {
        self.axes = storage::load_axis_config(self.storage.as_ref(), self.settings.profile);
    }

    pub fn reset_axis_config(&mut self) -> Result<()> {
        self.axes = storage::reset_axis_config(self.storage.as_mut(), self.settings.profile)?;
        Ok(())
    }

    pub fn sensitivity(&self) -> &SensitivitySettings {
        &self.sensitivity
    }

    /// Applies and persists new sensitivity settings.
    pub fn set_sensitivity(&mut self, sensitivity: SensitivitySettings) -> Result<()> {
        self.sensitivity = sensitivity;
        storage::save_sensitivity(self.storage.as_mut(), &self.sensitivity)
    }

    pub fn hand_state(&self) -> HandDetectionState {
        self.hands.state()
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode.mode()
    }

    pub fn engine(&self) -> &RetargetEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &SolveMetrics {
        &self.metrics
    }

    pub fn solved(&self) -> &SolvedPose {
        &self.solved
    }

    pub fn idle_time(&self) -> f64 {
        self.idle.time()
    }

    pub fn subscribe(&mut self, subscriber: SnapshotSubscriber) {
        self.throttle.subscribe(subscriber);
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let hands = self.hands.state();
        DebugSnapshot {
            skeleton_id: self.skeleton.id().to_string(),
            landmark_frames: self.landmark_frames,
            ticks: self.ticks,
            mode: self.mode.mode(),
            mode_transitions: self.mode.transitions(),
            hands,
            mapping_summary: hands.mapping_summary().to_string(),
            face: self.last_face,
            idle_time: self.idle.time(),
            metrics: self.metrics.clone(),
            solved: self.solved.clone(),
        }
    }

    fn invalidate_solved(&mut self) {
        self.solved.face.invalidate();
        self.solved.measured_eyes.invalidate();
        self.solved.pose.invalidate();
        self.solved.left_hand.invalidate();
        self.solved.right_hand.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bones::Side;
    use crate::error::SolveError;
    use crate::landmarks::{Landmark, HAND_LANDMARK_COUNT};
    use crate::solver::{FaceRig, HandRig, PoseRig};
    use crate::storage::MemoryStorage;

    struct FixedSolver;

    impl KinematicSolver for FixedSolver {
        fn solve_face(&mut self, _: &[Landmark], _: &SolverConfig) -> std::result::Result<FaceRig, SolveError> {
            Ok(FaceRig::default())
        }

        fn solve_pose(
            &mut self,
            _: &[Landmark],
            _: &[Landmark],
            _: &SolverConfig,
        ) -> std::result::Result<PoseRig, SolveError> {
            let mut pose = PoseRig::default();
            pose.channels.insert("Spine".into(), Xyz::new(0.2, 0.0, 0.0));
            Ok(pose)
        }

        fn solve_hand(&mut self, _: &[Landmark], _: Side) -> std::result::Result<HandRig, SolveError> {
            Ok(HandRig::default())
        }
    }

    fn session() -> RigSession {
        RigSession::new(
            Skeleton::humanoid(),
            EngineSettings::default(),
            Box::new(MemoryStorage::new()),
        )
    }

    fn frame_with_hand() -> LandmarkFrame {
        LandmarkFrame {
            pose_landmarks: Some(vec![Landmark::default(); 33]),
            pose_landmarks_3d: Some(vec![Landmark::default(); 33]),
            left_hand_landmarks: Some(vec![Landmark::default(); HAND_LANDMARK_COUNT]),
            ..Default::default()
        }
    }

    #[test]
    fn camera_off_forces_idle() {
        let mut session = session();
        session.on_landmarks(&frame_with_hand(), &mut FixedSolver);
        assert_eq!(session.tick(0.016, true).mode, AnimationMode::Live);

        let report = session.tick(0.016, false);
        assert_eq!(report.mode, AnimationMode::Idle);
        assert!(!session.hand_state().has_hand_detection);
        assert_eq!(report.face, FaceOutcome::AutoBlink);
    }

    #[test]
    fn skeleton_swap_returns_previous_rig() {
        let mut session = session();
        let first = session.skeleton().id();
        let previous = session.set_skeleton(Skeleton::humanoid());
        assert_eq!(previous.id(), first);
        assert_ne!(session.skeleton().id(), first);
    }

    #[test]
    fn axis_edits_round_trip_through_storage() {
        let mut session = session();
        session.set_axis("leftArm", Xyz::new(-1.0, 1.0, -1.0));
        session.save_axis_config().unwrap();

        session.set_axis("leftArm", Xyz::ONE);
        session.load_axis_config();
        assert_eq!(session.axes().get("leftArm"), Xyz::new(-1.0, 1.0, -1.0));

        session.reset_axis_config().unwrap();
        assert_eq!(session.axes().get("leftArm"), Xyz::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn snapshot_reports_counters() {
        let mut session = session();
        session.on_landmarks(&frame_with_hand(), &mut FixedSolver);
        session.tick(0.016, true);

        let snapshot = session.debug_snapshot();
        assert_eq!(snapshot.landmark_frames, 1);
        assert_eq!(snapshot.mapping_summary, "right hand only");
        // face missing + detector-right hand missing
        assert_eq!(snapshot.metrics.stale_count, 2);
        assert_eq!(snapshot.metrics.success_count, 2);
        assert_eq!(snapshot.mode, AnimationMode::Live);

        assert!(snapshot.metrics.last_process_ms(SolveCategory::Pose).is_some());
        // Detector-left hand is the skeleton's right
        assert!(snapshot.metrics.last_process_ms(SolveCategory::RightHand).is_some());
        assert_eq!(snapshot.metrics.last_process_ms(SolveCategory::Face), None);

        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        let times = &json["metrics"]["last_process_ms"];
        assert!(times["pose"].is_number());
        assert!(times["right_hand"].is_number());
        assert!(times.get("face").is_none());
    }
}
