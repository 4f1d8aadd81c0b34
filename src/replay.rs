// src/replay.rs - Recorded sessions: landmark frames plus the solver's answers
use crate::app::RigSession;
use crate::bones::Side;
use crate::config::{SkeletonProfile, SolverConfig};
use crate::data::DebugRecorder;
use crate::error::SolveError;
use crate::idle::SourceClip;
use crate::landmarks::{Landmark, LandmarkFrame};
use crate::mode::AnimationMode;
use crate::solver::{FaceRig, HandRig, KinematicSolver, PoseRig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A recorded solver answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recorded<T> {
    Ok(T),
    Error(String),
}

impl<T: Clone> Recorded<T> {
    fn replay(&self) -> std::result::Result<T, SolveError> {
        match self {
            Recorded::Ok(value) => Ok(value.clone()),
            Recorded::Error(reason) => Err(SolveError::new(reason.clone())),
        }
    }
}

/// Solver answers for one landmark frame. Hands are keyed by the anatomical
/// side the solver was asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedResults {
    pub face: Option<Recorded<FaceRig>>,
    pub pose: Option<Recorded<PoseRig>>,
    pub left_hand: Option<Recorded<HandRig>>,
    pub right_hand: Option<Recorded<HandRig>>,
}

fn default_camera_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Render time since the previous frame, seconds.
    pub delta: f64,
    #[serde(default = "default_camera_active")]
    pub camera_active: bool,
    /// Present when a detector result arrived before this render frame.
    #[serde(default)]
    pub landmarks: Option<LandmarkFrame>,
    #[serde(default)]
    pub results: RecordedResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub profile: SkeletonProfile,
    #[serde(default)]
    pub solver: Option<SolverConfig>,
    #[serde(default)]
    pub idle_clip: Option<SourceClip>,
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("recording is not valid JSON")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recording {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("in {}", path.display()))
    }

    pub fn duration(&self) -> f64 {
        self.frames.iter().map(|f| f.delta.max(0.0)).sum()
    }
}

/// Answers solver calls from a recording, one frame at a time.
#[derive(Debug, Default)]
pub struct RecordedSolver {
    current: RecordedResults,
}

impl RecordedSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, results: &RecordedResults) {
        self.current = results.clone();
    }
}

fn missing(category: &str) -> SolveError {
    SolveError::new(format!("no recorded {} result", category))
}

impl KinematicSolver for RecordedSolver {
    fn solve_face(&mut self, _: &[Landmark], _: &SolverConfig) -> std::result::Result<FaceRig, SolveError> {
        self.current.face.as_ref().ok_or_else(|| missing("face"))?.replay()
    }

    fn solve_pose(
        &mut self,
        _: &[Landmark],
        _: &[Landmark],
        _: &SolverConfig,
    ) -> std::result::Result<PoseRig, SolveError> {
        self.current.pose.as_ref().ok_or_else(|| missing("pose"))?.replay()
    }

    fn solve_hand(&mut self, _: &[Landmark], side: Side) -> std::result::Result<HandRig, SolveError> {
        let recorded = match side {
            Side::Left => &self.current.left_hand,
            Side::Right => &self.current.right_hand,
        };
        recorded.as_ref().ok_or_else(|| missing("hand"))?.replay()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub frames: usize,
    pub landmark_frames: usize,
    pub live_ticks: usize,
    pub idle_ticks: usize,
    pub duration: f64,
}

/// Feeds every frame through `session`, recording each tick.
pub fn run(recording: &Recording, session: &mut RigSession, recorder: &mut DebugRecorder) -> ReplaySummary {
    let mut solver = RecordedSolver::new();
    let mut summary = ReplaySummary::default();
    let mut clock = 0.0;

    for frame in &recording.frames {
        if let Some(landmarks) = &frame.landmarks {
            solver.load(&frame.results);
            session.on_landmarks(landmarks, &mut solver);
            summary.landmark_frames += 1;
        }

        clock += frame.delta.max(0.0);
        let report = session.tick(frame.delta, frame.camera_active);
        recorder.record(clock, session, &report);

        summary.frames += 1;
        match report.mode {
            AnimationMode::Live => summary.live_ticks += 1,
            AnimationMode::Idle => summary.idle_ticks += 1,
        }
    }

    summary.duration = clock;
    info!(
        "replayed {} frames ({} live, {} idle) over {:.2}s",
        summary.frames, summary.live_ticks, summary.idle_ticks, summary.duration
    );
    summary
}
