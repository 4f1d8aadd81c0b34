// src/tracking.rs - Mirrored hand routing, detection state and solve metrics
use crate::bones::Side;
use crate::error::{RigError, SolveCategory, SolveError};
use crate::landmarks::LandmarkFrame;
use crate::solver::{Fragment, KinematicSolver, SolvedPose};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const METRICS_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HandDetectionState {
    pub has_left_hand: bool,
    pub has_right_hand: bool,
    pub has_hand_detection: bool,
}

impl HandDetectionState {
    pub fn new(has_left_hand: bool, has_right_hand: bool) -> Self {
        Self {
            has_left_hand,
            has_right_hand,
            has_hand_detection: has_left_hand || has_right_hand,
        }
    }

    pub fn is_tracked(&self, side: Side) -> bool {
        match side {
            Side::Left => self.has_left_hand,
            Side::Right => self.has_right_hand,
        }
    }

    pub fn mapping_summary(&self) -> &'static str {
        match (self.has_left_hand, self.has_right_hand) {
            (true, true) => "both hands tracking",
            (true, false) => "left hand only",
            (false, true) => "right hand only",
            (false, false) => "no hand detection",
        }
    }

    fn set(&mut self, side: Side, tracked: bool) {
        match side {
            Side::Left => self.has_left_hand = tracked,
            Side::Right => self.has_right_hand = tracked,
        }
        self.has_hand_detection = self.has_left_hand || self.has_right_hand;
    }
}

/// Routes detector hand labels to skeleton sides.
///
/// The camera image is mirrored, so the hand the detector calls "left" is the
/// performer's right hand: it is solved as `Right` and drives the skeleton's
/// right side. Each side is solved and tracked on its own.
#[derive(Debug, Default)]
pub struct HandMirrorAdapter {
    state: HandDetectionState,
}

impl HandMirrorAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skeleton side driven by a detector label.
    pub fn skeleton_side(detector_left: bool) -> Side {
        if detector_left {
            Side::Right
        } else {
            Side::Left
        }
    }

    pub fn category(side: Side) -> SolveCategory {
        match side {
            Side::Left => SolveCategory::LeftHand,
            Side::Right => SolveCategory::RightHand,
        }
    }

    pub fn state(&self) -> HandDetectionState {
        self.state
    }

    /// Solves both hands of `frame` into `solved` and recomputes the detection
    /// state. A side with no landmarks or a failed solve is marked untracked
    /// and its fragment invalidated; the other side is unaffected.
    pub fn solve_hands(
        &mut self,
        frame: &LandmarkFrame,
        frame_no: u64,
        solver: &mut dyn KinematicSolver,
        solved: &mut SolvedPose,
        metrics: &mut SolveMetrics,
    ) {
        for detector_left in [true, false] {
            let side = Self::skeleton_side(detector_left);
            let category = Self::category(side);

            let tracked = match frame.hand(detector_left) {
                Some(landmarks) => solve_category(solved.hand_mut(side), category, frame_no, metrics, || {
                    solver.solve_hand(landmarks, side)
                }),
                None => {
                    mark_stale(solved.hand_mut(side), category, metrics);
                    false
                }
            };
            self.state.set(side, tracked);
        }
    }

    /// Drops all hand tracking, e.g. when the camera goes off.
    pub fn reset(&mut self) {
        if self.state.has_hand_detection {
            debug!("hand detection cleared");
        }
        self.state = HandDetectionState::default();
    }
}

/// Runs one category's solve into its fragment. A failure is logged, counted
/// once and leaves the fragment invalid with its last value; returns whether
/// the solve succeeded.
pub(crate) fn solve_category<T>(
    fragment: &mut Fragment<T>,
    category: SolveCategory,
    frame_no: u64,
    metrics: &mut SolveMetrics,
    solve: impl FnOnce() -> Result<T, SolveError>,
) -> bool {
    let start = Instant::now();
    match solve() {
        Ok(value) => {
            fragment.store(value, frame_no);
            metrics.record_success(category, start.elapsed());
            true
        }
        Err(e) => {
            warn!("{} solve failed: {}", category, e);
            fragment.invalidate();
            let err = RigError::Solve {
                category,
                reason: e.to_string(),
            };
            metrics.record_failure(&err, start.elapsed());
            false
        }
    }
}

/// No landmarks for `category` this frame.
pub(crate) fn mark_stale<T>(fragment: &mut Fragment<T>, category: SolveCategory, metrics: &mut SolveMetrics) {
    fragment.invalidate();
    metrics.record_failure(&RigError::StaleFrame { category }, Duration::ZERO);
}

/// Solver health counters plus a rolling landmark-frame processing time.
#[derive(Debug, Clone, Serialize)]
pub struct SolveMetrics {
    pub success_count: u64,
    pub error_count: u64,
    pub stale_count: u64,
    pub avg_frame_ms: f64,
    /// Last solve time per category, ms, keyed by `SolveCategory::as_str`.
    #[serde(rename = "last_process_ms")]
    last_process: BTreeMap<&'static str, f64>,
    #[serde(skip)]
    frame_times: VecDeque<f64>,
}

impl Default for SolveMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SolveMetrics {
    pub fn new() -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            stale_count: 0,
            avg_frame_ms: 0.0,
            last_process: BTreeMap::new(),
            frame_times: VecDeque::with_capacity(METRICS_WINDOW),
        }
    }

    pub fn record_success(&mut self, category: SolveCategory, elapsed: Duration) {
        self.success_count += 1;
        self.note_process_time(category, elapsed);
    }

    /// Counts an absorbed failure. Solve failures and stale categories are
    /// kept apart; anything else is not a solver outcome and is ignored.
    pub fn record_failure(&mut self, err: &RigError, elapsed: Duration) {
        match err {
            RigError::Solve { category, .. } => {
                self.error_count += 1;
                self.note_process_time(*category, elapsed);
            }
            RigError::StaleFrame { .. } => self.stale_count += 1,
            _ => {}
        }
    }

    pub fn end_frame(&mut self, elapsed: Duration) {
        self.frame_times.push_front(elapsed.as_secs_f64() * 1000.0);
        if self.frame_times.len() > METRICS_WINDOW {
            self.frame_times.pop_back();
        }
        self.avg_frame_ms = self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64;
    }

    /// Time the last solve of `category` took, in milliseconds.
    pub fn last_process_ms(&self, category: SolveCategory) -> Option<f64> {
        self.last_process.get(category.as_str()).copied()
    }

    fn note_process_time(&mut self, category: SolveCategory, elapsed: Duration) {
        self.last_process
            .insert(category.as_str(), elapsed.as_secs_f64() * 1000.0);
    }

    pub fn frames_in_window(&self) -> usize {
        self.frame_times.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::landmarks::{Landmark, HAND_LANDMARK_COUNT};
    use crate::solver::{FaceRig, HandRig, PoseRig};

    /// Solves every hand, or fails the side named in `fail`.
    struct HandOnlySolver {
        fail: Option<Side>,
        calls: Vec<Side>,
    }

    impl KinematicSolver for HandOnlySolver {
        fn solve_face(&mut self, _: &[Landmark], _: &SolverConfig) -> Result<FaceRig, SolveError> {
            Err(SolveError::new("unused"))
        }

        fn solve_pose(&mut self, _: &[Landmark], _: &[Landmark], _: &SolverConfig) -> Result<PoseRig, SolveError> {
            Err(SolveError::new("unused"))
        }

        fn solve_hand(&mut self, _: &[Landmark], side: Side) -> Result<HandRig, SolveError> {
            self.calls.push(side);
            if self.fail == Some(side) {
                return Err(SolveError::new("degenerate hand"));
            }
            Ok(HandRig::default())
        }
    }

    fn hand() -> Option<Vec<Landmark>> {
        Some(vec![Landmark::default(); HAND_LANDMARK_COUNT])
    }

    #[test]
    fn detector_left_drives_right_side() {
        let frame = LandmarkFrame {
            left_hand_landmarks: hand(),
            ..Default::default()
        };
        let mut solver = HandOnlySolver { fail: None, calls: vec![] };
        let mut adapter = HandMirrorAdapter::new();
        let mut solved = SolvedPose::default();
        let mut metrics = SolveMetrics::new();

        adapter.solve_hands(&frame, 1, &mut solver, &mut solved, &mut metrics);

        assert_eq!(solver.calls, vec![Side::Right]);
        assert!(adapter.state().has_right_hand);
        assert!(!adapter.state().has_left_hand);
        assert!(solved.right_hand.current().is_some());
        assert!(solved.left_hand.current().is_none());
        assert_eq!(adapter.state().mapping_summary(), "right hand only");
    }

    #[test]
    fn one_side_failing_does_not_block_the_other() {
        let frame = LandmarkFrame {
            left_hand_landmarks: hand(),
            right_hand_landmarks: hand(),
            ..Default::default()
        };
        let mut solver = HandOnlySolver {
            fail: Some(Side::Right),
            calls: vec![],
        };
        let mut adapter = HandMirrorAdapter::new();
        let mut solved = SolvedPose::default();
        let mut metrics = SolveMetrics::new();

        adapter.solve_hands(&frame, 1, &mut solver, &mut solved, &mut metrics);

        let state = adapter.state();
        assert!(state.has_left_hand);
        assert!(!state.has_right_hand);
        assert!(state.has_hand_detection);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.success_count, 1);
    }

    #[test]
    fn missing_hands_count_as_stale() {
        let mut solver = HandOnlySolver { fail: None, calls: vec![] };
        let mut adapter = HandMirrorAdapter::new();
        let mut solved = SolvedPose::default();
        let mut metrics = SolveMetrics::new();

        adapter.solve_hands(&LandmarkFrame::default(), 1, &mut solver, &mut solved, &mut metrics);

        assert!(solver.calls.is_empty());
        assert_eq!(metrics.stale_count, 2);
        assert_eq!(metrics.error_count, 0);
        assert_eq!(adapter.state().mapping_summary(), "no hand detection");
    }

    #[test]
    fn summary_strings() {
        assert_eq!(HandDetectionState::new(true, true).mapping_summary(), "both hands tracking");
        assert_eq!(HandDetectionState::new(true, false).mapping_summary(), "left hand only");
        assert!(!HandDetectionState::new(false, false).has_hand_detection);
    }

    #[test]
    fn frame_time_window_is_bounded() {
        let mut metrics = SolveMetrics::new();
        for _ in 0..40 {
            metrics.end_frame(Duration::from_millis(2));
        }
        assert_eq!(metrics.frames_in_window(), METRICS_WINDOW);
        assert!((metrics.avg_frame_ms - 2.0).abs() < 1e-9);
    }
}
