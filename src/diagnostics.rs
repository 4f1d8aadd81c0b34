// src/diagnostics.rs - Debug snapshots for an inspector UI
use crate::face::FaceOutcome;
use crate::mode::AnimationMode;
use crate::solver::SolvedPose;
use crate::tracking::{HandDetectionState, SolveMetrics};
use serde::Serialize;

/// Subscriber refresh interval in seconds of tick time.
pub const DEFAULT_SNAPSHOT_INTERVAL: f64 = 1.0;

#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub skeleton_id: String,
    pub landmark_frames: u64,
    pub ticks: u64,
    pub mode: AnimationMode,
    pub mode_transitions: u64,
    pub hands: HandDetectionState,
    pub mapping_summary: String,
    pub face: Option<FaceOutcome>,
    pub idle_time: f64,
    pub metrics: SolveMetrics,
    pub solved: SolvedPose,
}

impl DebugSnapshot {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub type SnapshotSubscriber = Box<dyn FnMut(&DebugSnapshot)>;

/// Pushes snapshots to subscribers at most once per interval.
pub struct SnapshotThrottle {
    interval: f64,
    since_last: f64,
    subscribers: Vec<SnapshotSubscriber>,
}

impl std::fmt::Debug for SnapshotThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotThrottle")
            .field("interval", &self.interval)
            .field("since_last", &self.since_last)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for SnapshotThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_INTERVAL)
    }
}

impl SnapshotThrottle {
    pub fn new(interval: f64) -> Self {
        Self {
            interval: interval.max(0.0),
            // First tick after subscribing delivers immediately
            since_last: f64::INFINITY,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: SnapshotSubscriber) {
        self.subscribers.push(subscriber);
    }

    /// Accumulates `delta`; true when a snapshot is due. Building the
    /// snapshot is left to the caller so nothing is cloned between deliveries.
    pub fn due(&mut self, delta: f64) -> bool {
        if self.subscribers.is_empty() {
            return false;
        }
        self.since_last += delta.max(0.0);
        self.since_last >= self.interval
    }

    pub fn deliver(&mut self, snapshot: &DebugSnapshot) {
        self.since_last = 0.0;
        for subscriber in &mut self.subscribers {
            subscriber(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn snapshot() -> DebugSnapshot {
        DebugSnapshot {
            skeleton_id: "test".into(),
            landmark_frames: 0,
            ticks: 0,
            mode: AnimationMode::Idle,
            mode_transitions: 0,
            hands: HandDetectionState::default(),
            mapping_summary: "no hand detection".into(),
            face: None,
            idle_time: 0.0,
            metrics: SolveMetrics::new(),
            solved: SolvedPose::default(),
        }
    }

    #[test]
    fn delivers_at_reduced_cadence() {
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        let mut throttle = SnapshotThrottle::new(0.5);
        throttle.subscribe(Box::new(move |_| *counter.borrow_mut() += 1));

        // 30 ticks at 1/60 s: immediate delivery, then one more at 0.5 s
        for _ in 0..30 {
            if throttle.due(1.0 / 60.0) {
                throttle.deliver(&snapshot());
            }
        }
        assert_eq!(*seen.borrow(), 1);

        for _ in 0..31 {
            if throttle.due(1.0 / 60.0) {
                throttle.deliver(&snapshot());
            }
        }
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn nothing_due_without_subscribers() {
        let mut throttle = SnapshotThrottle::new(0.0);
        assert!(!throttle.due(1.0));
    }

    #[test]
    fn snapshot_serializes_summary() {
        let json = snapshot().to_json().unwrap();
        assert!(json.contains("\"mapping_summary\": \"no hand detection\""));
        assert!(json.contains("\"mode\": \"idle\""));
    }
}
