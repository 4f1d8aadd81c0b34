// src/mode.rs - Idle / Live switching
use serde::Serialize;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    /// Baseline clip plays; tracking only reaches the face.
    #[default]
    Idle,
    /// Body and hands follow the solver.
    Live,
}

impl fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationMode::Idle => f.write_str("idle"),
            AnimationMode::Live => f.write_str("live"),
        }
    }
}

/// Live exactly while a hand is detected, re-evaluated every tick with no
/// debounce.
#[derive(Debug, Default)]
pub struct ModeStateMachine {
    mode: AnimationMode,
    transitions: u64,
}

impl ModeStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Returns the previous mode when this call switched modes.
    pub fn evaluate(&mut self, has_hand_detection: bool) -> Option<AnimationMode> {
        let next = if has_hand_detection {
            AnimationMode::Live
        } else {
            AnimationMode::Idle
        };
        if next == self.mode {
            return None;
        }

        let previous = std::mem::replace(&mut self.mode, next);
        self.transitions += 1;
        info!("animation mode {} -> {}", previous, next);
        Some(previous)
    }
}
