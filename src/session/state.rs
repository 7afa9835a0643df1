use serde::Serialize;

use crate::emotion::EmotionLabel;
use crate::gaze::GazeState;
use crate::score::{SessionScore, WindowScore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SessionPhase {
    Running,
    Stopping,
    Stopped,
}

/// Per-tick counters. Every skipped step is counted, never fatal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Loop iterations, including those whose frame read failed.
    pub ticks: u64,
    pub frames_dropped: u64,
    pub faces_missing: u64,
    pub detector_errors: u64,
    pub pose_failures: u64,
    /// Ticks that produced a gaze classification.
    pub gaze_samples: u64,
    pub centered_samples: u64,
    pub emotion_samples: u64,
    pub emotion_failures: u64,
    /// Ticks on which a due window was held open for lack of a frame.
    pub windows_deferred: u64,
}

/// What the loop saw on one tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FrameObservation {
    pub tick: u64,
    /// Source sequence number; `None` when the read failed.
    pub sequence: Option<u64>,
    pub gaze: Option<GazeState>,
    pub last_window_score: Option<f64>,
    pub emotion: EmotionLabel,
}

/// Mutable loop state, exclusively owned by the attention loop.
#[derive(Debug)]
pub struct SessionState {
    pub(super) phase: SessionPhase,
    /// Ticks into the current window. Exceeds `frames_per_window` only while
    /// a due window waits for a frame.
    pub(super) window_tick: u32,
    /// Centered gaze samples in the current window.
    pub(super) centered: u32,
    pub(super) last_emotion: EmotionLabel,
    pub(super) windows: Vec<WindowScore>,
    pub(super) stats: SessionStats,
    pub(super) last_observation: Option<FrameObservation>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Running,
            window_tick: 0,
            centered: 0,
            last_emotion: EmotionLabel::Neutral,
            windows: Vec::new(),
            stats: SessionStats::default(),
            last_observation: None,
        }
    }
}

impl SessionState {
    pub fn windows(&self) -> &[WindowScore] {
        &self.windows
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn last_emotion(&self) -> EmotionLabel {
        self.last_emotion
    }

    pub fn last_observation(&self) -> Option<&FrameObservation> {
        self.last_observation.as_ref()
    }

    /// Ticks counted so far in the open window.
    pub fn window_progress(&self) -> u32 {
        self.window_tick
    }

    pub fn centered_in_window(&self) -> u32 {
        self.centered
    }

    pub fn score(&self) -> SessionScore {
        SessionScore::from_windows(&self.windows)
    }
}

/// Final session result handed to the caller.
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub score: f64,
    pub window_count: usize,
    /// No window closed; `score` is 0 and carries no information.
    pub insufficient_data: bool,
    pub windows: Vec<WindowScore>,
    /// Last emotion label seen by the loop.
    pub detected_emotion: EmotionLabel,
    /// Frames polled (loop ticks).
    pub frames: u64,
    pub stats: SessionStats,
    pub elapsed_ms: u64,
}

impl SessionReport {
    pub fn session_score(&self) -> SessionScore {
        SessionScore {
            score: self.score,
            window_count: self.window_count,
        }
    }
}
