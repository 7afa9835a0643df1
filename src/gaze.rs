//! Gaze classification from head pose.

use serde::{Deserialize, Serialize};

use crate::pose::PoseEstimate;

pub const DEFAULT_THRESHOLD_X: f64 = 12.0;
pub const DEFAULT_THRESHOLD_Y: f64 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeState {
    Centered,
    NotCentered,
}

impl GazeState {
    pub fn is_centered(self) -> bool {
        matches!(self, GazeState::Centered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GazeState::Centered => "centered",
            GazeState::NotCentered => "not_centered",
        }
    }
}

/// Angular limits on the pose angle scale (see [`crate::pose::ANGLE_SCALE`]).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GazeThresholds {
    pub x: f64,
    pub y: f64,
}

impl Default for GazeThresholds {
    fn default() -> Self {
        Self {
            x: DEFAULT_THRESHOLD_X,
            y: DEFAULT_THRESHOLD_Y,
        }
    }
}

/// Memoryless head-angle thresholding.
///
/// A value exactly on a threshold is centered.
#[derive(Clone, Copy, Debug, Default)]
pub struct GazeClassifier {
    thresholds: GazeThresholds,
}

impl GazeClassifier {
    pub fn new(thresholds: GazeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> GazeThresholds {
        self.thresholds
    }

    /// The iris pose is accepted for interface stability and not consulted.
    pub fn classify(&self, head: &PoseEstimate, _iris: Option<&PoseEstimate>) -> GazeState {
        if head.theta_x.abs() > self.thresholds.x || head.theta_y.abs() > self.thresholds.y {
            GazeState::NotCentered
        } else {
            GazeState::Centered
        }
    }
}
