//! Engagement Kernel
//!
//! This crate estimates a child's attention during a therapy session from
//! webcam video. Head pose drives a per-frame gaze classification; gaze and a
//! periodically sampled facial emotion are fused into per-window scores, and
//! the session score is their mean.
//!
//! # Pipeline
//!
//! ```text
//! FrameSource -> LandmarkDetector -> PoseEstimator -> GazeClassifier --+
//!             \                                                        |-> EngagementScorer
//!              `-> EmotionClassifier (every N frames) ----------------+
//! ```
//!
//! The camera, the landmark detector and the emotion classifier are external
//! collaborators behind traits. Synthetic implementations are provided for
//! tests and for running without hardware.
//!
//! # Module Structure
//!
//! - `frame`: Frame container and the read-only view collaborators receive
//! - `ingest`: Frame sources (synthetic, V4L2)
//! - `landmarks`: Face-mesh topology and the detector seam
//! - `pose`: Pinhole camera, PnP solve, Euler decomposition
//! - `gaze`: Head-angle thresholding
//! - `emotion`: Emotion labels and the classifier seam
//! - `score`: Window and session scores
//! - `session`: The attention loop, its worker thread and report
//! - `config`: `attentiond` configuration loading

pub mod config;
pub mod emotion;
pub mod frame;
pub mod gaze;
pub mod ingest;
pub mod landmarks;
pub mod pose;
pub mod score;
pub mod session;

pub use config::EngagementConfig;
pub use emotion::{EmotionClassifier, EmotionLabel, ScriptedEmotion};
#[cfg(feature = "backend-tract")]
pub use emotion::TractEmotionClassifier;
pub use frame::{Frame, FrameView};
pub use gaze::{GazeClassifier, GazeState, GazeThresholds};
pub use ingest::{source_for_device, FrameSource, SourceConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::V4l2Source;
pub use landmarks::{
    detector_for_device, FaceScript, Landmark, LandmarkDetector, LandmarkSet,
    SyntheticFaceDetector,
};
pub use pose::{CameraModel, PoseError, PoseEstimate, PoseEstimator, PoseKind, ANGLE_SCALE};
pub use score::{EngagementScorer, ScoreWeights, SessionScore, WindowScore};
pub use session::{
    AttentionLoop, CancelToken, SessionConfig, SessionError, SessionHandle, SessionReport,
    SessionStats,
};
