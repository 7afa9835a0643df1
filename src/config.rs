use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gaze::{GazeThresholds, DEFAULT_THRESHOLD_X, DEFAULT_THRESHOLD_Y};
use crate::ingest::SourceConfig;
use crate::score::{ScoreWeights, DEFAULT_EMOTION_WEIGHT, DEFAULT_GAZE_WEIGHT};
use crate::session::{SessionConfig, DEFAULT_FRAMES_PER_WINDOW};

const DEFAULT_CAMERA: &str = "stub://camera";
const DEFAULT_CAMERA_FPS: u32 = 15;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_HEALTH_LOG_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct EngagementConfigFile {
    camera: Option<CameraConfigFile>,
    session: Option<SessionConfigFile>,
    gaze: Option<GazeConfigFile>,
    weights: Option<WeightsConfigFile>,
    emotion: Option<EmotionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionConfigFile {
    frames_per_window: Option<u32>,
    max_frames: Option<u64>,
    health_log_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct GazeConfigFile {
    threshold_x: Option<f64>,
    threshold_y: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct WeightsConfigFile {
    gaze: Option<f64>,
    emotion: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct EmotionConfigFile {
    model_path: Option<PathBuf>,
}

/// Runtime configuration for `attentiond`.
///
/// Loaded from an optional JSON file named by `ENGAGEMENT_CONFIG`, then
/// overridden by `ENGAGEMENT_*` environment variables, then validated.
#[derive(Debug, Clone)]
pub struct EngagementConfig {
    pub camera: CameraSettings,
    pub frames_per_window: u32,
    pub max_frames: Option<u64>,
    pub health_log_interval: Duration,
    pub thresholds: GazeThresholds,
    pub weights: ScoreWeights,
    /// ONNX emotion model (used with the `backend-tract` feature).
    pub emotion_model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl EngagementConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ENGAGEMENT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: EngagementConfigFile) -> Self {
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let session = file.session.unwrap_or_default();
        let gaze = file.gaze.unwrap_or_default();
        let weights = file.weights.unwrap_or_default();
        Self {
            camera,
            frames_per_window: session
                .frames_per_window
                .unwrap_or(DEFAULT_FRAMES_PER_WINDOW),
            max_frames: session.max_frames,
            health_log_interval: Duration::from_secs(
                session.health_log_secs.unwrap_or(DEFAULT_HEALTH_LOG_SECS),
            ),
            thresholds: GazeThresholds {
                x: gaze.threshold_x.unwrap_or(DEFAULT_THRESHOLD_X),
                y: gaze.threshold_y.unwrap_or(DEFAULT_THRESHOLD_Y),
            },
            weights: ScoreWeights {
                gaze: weights.gaze.unwrap_or(DEFAULT_GAZE_WEIGHT),
                emotion: weights.emotion.unwrap_or(DEFAULT_EMOTION_WEIGHT),
            },
            emotion_model_path: file.emotion.and_then(|emotion| emotion.model_path),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("ENGAGEMENT_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(frames) = std::env::var("ENGAGEMENT_FRAMES_PER_WINDOW") {
            self.frames_per_window = frames.trim().parse().map_err(|_| {
                anyhow!("ENGAGEMENT_FRAMES_PER_WINDOW must be a positive integer")
            })?;
        }
        if let Ok(threshold) = std::env::var("ENGAGEMENT_THRESHOLD_X") {
            self.thresholds.x = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("ENGAGEMENT_THRESHOLD_X must be a number"))?;
        }
        if let Ok(threshold) = std::env::var("ENGAGEMENT_THRESHOLD_Y") {
            self.thresholds.y = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("ENGAGEMENT_THRESHOLD_Y must be a number"))?;
        }
        if let Ok(max_frames) = std::env::var("ENGAGEMENT_MAX_FRAMES") {
            let max_frames = max_frames.trim();
            self.max_frames = if max_frames.is_empty() {
                None
            } else {
                Some(max_frames.parse().map_err(|_| {
                    anyhow!("ENGAGEMENT_MAX_FRAMES must be an integer number of frames")
                })?)
            };
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be at least 1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be non-zero"));
        }
        if self.max_frames == Some(0) {
            return Err(anyhow!("max_frames must be greater than zero when set"));
        }
        self.session_config().validate()
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            device: self.camera.device.clone(),
            target_fps: self.camera.target_fps,
            width: self.camera.width,
            height: self.camera.height,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            frames_per_window: self.frames_per_window,
            thresholds: self.thresholds,
            weights: self.weights,
            max_frames: self.max_frames,
            health_log_interval: self.health_log_interval,
        }
    }
}

fn read_config_file(path: &Path) -> Result<EngagementConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
