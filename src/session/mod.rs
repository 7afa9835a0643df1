//! The attention loop.
//!
//! One loop owns a frame source, a landmark detector and an emotion
//! classifier. Each tick it:
//! 1. Polls cancellation (and the optional frame cap)
//! 2. Pulls a frame; a failed read skips the rest of the tick
//! 3. Detects landmarks, solves head and iris pose, classifies gaze
//! 4. Closes the window every `frames_per_window` ticks: samples emotion,
//!    scores `centered / frames_per_window`, resets the tally
//!
//! Every tick counts toward the window, including ticks whose read failed.
//! A window that falls due on a tick without a frame stays open until the
//! next tick that has one; no window is scored without a frame. Only a
//! camera that cannot be opened is fatal; everything else is counted in
//! [`SessionStats`] and skipped.
//!
//! Phases: `Running -> Stopping -> Stopped`. On stop the camera is released
//! and the [`SessionReport`] is delivered once.

use anyhow::{anyhow, Result};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::emotion::{EmotionClassifier, EmotionLabel};
use crate::frame::Frame;
use crate::gaze::{GazeClassifier, GazeState, GazeThresholds};
use crate::ingest::FrameSource;
use crate::landmarks::LandmarkDetector;
use crate::pose::PoseEstimator;
use crate::score::{EngagementScorer, ScoreWeights, WindowScore};

mod handle;
mod state;

pub use handle::{CancelToken, SessionHandle};
use state::SessionPhase;
pub use state::{FrameObservation, SessionReport, SessionState, SessionStats};

pub const DEFAULT_FRAMES_PER_WINDOW: u32 = 20;
pub const DEFAULT_HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to open camera {device}: {reason}")]
    CameraOpen { device: String, reason: String },
    #[error("failed to spawn attention loop thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("attention loop thread panicked")]
    WorkerPanicked,
    #[error("attention loop exited without a report")]
    ResultMissing,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Ticks per scoring window (emotion sampling cadence).
    pub frames_per_window: u32,
    pub thresholds: GazeThresholds,
    pub weights: ScoreWeights,
    /// Stop after this many ticks (benchmark mode).
    pub max_frames: Option<u64>,
    pub health_log_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frames_per_window: DEFAULT_FRAMES_PER_WINDOW,
            thresholds: GazeThresholds::default(),
            weights: ScoreWeights::default(),
            max_frames: None,
            health_log_interval: DEFAULT_HEALTH_LOG_INTERVAL,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frames_per_window == 0 {
            return Err(anyhow!("frames_per_window must be at least 1"));
        }
        for (axis, value) in [("x", self.thresholds.x), ("y", self.thresholds.y)] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!(
                    "gaze threshold {} must be finite and non-negative (got {})",
                    axis,
                    value
                ));
            }
        }
        self.weights.validate()
    }
}

pub struct AttentionLoop {
    config: SessionConfig,
    source: Box<dyn FrameSource>,
    detector: Box<dyn LandmarkDetector>,
    emotion: Box<dyn EmotionClassifier>,
    estimator: PoseEstimator,
    gaze: GazeClassifier,
    scorer: EngagementScorer,
    state: SessionState,
    opened: bool,
}

impl AttentionLoop {
    pub fn new(
        config: SessionConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn LandmarkDetector>,
        emotion: Box<dyn EmotionClassifier>,
    ) -> Result<Self, SessionError> {
        config
            .validate()
            .map_err(|err| SessionError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            estimator: PoseEstimator::new(),
            gaze: GazeClassifier::new(config.thresholds),
            scorer: EngagementScorer::new(config.weights),
            config,
            source,
            detector,
            emotion,
            state: SessionState::default(),
            opened: false,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Open the camera. Idempotent.
    pub fn open(&mut self) -> Result<(), SessionError> {
        if self.opened {
            return Ok(());
        }
        self.source
            .open()
            .map_err(|err| SessionError::CameraOpen {
                device: self.source.device().to_string(),
                reason: format!("{:#}", err),
            })?;
        self.opened = true;
        log::info!(
            "attention loop ready: device={} detector={} emotion={} window={} thresholds=({}, {})",
            self.source.device(),
            self.detector.name(),
            self.emotion.name(),
            self.config.frames_per_window,
            self.config.thresholds.x,
            self.config.thresholds.y
        );
        Ok(())
    }

    /// Run on the current thread until cancelled or the frame cap is reached.
    pub fn run(mut self, cancel: &CancelToken) -> Result<SessionReport, SessionError> {
        self.open()?;
        let started = Instant::now();
        self.drive(cancel);
        Ok(self.finish(started))
    }

    /// Open the camera on the caller's thread, then run on a worker thread.
    pub fn spawn(mut self) -> Result<SessionHandle, SessionError> {
        self.open()?;

        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel();
        let join = std::thread::Builder::new()
            .name("attention-loop".to_string())
            .spawn(move || {
                let started = Instant::now();
                self.drive(&worker_cancel);
                let report = self.finish(started);
                if tx.send(report).is_err() {
                    log::warn!("attention loop report dropped: session handle gone");
                }
            })?;

        Ok(SessionHandle {
            cancel,
            join: Some(join),
            result: rx,
        })
    }

    /// One loop iteration. Returns the window closed on this tick, if any.
    pub fn tick(&mut self) -> Option<WindowScore> {
        self.state.stats.ticks += 1;
        self.state.window_tick = self.state.window_tick.saturating_add(1);
        let tick = self.state.stats.ticks;

        let frame = match self.source.next_frame() {
            Ok(frame) => Some(frame),
            Err(err) => {
                self.state.stats.frames_dropped += 1;
                log::debug!("tick {}: frame read failed: {:#}", tick, err);
                None
            }
        };

        let gaze = frame.as_ref().and_then(|frame| self.observe_gaze(frame));
        if gaze.is_some_and(GazeState::is_centered) {
            self.state.centered += 1;
        }

        let closed = if self.state.window_tick < self.config.frames_per_window {
            None
        } else if let Some(frame) = frame.as_ref() {
            Some(self.close_window(frame))
        } else {
            self.state.stats.windows_deferred += 1;
            log::debug!("tick {}: window due without a frame, deferred", tick);
            None
        };

        let observation = FrameObservation {
            tick,
            sequence: frame.as_ref().map(|frame| frame.sequence),
            gaze,
            last_window_score: self.state.windows.last().map(|w| w.score),
            emotion: self.state.last_emotion,
        };
        log::debug!(
            "frame {}: score={} gaze={} emotion={}",
            tick,
            observation
                .last_window_score
                .map_or_else(|| "-".to_string(), |s| format!("{:.3}", s)),
            observation.gaze.map_or("-", GazeState::as_str),
            observation.emotion
        );
        self.state.last_observation = Some(observation);

        closed
    }

    fn observe_gaze(&mut self, frame: &Frame) -> Option<GazeState> {
        let view = frame.view();
        let landmarks = match self.detector.detect(&view) {
            Ok(Some(landmarks)) => landmarks,
            Ok(None) => {
                self.state.stats.faces_missing += 1;
                log::debug!("frame {}: no face", frame.sequence);
                return None;
            }
            Err(err) => {
                self.state.stats.detector_errors += 1;
                log::debug!("frame {}: landmark detector failed: {:#}", frame.sequence, err);
                return None;
            }
        };

        let pose = self
            .estimator
            .head(&landmarks, frame.width, frame.height)
            .and_then(|head| {
                let iris = self.estimator.iris(&landmarks, frame.width, frame.height)?;
                Ok((head, iris))
            });
        let (head, iris) = match pose {
            Ok(pose) => pose,
            Err(err) => {
                self.state.stats.pose_failures += 1;
                log::debug!("frame {}: pose solve failed: {}", frame.sequence, err);
                return None;
            }
        };

        let state = self.gaze.classify(&head, Some(&iris));
        self.state.stats.gaze_samples += 1;
        if state.is_centered() {
            self.state.stats.centered_samples += 1;
        }
        Some(state)
    }

    fn sample_emotion(&mut self, frame: &Frame) -> EmotionLabel {
        match self.emotion.classify(&frame.view()) {
            Ok(label) => {
                self.state.stats.emotion_samples += 1;
                self.state.last_emotion = label;
            }
            Err(err) => {
                self.state.stats.emotion_failures += 1;
                log::debug!(
                    "frame {}: emotion classifier failed, keeping {}: {:#}",
                    frame.sequence,
                    self.state.last_emotion,
                    err
                );
            }
        }
        self.state.last_emotion
    }

    /// A deferred window still holds at most `frames_per_window` centered
    /// samples: every tick past the due point failed to read except this one.
    fn close_window(&mut self, frame: &Frame) -> WindowScore {
        let emotion = self.sample_emotion(frame);
        let gaze_ratio = self.state.centered as f64 / self.config.frames_per_window as f64;
        let window = self.scorer.window_score(gaze_ratio, emotion);
        self.state.windows.push(window);
        self.state.centered = 0;
        self.state.window_tick = 0;
        log::info!(
            "window {} closed: score={:.3} gaze_ratio={:.2} emotion={}",
            self.state.windows.len(),
            window.score,
            window.gaze_ratio,
            window.emotion
        );
        window
    }

    fn drive(&mut self, cancel: &CancelToken) {
        let mut last_health_log = Instant::now();
        while self.state.phase == SessionPhase::Running {
            if cancel.is_cancelled() {
                log::info!("attention loop cancelled after {} ticks", self.state.stats.ticks);
                self.state.phase = SessionPhase::Stopping;
                break;
            }
            if let Some(max) = self.config.max_frames {
                if self.state.stats.ticks >= max {
                    log::info!("attention loop reached frame cap ({})", max);
                    self.state.phase = SessionPhase::Stopping;
                    break;
                }
            }

            self.tick();

            if last_health_log.elapsed() >= self.config.health_log_interval {
                let source = self.source.stats();
                let stats = &self.state.stats;
                log::info!(
                    "attention health={} device={} captured={} read_failures={} ticks={} windows={} no_face={} pose_failures={}",
                    self.source.is_healthy(),
                    source.device,
                    source.frames_captured,
                    source.read_failures,
                    stats.ticks,
                    self.state.windows.len(),
                    stats.faces_missing,
                    stats.pose_failures
                );
                last_health_log = Instant::now();
            }
        }
    }

    fn finish(&mut self, started: Instant) -> SessionReport {
        self.source.release();
        self.opened = false;
        self.state.phase = SessionPhase::Stopped;

        let score = self.state.score();
        let report = SessionReport {
            score: score.score,
            window_count: score.window_count,
            insufficient_data: score.is_insufficient(),
            windows: self.state.windows.clone(),
            detected_emotion: self.state.last_emotion,
            frames: self.state.stats.ticks,
            stats: self.state.stats.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        log::info!(
            "attention loop stopped: score={:.3} windows={} frames={}",
            report.score,
            report.window_count,
            report.frames
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::ScriptedEmotion;
    use crate::ingest::SyntheticSource;
    use crate::landmarks::{FaceScript, SyntheticFaceDetector};

    fn build(
        config: SessionConfig,
        source: SyntheticSource,
        faces: Vec<FaceScript>,
        emotion: ScriptedEmotion,
    ) -> AttentionLoop {
        AttentionLoop::new(
            config,
            Box::new(source),
            Box::new(SyntheticFaceDetector::new(faces)),
            Box::new(emotion),
        )
        .unwrap()
    }

    fn window_of(n: u32) -> SessionConfig {
        SessionConfig {
            frames_per_window: n,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let err = AttentionLoop::new(
            window_of(0),
            Box::new(SyntheticSource::unpaced("stub://test")),
            Box::new(SyntheticFaceDetector::frontal()),
            Box::new(ScriptedEmotion::default()),
        )
        .err()
        .expect("zero window should be rejected");
        assert!(matches!(err, SessionError::InvalidConfig(_)));
    }

    #[test]
    fn window_closes_every_n_ticks() {
        let mut attention = build(
            window_of(3),
            SyntheticSource::unpaced("stub://test"),
            vec![FaceScript::Frontal],
            ScriptedEmotion::constant(EmotionLabel::Happy),
        );
        attention.open().unwrap();

        assert!(attention.tick().is_none());
        assert!(attention.tick().is_none());
        let window = attention.tick().expect("third tick closes the window");
        assert_eq!(window.gaze_ratio, 1.0);
        assert_eq!(window.emotion, EmotionLabel::Happy);
        assert_eq!(window.score, 1.0);
        assert_eq!(attention.state().window_progress(), 0);
        assert_eq!(attention.state().centered_in_window(), 0);
    }

    #[test]
    fn missing_faces_do_not_count_as_centered() {
        let mut attention = build(
            window_of(4),
            SyntheticSource::unpaced("stub://test"),
            vec![FaceScript::Frontal, FaceScript::Absent],
            ScriptedEmotion::constant(EmotionLabel::Neutral),
        );
        attention.open().unwrap();

        let window = (0..4).find_map(|_| attention.tick()).expect("window");
        assert_eq!(window.gaze_ratio, 0.5);
        assert_eq!(window.score, 0.5);
        assert_eq!(attention.state().stats().faces_missing, 2);
    }

    #[test]
    fn due_window_waits_for_a_frame() {
        let mut attention = build(
            window_of(2),
            SyntheticSource::unpaced("stub://flaky").with_fail_every(2),
            vec![FaceScript::Frontal],
            ScriptedEmotion::constant(EmotionLabel::Happy),
        );
        attention.open().unwrap();

        assert!(attention.tick().is_none());
        assert!(attention.tick().is_none());
        assert_eq!(attention.state().window_progress(), 2);
        assert!(attention.state().windows().is_empty());

        let first = attention.tick().expect("next frame closes the due window");
        assert_eq!(first.gaze_ratio, 1.0);
        assert_eq!(first.score, 1.0);
        assert_eq!(attention.state().window_progress(), 0);

        assert!(attention.tick().is_none());
        let second = attention.tick().expect("second window");
        assert_eq!(second.gaze_ratio, 0.5);
        assert_eq!(attention.state().stats().windows_deferred, 1);
        assert_eq!(attention.state().stats().emotion_samples, 2);
    }

    #[test]
    fn emotion_failure_keeps_last_label() {
        let mut attention = build(
            window_of(1),
            SyntheticSource::unpaced("stub://test"),
            vec![FaceScript::Frontal],
            ScriptedEmotion::new(vec![Some(EmotionLabel::Sad), None]),
        );
        attention.open().unwrap();

        assert_eq!(attention.tick().map(|w| w.emotion), Some(EmotionLabel::Sad));
        assert_eq!(attention.tick().map(|w| w.emotion), Some(EmotionLabel::Sad));
        let stats = attention.state().stats();
        assert_eq!(stats.emotion_samples, 1);
        assert_eq!(stats.emotion_failures, 1);
    }

    #[test]
    fn last_observation_tracks_the_latest_tick() {
        let mut attention = build(
            window_of(2),
            SyntheticSource::unpaced("stub://test"),
            vec![FaceScript::Frontal, FaceScript::Absent],
            ScriptedEmotion::constant(EmotionLabel::Happy),
        );
        attention.open().unwrap();
        assert!(attention.state().last_observation().is_none());

        attention.tick();
        let first = *attention.state().last_observation().expect("observation");
        assert_eq!(first.tick, 1);
        assert_eq!(first.sequence, Some(1));
        assert_eq!(first.gaze, Some(GazeState::Centered));
        assert_eq!(first.last_window_score, None);

        attention.tick();
        let second = *attention.state().last_observation().expect("observation");
        assert_eq!(second.gaze, None);
        assert_eq!(second.last_window_score, Some(0.75));
        assert_eq!(second.emotion, EmotionLabel::Happy);
    }

    #[test]
    fn run_stops_at_frame_cap_and_releases_camera() {
        let config = SessionConfig {
            max_frames: Some(10),
            ..window_of(5)
        };
        let attention = build(
            config,
            SyntheticSource::unpaced("stub://test"),
            vec![FaceScript::Frontal],
            ScriptedEmotion::constant(EmotionLabel::Neutral),
        );
        let report = attention.run(&CancelToken::new()).unwrap();
        assert_eq!(report.frames, 10);
        assert_eq!(report.window_count, 2);
        assert!(!report.insufficient_data);
        assert!((report.score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn health_log_reads_source_counters() {
        let config = SessionConfig {
            max_frames: Some(6),
            health_log_interval: Duration::ZERO,
            ..window_of(3)
        };
        let attention = build(
            config,
            SyntheticSource::unpaced("stub://test").with_fail_every(3),
            vec![FaceScript::Frontal],
            ScriptedEmotion::constant(EmotionLabel::Happy),
        );
        let report = attention.run(&CancelToken::new()).unwrap();
        assert_eq!(report.frames, 6);
        assert_eq!(report.stats.frames_dropped, 2);
        assert_eq!(report.window_count, 1);
    }

    #[test]
    fn cancelled_before_start_reports_no_windows() {
        let attention = build(
            window_of(5),
            SyntheticSource::unpaced("stub://test"),
            vec![FaceScript::Frontal],
            ScriptedEmotion::default(),
        );
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = attention.run(&cancel).unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(report.window_count, 0);
        assert_eq!(report.score, 0.0);
        assert!(report.insufficient_data);
        assert_eq!(report.detected_emotion, EmotionLabel::Neutral);
    }
}
