//! attentiond - engagement scoring session runner
//!
//! This binary:
//! 1. Loads `EngagementConfig` (ENGAGEMENT_CONFIG file + ENGAGEMENT_* env)
//! 2. Opens the configured camera (fatal on failure)
//! 3. Runs the attention loop on a worker thread
//! 4. Stops on Ctrl-C, after `--seconds`, or at the frame cap
//! 5. Writes the session report as JSON

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use engagement_kernel::{
    detector_for_device, source_for_device, AttentionLoop, EmotionClassifier, EngagementConfig,
    ScriptedEmotion, SyntheticFaceDetector,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Stop the session after this many seconds.
    #[arg(long)]
    seconds: Option<u64>,
    /// Stop after this many frames (overrides ENGAGEMENT_MAX_FRAMES).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_frames: Option<u64>,
    /// Write the report to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Landmark jitter in pixels for the synthetic detector.
    #[arg(long, default_value_t = 0.0)]
    jitter: f64,
    /// Seed for the synthetic detector jitter.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Use the synthetic face with a real camera (wiring checks only).
    #[arg(long)]
    synthetic_face: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = EngagementConfig::load()?;
    if let Some(max_frames) = args.max_frames {
        config.max_frames = Some(max_frames);
    }

    let detector = detector_for_device(
        &config.camera.device,
        SyntheticFaceDetector::frontal().with_jitter(args.jitter, args.seed),
        args.synthetic_face,
    )?;
    let source = source_for_device(config.source_config())?;
    let emotion = build_emotion(&config)?;

    let handle =
        AttentionLoop::new(config.session_config(), source, detector, emotion)?.spawn()?;
    log::info!(
        "attentiond running. camera={} window={} frames",
        config.camera.device,
        config.frames_per_window
    );

    let cancel = handle.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("failed to set Ctrl-C handler")?;

    let deadline = args
        .seconds
        .map(|seconds| Instant::now() + Duration::from_secs(seconds));
    while !handle.is_finished() {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::info!("session time limit reached, stopping");
            handle.stop();
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let report = handle.join()?;
    let json = serde_json::to_string_pretty(&report)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            log::info!("session report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(feature = "backend-tract")]
fn build_emotion(config: &EngagementConfig) -> Result<Box<dyn EmotionClassifier>> {
    match &config.emotion_model_path {
        Some(path) => Ok(Box::new(engagement_kernel::TractEmotionClassifier::new(
            path,
        )?)),
        None => {
            log::warn!("no emotion model configured; emotion is fixed to neutral");
            Ok(Box::new(ScriptedEmotion::default()))
        }
    }
}

#[cfg(not(feature = "backend-tract"))]
fn build_emotion(config: &EngagementConfig) -> Result<Box<dyn EmotionClassifier>> {
    if let Some(path) = &config.emotion_model_path {
        log::warn!(
            "emotion model {} ignored: built without backend-tract; emotion is fixed to neutral",
            path.display()
        );
    }
    Ok(Box::new(ScriptedEmotion::default()))
}
