//! Frame ingestion sources.
//!
//! This module provides the sources the attention loop pulls frames from:
//! - Synthetic source (`stub://` devices, tests and demos)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! The ingestion layer is responsible for:
//! - Opening the device (fatal on failure, reported before the loop starts)
//! - Producing one `Frame` per call, pacing to the target frame rate
//! - Releasing the device when the loop stops
//!
//! A failed `next_frame` is a transient condition. The loop drops the tick
//! and keeps polling; sources must not treat one failed read as terminal.

use anyhow::Result;

use crate::frame::Frame;

pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// Configuration shared by all frame sources.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Device path (e.g., "/dev/video0") or "stub://name" for synthetic frames.
    pub device: String,
    /// Target frame rate. Zero disables pacing (synthetic sources only).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            target_fps: 15,
            width: 640,
            height: 480,
        }
    }
}

/// A camera-like frame source, exclusively owned by one attention loop.
pub trait FrameSource: Send {
    /// Device identifier for logs.
    fn device(&self) -> &str;

    /// Open the device. Failure here aborts the session before it starts.
    fn open(&mut self) -> Result<()>;

    /// Capture the next frame. Errors are transient and skipped by the caller.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Release the device. Called once when the loop stops.
    fn release(&mut self);

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Get frame statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub read_failures: u64,
    pub device: String,
}

/// Build a frame source for the configured device.
///
/// `stub://` devices always resolve to the synthetic source. Real device
/// paths need the `ingest-v4l2` feature.
pub fn source_for_device(config: SourceConfig) -> Result<Box<dyn FrameSource>> {
    if config.device.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(config.into())));
    }
    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Source::new(config)))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        Err(anyhow::anyhow!(
            "camera {} requires the ingest-v4l2 feature",
            config.device
        ))
    }
}
