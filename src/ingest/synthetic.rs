//! Synthetic frame source.
//!
//! Generates a moving RGB test pattern for `stub://` devices. Used by tests
//! and by `attentiond` when no camera is configured. Read failures and open
//! failures can be scripted so the loop's skip paths can be exercised.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use super::{FrameSource, SourceConfig, SourceStats};
use crate::frame::{Frame, RGB_CHANNELS};

/// Configuration for the synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub device: String,
    /// Zero disables pacing; frames are produced as fast as they are polled.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Every `n`-th read fails (transient), when set.
    pub fail_every: Option<u64>,
    /// Opening the device fails.
    pub fail_open: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SourceConfig::default().into()
    }
}

impl From<SourceConfig> for SyntheticConfig {
    fn from(config: SourceConfig) -> Self {
        Self {
            device: config.device,
            target_fps: config.target_fps,
            width: config.width,
            height: config.height,
            fail_every: None,
            fail_open: false,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    open: bool,
    reads: u64,
    frames_captured: u64,
    read_failures: u64,
    next_due: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            open: false,
            reads: 0,
            frames_captured: 0,
            read_failures: 0,
            next_due: None,
        }
    }

    /// Unpaced source with a small frame size, for tests.
    pub fn unpaced(device: &str) -> Self {
        Self::new(SyntheticConfig {
            device: device.to_string(),
            target_fps: 0,
            width: 64,
            height: 48,
            fail_every: None,
            fail_open: false,
        })
    }

    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.config.fail_every = Some(n);
        self
    }

    pub fn with_fail_open(mut self) -> Self {
        self.config.fail_open = true;
        self
    }

    fn pace(&mut self) {
        if self.config.target_fps == 0 {
            return;
        }
        let interval = Duration::from_millis(1000 / self.config.target_fps as u64);
        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        self.next_due = Some(Instant::now() + interval);
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width as usize) * (self.config.height as usize);
        let mut pixels = vec![0u8; pixel_count * RGB_CHANNELS];
        let shift = self.frames_captured;
        for (i, px) in pixels.chunks_exact_mut(RGB_CHANNELS).enumerate() {
            let v = ((i as u64 + shift) % 256) as u8;
            px[0] = v;
            px[1] = v.wrapping_mul(3);
            px[2] = 255 - v;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn device(&self) -> &str {
        &self.config.device
    }

    fn open(&mut self) -> Result<()> {
        if self.config.fail_open {
            return Err(anyhow!("device {} is unavailable", self.config.device));
        }
        self.open = true;
        log::info!(
            "SyntheticSource: connected to {} ({}x{}, synthetic)",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(anyhow!("device {} not open", self.config.device));
        }
        self.pace();
        self.reads += 1;
        if let Some(n) = self.config.fail_every {
            if n > 0 && self.reads % n == 0 {
                self.read_failures += 1;
                return Err(anyhow!("scripted read failure on {}", self.config.device));
            }
        }
        self.frames_captured += 1;
        Ok(Frame::new(
            self.generate_pixels(),
            self.config.width,
            self.config.height,
            self.reads,
        ))
    }

    fn release(&mut self) {
        if self.open {
            log::info!("SyntheticSource: released {}", self.config.device);
        }
        self.open = false;
    }

    fn is_healthy(&self) -> bool {
        self.open
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames_captured,
            read_failures: self.read_failures,
            device: self.config.device.clone(),
        }
    }
}
