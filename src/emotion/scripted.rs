use anyhow::{anyhow, Result};

use super::{EmotionClassifier, EmotionLabel};
use crate::frame::FrameView;

/// Scripted classifier for tests and synthetic sessions.
///
/// Cycles through its script one entry per call. A `None` entry is a
/// classifier failure.
pub struct ScriptedEmotion {
    script: Vec<Option<EmotionLabel>>,
    cursor: usize,
    calls: u64,
}

impl ScriptedEmotion {
    pub fn new(script: Vec<Option<EmotionLabel>>) -> Self {
        Self {
            script,
            cursor: 0,
            calls: 0,
        }
    }

    /// Always the same label.
    pub fn constant(label: EmotionLabel) -> Self {
        Self::new(vec![Some(label)])
    }

    /// Cycle through the given labels.
    pub fn cycle(labels: &[EmotionLabel]) -> Self {
        Self::new(labels.iter().copied().map(Some).collect())
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for ScriptedEmotion {
    fn default() -> Self {
        Self::constant(EmotionLabel::Neutral)
    }
}

impl EmotionClassifier for ScriptedEmotion {
    fn name(&self) -> &'static str {
        "scripted-emotion"
    }

    fn classify(&mut self, frame: &FrameView<'_>) -> Result<EmotionLabel> {
        self.calls += 1;
        if self.script.is_empty() {
            return Ok(EmotionLabel::Neutral);
        }
        let entry = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        entry.ok_or_else(|| anyhow!("scripted classifier failure on frame {}", frame.sequence()))
    }
}
