//! Emotion labels and the classifier seam.
//!
//! The classifier is an external collaborator. It sees one frame view per
//! window and returns a label from a closed set. A frame without a face is
//! classified `neutral`; a failed call is handled by the session loop.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::frame::FrameView;

mod scripted;
#[cfg(feature = "backend-tract")]
mod tract;

pub use scripted::ScriptedEmotion;
#[cfg(feature = "backend-tract")]
pub use tract::{TractEmotionClassifier, EMOTION_INPUT_SIZE};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    #[default]
    Neutral,
}

impl EmotionLabel {
    /// All labels in classifier output order.
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Angry,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    /// Label for a classifier output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmotionLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == wanted)
            .ok_or_else(|| anyhow!("unknown emotion label: {}", wanted))
    }
}

/// Emotion classifier trait.
///
/// Implementations must treat the frame as read-only and ephemeral.
pub trait EmotionClassifier: Send {
    /// Classifier identifier.
    fn name(&self) -> &'static str;

    /// Dominant emotion in the frame.
    fn classify(&mut self, frame: &FrameView<'_>) -> Result<EmotionLabel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() -> Result<()> {
        assert_eq!("Happy".parse::<EmotionLabel>()?, EmotionLabel::Happy);
        assert_eq!(" surprise ".parse::<EmotionLabel>()?, EmotionLabel::Surprise);
        assert!("bored".parse::<EmotionLabel>().is_err());
        Ok(())
    }

    #[test]
    fn index_follows_classifier_order() {
        assert_eq!(EmotionLabel::from_index(0), Some(EmotionLabel::Angry));
        assert_eq!(EmotionLabel::from_index(3), Some(EmotionLabel::Happy));
        assert_eq!(EmotionLabel::from_index(6), Some(EmotionLabel::Neutral));
        assert_eq!(EmotionLabel::from_index(7), None);
    }

    #[test]
    fn serializes_lowercase() -> Result<()> {
        assert_eq!(serde_json::to_string(&EmotionLabel::Disgust)?, "\"disgust\"");
        let label: EmotionLabel = serde_json::from_str("\"fear\"")?;
        assert_eq!(label, EmotionLabel::Fear);
        assert_eq!(EmotionLabel::default(), EmotionLabel::Neutral);
        Ok(())
    }
}
