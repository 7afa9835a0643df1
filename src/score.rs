//! Window and session engagement scores.
//!
//! A window score fuses the fraction of centered-gaze ticks in the window
//! with an emotion valence:
//!
//! ```text
//! window_score = w_gaze * gaze_ratio + w_emotion * emotion_score(label)
//! ```
//!
//! The session score is the arithmetic mean of all window scores, or 0 when
//! no window closed.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionLabel;

pub const DEFAULT_GAZE_WEIGHT: f64 = 0.5;
pub const DEFAULT_EMOTION_WEIGHT: f64 = 0.5;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Valence of an emotion label in `[0, 1]`.
pub fn emotion_score(label: EmotionLabel) -> f64 {
    match label {
        EmotionLabel::Happy => 1.0,
        EmotionLabel::Sad => 0.0,
        EmotionLabel::Neutral
        | EmotionLabel::Angry
        | EmotionLabel::Disgust
        | EmotionLabel::Fear
        | EmotionLabel::Surprise => 0.5,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub gaze: f64,
    pub emotion: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            gaze: DEFAULT_GAZE_WEIGHT,
            emotion: DEFAULT_EMOTION_WEIGHT,
        }
    }
}

impl ScoreWeights {
    /// Weights must be finite, non-negative and sum to 1.
    pub fn validate(&self) -> Result<()> {
        if !self.gaze.is_finite() || !self.emotion.is_finite() {
            return Err(anyhow!("score weights must be finite"));
        }
        if self.gaze < 0.0 || self.emotion < 0.0 {
            return Err(anyhow!("score weights must be non-negative"));
        }
        let sum = self.gaze + self.emotion;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(anyhow!("score weights must sum to 1 (got {})", sum));
        }
        Ok(())
    }
}

/// Score of one closed window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WindowScore {
    pub score: f64,
    pub emotion: EmotionLabel,
    pub gaze_ratio: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EngagementScorer {
    weights: ScoreWeights,
}

impl EngagementScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// `gaze_ratio` is clamped to `[0, 1]`; NaN counts as 0.
    pub fn window_score(&self, gaze_ratio: f64, emotion: EmotionLabel) -> WindowScore {
        let gaze_ratio = if gaze_ratio.is_nan() {
            0.0
        } else {
            gaze_ratio.clamp(0.0, 1.0)
        };
        let score = self.weights.gaze * gaze_ratio + self.weights.emotion * emotion_score(emotion);
        WindowScore {
            score: score.clamp(0.0, 1.0),
            emotion,
            gaze_ratio,
        }
    }
}

/// Session-level engagement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SessionScore {
    pub score: f64,
    pub window_count: usize,
}

impl SessionScore {
    pub fn from_windows(windows: &[WindowScore]) -> Self {
        Self::from_values(windows.iter().map(|w| w.score))
    }

    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            return Self::default();
        }
        Self {
            score: sum / count as f64,
            window_count: count,
        }
    }

    /// No window closed; the score carries no information.
    pub fn is_insufficient(&self) -> bool {
        self.window_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_score_anchor_points() {
        let scorer = EngagementScorer::default();
        assert_eq!(scorer.window_score(1.0, EmotionLabel::Happy).score, 1.0);
        assert_eq!(scorer.window_score(0.0, EmotionLabel::Sad).score, 0.0);
        assert_eq!(scorer.window_score(0.5, EmotionLabel::Neutral).score, 0.5);
        assert_eq!(scorer.window_score(1.0, EmotionLabel::Fear).score, 0.75);
    }

    #[test]
    fn window_score_stays_in_unit_interval() {
        let scorer = EngagementScorer::default();
        for ratio in [-3.0, -0.1, 0.0, 0.3, 0.99, 1.0, 1.5, f64::NAN, f64::INFINITY] {
            for label in EmotionLabel::ALL {
                let w = scorer.window_score(ratio, label);
                assert!((0.0..=1.0).contains(&w.score), "{} {:?}", ratio, label);
                assert!((0.0..=1.0).contains(&w.gaze_ratio));
                assert_eq!(w.emotion, label);
            }
        }
    }

    #[test]
    fn custom_weights_shift_the_balance() {
        let scorer = EngagementScorer::new(ScoreWeights {
            gaze: 0.8,
            emotion: 0.2,
        });
        let w = scorer.window_score(0.5, EmotionLabel::Happy);
        assert!((w.score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn weights_are_validated() {
        assert!(ScoreWeights::default().validate().is_ok());
        assert!(ScoreWeights { gaze: 0.7, emotion: 0.4 }.validate().is_err());
        assert!(ScoreWeights { gaze: 1.2, emotion: -0.2 }.validate().is_err());
        assert!(ScoreWeights { gaze: f64::NAN, emotion: 0.5 }.validate().is_err());
        assert!(ScoreWeights { gaze: 1.0, emotion: 0.0 }.validate().is_ok());
    }

    #[test]
    fn session_score_is_mean_of_windows() {
        let s = SessionScore::from_values([0.2, 0.4, 0.6, 0.8]);
        assert!((s.score - 0.5).abs() < 1e-12);
        assert_eq!(s.window_count, 4);
        assert!(!s.is_insufficient());
    }

    #[test]
    fn empty_session_scores_zero() {
        let s = SessionScore::from_windows(&[]);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.window_count, 0);
        assert!(s.is_insufficient());
    }
}
