#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use super::{EmotionClassifier, EmotionLabel};
use crate::frame::FrameView;

/// Side length of the square grayscale model input.
pub const EMOTION_INPUT_SIZE: usize = 48;

/// Tract-based emotion classifier for FER-style ONNX models.
///
/// The model takes a `1x1x48x48` grayscale tensor in `[0, 1]` and emits seven
/// logits in label order (angry, disgust, fear, happy, sad, surprise,
/// neutral). The whole frame is downsampled; no face crop is taken.
pub struct TractEmotionClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
}

impl TractEmotionClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 1, EMOTION_INPUT_SIZE, EMOTION_INPUT_SIZE),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!("TractEmotionClassifier: loaded {}", model_path.display());
        Ok(Self { model })
    }

    fn build_input(&self, frame: &FrameView<'_>) -> Result<Tensor> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(anyhow!("empty frame {}x{}", width, height));
        }
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if frame.pixels().len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                frame.pixels().len()
            ));
        }

        // Nearest-neighbour downsample to luma.
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 1, EMOTION_INPUT_SIZE, EMOTION_INPUT_SIZE),
            |(_, _, y, x)| {
                let sx = (x * width as usize / EMOTION_INPUT_SIZE) as u32;
                let sy = (y * height as usize / EMOTION_INPUT_SIZE) as u32;
                let [r, g, b] = frame.rgb_at(sx, sy).unwrap_or([0, 0, 0]);
                (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0
            },
        );

        Ok(input.into_tensor())
    }
}

impl EmotionClassifier for TractEmotionClassifier {
    fn name(&self) -> &'static str {
        "tract-emotion"
    }

    fn classify(&mut self, frame: &FrameView<'_>) -> Result<EmotionLabel> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let logits = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let (index, _) = logits
            .iter()
            .take(EmotionLabel::ALL.len())
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| anyhow!("model produced no finite logits"))?;
        EmotionLabel::from_index(index).ok_or_else(|| anyhow!("logit index {} out of range", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_fails_to_load() {
        assert!(TractEmotionClassifier::new("/nonexistent/emotion.onnx").is_err());
    }
}
