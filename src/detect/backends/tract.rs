#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{
    DetectionBackend, DetectionCapability, PresenceEstimate, SampleInput,
};
use crate::detect::geometry::PanelBox;

/// Tract-based presence classifier for ONNX models.
///
/// Scores already-decoded RGB imagery at the model's input size; decoding and
/// resizing happen upstream. The adapter covers presence only, so the engine
/// falls back to an unavailable-detection failure when asked to quantify or
/// localize through it.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    presence_threshold: f64,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            presence_threshold: 0.5,
        })
    }

    /// Override the default presence threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.presence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8]) -> Result<Tensor> {
        let expected_len = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("model dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected_len,
                self.width,
                self.height,
                pixels.len()
            ));
        }

        let width = self.width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn extract_score(&self, outputs: TVec<TValue>) -> Result<f64> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let max_score = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if max_score.is_finite() {
            Ok(f64::from(max_score).clamp(0.0, 1.0))
        } else {
            Ok(0.0)
        }
    }
}

impl DetectionBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::Presence)
    }

    fn presence(&mut self, input: &SampleInput<'_>) -> Result<PresenceEstimate> {
        let pixels = input
            .image
            .ok_or_else(|| anyhow!("tract backend requires image bytes"))?;
        let tensor = self.build_input(pixels)?;
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let confidence = self.extract_score(outputs)?;

        Ok(PresenceEstimate {
            has_solar: confidence >= self.presence_threshold,
            confidence,
        })
    }

    fn quantify(
        &mut self,
        _input: &SampleInput<'_>,
        _estimate: &PresenceEstimate,
    ) -> Result<u32> {
        Err(anyhow!("tract backend does not quantify panel counts"))
    }

    fn localize(&mut self, _input: &SampleInput<'_>, _panel_count: u32) -> Result<Vec<PanelBox>> {
        Err(anyhow!("tract backend does not localize panels"))
    }
}
