use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::detect::backend::{
    DetectionBackend, DetectionCapability, PresenceEstimate, SampleInput,
};
use crate::detect::geometry::{self, PanelBox};

/// Distribution parameters for the simulated detector.
///
/// The defaults reproduce the shipped pipeline: a 70% presence prior,
/// confidence near [0.75, 0.99] for positives and [0.10, 0.40] for negatives,
/// and 4 to 23 panels per positive. Tests and demos pin individual parameters
/// instead of patching the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationProfile {
    /// Presence fires when the uniform draw exceeds this threshold.
    pub presence_threshold: f64,
    /// Positive confidence = base + U(0,1) * spread.
    pub present_confidence_base: f64,
    pub present_confidence_spread: f64,
    /// Negative confidence = base + U(0,1) * spread.
    pub absent_confidence_base: f64,
    pub absent_confidence_spread: f64,
    /// Panel count = floor(base + U(0,1) * spread).
    pub panel_count_base: u32,
    pub panel_count_spread: f64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            presence_threshold: 0.3,
            present_confidence_base: 0.75,
            present_confidence_spread: 0.24,
            absent_confidence_base: 0.10,
            absent_confidence_spread: 0.30,
            panel_count_base: 4,
            panel_count_spread: 20.0,
        }
    }
}

impl SimulationProfile {
    /// Always-positive profile with a fixed confidence and panel count.
    pub fn pinned(confidence: f64, panel_count: u32) -> Self {
        Self {
            presence_threshold: -1.0,
            present_confidence_base: confidence,
            present_confidence_spread: 0.0,
            absent_confidence_base: confidence,
            absent_confidence_spread: 0.0,
            panel_count_base: panel_count,
            panel_count_spread: 0.0,
        }
    }

    /// Always-negative profile with a fixed confidence.
    pub fn absent(confidence: f64) -> Self {
        Self {
            presence_threshold: 2.0,
            absent_confidence_base: confidence,
            absent_confidence_spread: 0.0,
            ..Self::default()
        }
    }
}

enum SimRng {
    Thread,
    Seeded(StdRng),
}

/// Simulated detector: a deterministic-contract stand-in for real inference.
///
/// Every downstream consumer (QC table, geometry synthesis, export) sees the
/// exact shapes a trained model would produce, so swapping in a real adapter
/// later changes nothing above this backend.
pub struct SimulatedBackend {
    profile: SimulationProfile,
    rng: SimRng,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::with_profile(SimulationProfile::default())
    }

    pub fn with_profile(profile: SimulationProfile) -> Self {
        Self {
            profile,
            rng: SimRng::Thread,
        }
    }

    /// Reproducible variant: the whole run is a function of the seed.
    pub fn seeded(profile: SimulationProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: SimRng::Seeded(StdRng::seed_from_u64(seed)),
        }
    }

    /// Derive a numeric seed from an operator-supplied label.
    pub fn seed_from_label(label: &str) -> u64 {
        let digest: [u8; 32] = Sha256::digest(label.trim().as_bytes()).into();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }

    fn draw(&mut self) -> f64 {
        match &mut self.rng {
            SimRng::Thread => rand::thread_rng().gen_range(0.0..1.0),
            SimRng::Seeded(rng) => rng.gen_range(0.0..1.0),
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(
            capability,
            DetectionCapability::Presence
                | DetectionCapability::Quantification
                | DetectionCapability::Localization
        )
    }

    fn presence(&mut self, _input: &SampleInput<'_>) -> Result<PresenceEstimate> {
        let has_solar = self.draw() > self.profile.presence_threshold;
        let confidence = if has_solar {
            self.profile.present_confidence_base
                + self.draw() * self.profile.present_confidence_spread
        } else {
            self.profile.absent_confidence_base
                + self.draw() * self.profile.absent_confidence_spread
        };
        Ok(PresenceEstimate {
            has_solar,
            confidence,
        })
    }

    fn quantify(
        &mut self,
        _input: &SampleInput<'_>,
        _estimate: &PresenceEstimate,
    ) -> Result<u32> {
        let count = self.profile.panel_count_base as f64
            + self.draw() * self.profile.panel_count_spread;
        Ok(count.floor() as u32)
    }

    fn localize(&mut self, _input: &SampleInput<'_>, panel_count: u32) -> Result<Vec<PanelBox>> {
        Ok(match &mut self.rng {
            SimRng::Thread => geometry::synthesize_boxes(&mut rand::thread_rng(), panel_count),
            SimRng::Seeded(rng) => geometry::synthesize_boxes(rng, panel_count),
        })
    }
}
