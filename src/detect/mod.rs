//! The detection pipeline.
//!
//! `DetectionEngine` orchestrates one request end to end: presence estimate,
//! panel quantification, QC verdict, box synthesis, report assembly. The
//! backend trait is the seam for swapping the simulated detector for real
//! inference without touching anything downstream.

mod backend;
mod backends;
mod engine;
pub mod geometry;
pub mod qc;
mod registry;
mod report;

pub use backend::{DetectionBackend, DetectionCapability, PresenceEstimate, SampleInput};
pub use backends::{SimulatedBackend, SimulationProfile};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use engine::DetectionEngine;
pub use registry::BackendRegistry;
pub use report::{
    derive_capacity_kw, derive_pv_area_sqm, DetectionReport, ImageMetadata, QcStatus,
    IMAGE_SOURCE_LABEL, NOTE_DETECTION_UNAVAILABLE, REFERENCE_FRAME_PX,
};

/// Build the standard registry: the simulated backend, which covers every
/// capability. Real adapters need deployment-specific assets (a model path)
/// and are registered by the caller that owns them.
pub fn standard_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(SimulatedBackend::new());
    registry
}
