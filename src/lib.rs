//! Rooftop-Solar Detection QC Engine
//!
//! Citizens submit rooftop-solar installation claims with coordinates and
//! optional imagery. This crate turns one claim sample into a structured
//! detection report: a solar-presence verdict, a confidence score, physical
//! estimates (panel count, array area, capacity), a quality-control status
//! with reviewer-facing notes, and a serialized set of panel bounding boxes.
//!
//! The engine is invoked per request, holds no cross-request state and is safe
//! to call concurrently. Upstream concerns (claim CRUD, imagery resolution,
//! persistence) live in the calling workflow; this crate only scores what it
//! is handed and reports back.
//!
//! # Module Structure
//!
//! - `detect`: the scoring pipeline (presence, quantification, QC, geometry)
//! - `config`: calibration constants and backend selection
//! - `export`: CSV/JSON audit artifacts for reviewer download

use serde::{Deserialize, Serialize};

pub mod config;
pub mod detect;
pub mod export;

pub use detect::{
    BackendRegistry, DetectionBackend, DetectionCapability, DetectionEngine, DetectionReport,
    ImageMetadata, PresenceEstimate, QcStatus, SampleInput, SimulatedBackend, SimulationProfile,
    REFERENCE_FRAME_PX,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;

// -------------------- Request --------------------

/// One claim sample handed to the engine.
///
/// `image` carries already-resolved bytes when the claim included imagery.
/// Fetching and decoding failures are the caller's concern; the engine treats
/// the handle as opaque.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionRequest {
    pub sample_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
}

impl DetectionRequest {
    pub fn new(sample_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            sample_id: sample_id.into(),
            lat,
            lon,
            image: None,
        }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

// -------------------- Errors --------------------

/// Engine-level failure classes surfaced to the calling workflow.
///
/// `InvalidInput` is rejected synchronously before any scoring occurs.
/// `DetectionUnavailable` marks a backend failure and is retryable with
/// bounded backoff; review can still proceed on a degraded report via
/// [`DetectionReport::detection_unavailable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectError {
    InvalidInput(String),
    DetectionUnavailable(String),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            DetectError::DetectionUnavailable(msg) => {
                write!(f, "detection unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for DetectError {}

// -------------------- Input Discipline --------------------

/// Reject malformed requests before the pipeline runs.
///
/// Coordinates must be finite and inside WGS84 bounds; the sample identifier
/// must be non-blank. Anything else is an `InvalidInput` failure, never a
/// half-populated report.
pub fn validate_request(request: &DetectionRequest) -> Result<(), DetectError> {
    if request.sample_id.trim().is_empty() {
        return Err(DetectError::InvalidInput(
            "sample_id must not be blank".to_string(),
        ));
    }
    if !request.lat.is_finite() || !(-90.0..=90.0).contains(&request.lat) {
        return Err(DetectError::InvalidInput(format!(
            "latitude {} outside [-90, 90]",
            request.lat
        )));
    }
    if !request.lon.is_finite() || !(-180.0..=180.0).contains(&request.lon) {
        return Err(DetectError::InvalidInput(format!(
            "longitude {} outside [-180, 180]",
            request.lon
        )));
    }
    Ok(())
}
