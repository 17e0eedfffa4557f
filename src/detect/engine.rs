use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{anyhow, Result};
use log::debug;
use rand::Rng;

use crate::config::EngineConfig;
use crate::detect::backend::{DetectionBackend, SampleInput};
use crate::detect::geometry;
use crate::detect::qc;
use crate::detect::report::{
    derive_capacity_kw, derive_pv_area_sqm, round2, DetectionReport, ImageMetadata,
};
use crate::{validate_request, DetectError, DetectionRequest};

/// Per-request scoring pipeline over a pluggable backend.
///
/// The engine owns no cross-request state: each call validates its input,
/// runs the backend, derives the physical estimates and QC verdict from one
/// underlying quality signal, and assembles an immutable report. Safe to
/// share across threads; the backend serializes behind its mutex.
pub struct DetectionEngine {
    backend: Arc<Mutex<dyn DetectionBackend>>,
    config: EngineConfig,
}

impl DetectionEngine {
    pub fn new<B: DetectionBackend + 'static>(backend: B, config: EngineConfig) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            config,
        }
    }

    /// Build on a backend already held by a registry.
    pub fn with_shared_backend(
        backend: Arc<Mutex<dyn DetectionBackend>>,
        config: EngineConfig,
    ) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score one claim sample.
    ///
    /// Rejects malformed input with `DetectError::InvalidInput` before any
    /// scoring. Backend failures surface as `DetectError::DetectionUnavailable`
    /// and never yield a partially-populated report.
    pub fn detect(&self, request: &DetectionRequest) -> Result<DetectionReport> {
        validate_request(request)?;
        let started = Instant::now();

        let input = SampleInput {
            sample_id: &request.sample_id,
            lat: request.lat,
            lon: request.lon,
            image: request.image.as_deref(),
        };

        let (estimate, panel_count, boxes) = {
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow!("detection backend lock poisoned"))?;

            let estimate = backend.presence(&input).map_err(|e| {
                DetectError::DetectionUnavailable(format!("presence estimate failed: {}", e))
            })?;

            if estimate.has_solar {
                let panel_count = backend.quantify(&input, &estimate).map_err(|e| {
                    DetectError::DetectionUnavailable(format!("quantification failed: {}", e))
                })?;
                let boxes = backend.localize(&input, panel_count).map_err(|e| {
                    DetectError::DetectionUnavailable(format!("localization failed: {}", e))
                })?;
                if boxes.len() as u32 != panel_count {
                    return Err(DetectError::DetectionUnavailable(format!(
                        "localizer emitted {} boxes for {} panels",
                        boxes.len(),
                        panel_count
                    ))
                    .into());
                }
                (estimate, panel_count, boxes)
            } else {
                (estimate, 0, Vec::new())
            }
        };

        // The rounded confidence is both the displayed value and the QC
        // input, so the verdict can never disagree with the score.
        let confidence = round2(estimate.confidence.clamp(0.0, 1.0));
        let mut verdict = qc::evaluate(confidence, rand::thread_rng().gen_bool(0.5));
        verdict.annotate_panel_count(estimate.has_solar, panel_count);

        let calibration = self.config.calibration;
        let pv_area_sqm_est = if estimate.has_solar {
            derive_pv_area_sqm(panel_count, calibration.avg_panel_area_sqm)
        } else {
            0.0
        };
        let capacity_kw_est = if estimate.has_solar {
            derive_capacity_kw(pv_area_sqm_est, calibration.watt_per_sqm)
        } else {
            0.0
        };

        let report = DetectionReport {
            sample_id: request.sample_id.clone(),
            lat: request.lat,
            lon: request.lon,
            has_solar: estimate.has_solar,
            confidence,
            panel_count_est: panel_count,
            pv_area_sqm_est,
            capacity_kw_est,
            qc_status: verdict.status,
            qc_notes: verdict.notes,
            bbox_or_mask: geometry::encode_boxes(&boxes),
            image_metadata: ImageMetadata::captured_today(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        debug!(
            "sample {}: has_solar={} confidence={:.2} panels={} qc={}",
            report.sample_id,
            report.has_solar,
            report.confidence,
            report.panel_count_est,
            report.qc_status.as_str()
        );

        Ok(report)
    }
}
