use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::DetectionRequest;

/// Side length of the fixed reference frame, in pixels. Panel boxes are
/// expressed in this frame regardless of the resolution of the source imagery.
pub const REFERENCE_FRAME_PX: u32 = 640;

/// Imagery provenance label recorded on every report.
pub const IMAGE_SOURCE_LABEL: &str = "Satellite/Manual Upload";

/// Note recorded when the calling workflow degrades a failed detection so
/// human review can still proceed.
pub const NOTE_DETECTION_UNAVAILABLE: &str = "automated detection unavailable";

/// Verdict on whether a detection is reliable enough for a reviewer to act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QcStatus {
    Verifiable,
    NotVerifiable,
}

impl QcStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcStatus::Verifiable => "VERIFIABLE",
            QcStatus::NotVerifiable => "NOT_VERIFIABLE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub source: String,
    /// UTC capture date, `YYYY-MM-DD`.
    pub capture_date: String,
}

impl ImageMetadata {
    /// Metadata stamped with today's UTC date.
    pub fn captured_today() -> Self {
        Self {
            source: IMAGE_SOURCE_LABEL.to_string(),
            capture_date: Utc::now().format("%Y-%m-%d").to_string(),
        }
    }
}

/// One scored claim sample. Immutable once produced; a new request yields a
/// new independent report.
///
/// Field names are the wire contract consumed by the review workflow and the
/// audit export, so they stay exactly as serialized here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub sample_id: String,
    pub lat: f64,
    pub lon: f64,
    pub has_solar: bool,
    /// In [0, 1], rounded to 2 decimals. The same rounded value drives the
    /// QC verdict, so status and confidence can never disagree.
    pub confidence: f64,
    pub panel_count_est: u32,
    /// `panel_count_est * avg_panel_area_sqm`, rounded to 1 decimal.
    pub pv_area_sqm_est: f64,
    /// `pv_area_sqm_est * watt_per_sqm / 1000`, rounded to 1 decimal.
    /// Derived from the already-rounded area.
    pub capacity_kw_est: f64,
    pub qc_status: QcStatus,
    /// Reviewer-facing notes, insertion order = evaluation order.
    pub qc_notes: Vec<String>,
    /// `"[x,y,w,h,conf];..."` in the reference frame, empty when no solar.
    pub bbox_or_mask: String,
    pub image_metadata: ImageMetadata,
    /// Wall-clock latency of the pipeline, measured not simulated.
    pub processing_time_ms: u64,
}

impl DetectionReport {
    /// Degraded report for a claim whose detection backend was unreachable.
    ///
    /// The calling workflow records this instead of blocking review: every
    /// estimate is zeroed and the single note tells the reviewer why.
    pub fn detection_unavailable(request: &DetectionRequest) -> Self {
        Self {
            sample_id: request.sample_id.clone(),
            lat: request.lat,
            lon: request.lon,
            has_solar: false,
            confidence: 0.0,
            panel_count_est: 0,
            pv_area_sqm_est: 0.0,
            capacity_kw_est: 0.0,
            qc_status: QcStatus::NotVerifiable,
            qc_notes: vec![NOTE_DETECTION_UNAVAILABLE.to_string()],
            bbox_or_mask: String::new(),
            image_metadata: ImageMetadata::captured_today(),
            processing_time_ms: 0,
        }
    }
}

// -------------------- Derived Estimates --------------------

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Array area estimate for a panel count, rounded to 1 decimal.
pub fn derive_pv_area_sqm(panel_count: u32, avg_panel_area_sqm: f64) -> f64 {
    round1(panel_count as f64 * avg_panel_area_sqm)
}

/// Capacity estimate for an (already rounded) area, rounded to 1 decimal.
pub fn derive_capacity_kw(pv_area_sqm: f64, watt_per_sqm: f64) -> f64 {
    round1(pv_area_sqm * watt_per_sqm / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivations_chain_through_rounded_area() {
        // 14 panels: 14 * 1.7 = 23.8, then 23.8 * 0.18 = 4.284 -> 4.3
        let area = derive_pv_area_sqm(14, 1.7);
        assert_eq!(area, 23.8);
        assert_eq!(derive_capacity_kw(area, 180.0), 4.3);
    }

    #[test]
    fn derivations_hold_across_panel_counts() {
        for count in 0..=40 {
            let area = derive_pv_area_sqm(count, 1.7);
            let expected_area = (count as f64 * 1.7 * 10.0).round() / 10.0;
            assert_eq!(area, expected_area, "area for {} panels", count);

            let capacity = derive_capacity_kw(area, 180.0);
            let expected_capacity = (area * 0.18 * 10.0).round() / 10.0;
            assert_eq!(capacity, expected_capacity, "capacity for {} panels", count);
        }
    }

    #[test]
    fn qc_status_wire_form_is_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&QcStatus::Verifiable).unwrap(),
            "\"VERIFIABLE\""
        );
        assert_eq!(
            serde_json::to_string(&QcStatus::NotVerifiable).unwrap(),
            "\"NOT_VERIFIABLE\""
        );
    }

    #[test]
    fn unavailable_report_is_internally_consistent() {
        let request = crate::DetectionRequest::new("S9", 28.61, 77.23);
        let report = DetectionReport::detection_unavailable(&request);
        assert!(!report.has_solar);
        assert_eq!(report.panel_count_est, 0);
        assert_eq!(report.pv_area_sqm_est, 0.0);
        assert_eq!(report.capacity_kw_est, 0.0);
        assert_eq!(report.bbox_or_mask, "");
        assert_eq!(report.qc_status, QcStatus::NotVerifiable);
        assert_eq!(report.qc_notes, vec![NOTE_DETECTION_UNAVAILABLE.to_string()]);
    }

    #[test]
    fn report_serializes_with_contract_field_names() {
        let request = crate::DetectionRequest::new("S1", 12.9716, 77.5946);
        let report = DetectionReport::detection_unavailable(&request);
        let json = serde_json::to_value(&report).unwrap();
        for field in [
            "sample_id",
            "lat",
            "lon",
            "has_solar",
            "confidence",
            "panel_count_est",
            "pv_area_sqm_est",
            "capacity_kw_est",
            "qc_status",
            "qc_notes",
            "bbox_or_mask",
            "image_metadata",
            "processing_time_ms",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert!(json["image_metadata"].get("source").is_some());
        assert!(json["image_metadata"].get("capture_date").is_some());
    }
}
