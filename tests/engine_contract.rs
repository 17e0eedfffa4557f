use solar_qc::config::EngineConfig;
use solar_qc::detect::{geometry, DetectionEngine, SimulatedBackend, SimulationProfile};
use solar_qc::{DetectError, DetectionReport, DetectionRequest, QcStatus};

fn engine_with(profile: SimulationProfile, seed: u64) -> DetectionEngine {
    DetectionEngine::new(SimulatedBackend::seeded(profile, seed), EngineConfig::default())
}

fn two_decimal(value: f64) -> bool {
    ((value * 100.0).round() - value * 100.0).abs() < 1e-9
}

fn one_decimal(value: f64) -> bool {
    ((value * 10.0).round() - value * 10.0).abs() < 1e-9
}

#[test]
fn bangalore_large_installation_scenario() {
    let engine = engine_with(SimulationProfile::pinned(0.92, 14), 101);
    let report = engine
        .detect(&DetectionRequest::new("S1", 12.9716, 77.5946))
        .expect("detection");

    assert_eq!(report.sample_id, "S1");
    assert_eq!(report.lat, 12.9716);
    assert_eq!(report.lon, 77.5946);
    assert!(report.has_solar);
    assert_eq!(report.confidence, 0.92);
    assert_eq!(report.panel_count_est, 14);
    assert_eq!(report.pv_area_sqm_est, 23.8);
    assert_eq!(report.capacity_kw_est, 4.3);
    assert_eq!(report.qc_status, QcStatus::Verifiable);
    assert!(report.qc_notes.iter().any(|note| note == "clear roof view"));
    assert_eq!(
        report.qc_notes.last().map(String::as_str),
        Some("large installation detected")
    );
    assert_eq!(report.bbox_or_mask.split(';').count(), 14);
}

#[test]
fn low_confidence_scenario_is_not_verifiable() {
    let engine = engine_with(SimulationProfile::pinned(0.45, 3), 5);
    let report = engine
        .detect(&DetectionRequest::new("S2", 17.38, 78.48))
        .expect("detection");

    assert_eq!(report.confidence, 0.45);
    assert_eq!(report.qc_status, QcStatus::NotVerifiable);
    assert_eq!(
        report.qc_notes,
        vec![
            "insufficient image quality".to_string(),
            "heavy shadow/cloud cover".to_string(),
        ]
    );
}

#[test]
fn marginal_band_keeps_notes_regardless_of_verdict() {
    let engine = engine_with(SimulationProfile::pinned(0.60, 5), 23);
    for _ in 0..10 {
        let report = engine
            .detect(&DetectionRequest::new("S3", 13.08, 80.27))
            .expect("detection");
        assert_eq!(
            report.qc_notes,
            vec![
                "low resolution imagery".to_string(),
                "partial occlusion detected".to_string(),
            ]
        );
    }
}

#[test]
fn no_solar_reports_are_fully_zeroed() {
    let engine = engine_with(SimulationProfile::absent(0.31), 9);
    for _ in 0..20 {
        let report = engine
            .detect(&DetectionRequest::new("S4", 23.02, 72.57))
            .expect("detection");
        assert!(!report.has_solar);
        assert_eq!(report.panel_count_est, 0);
        assert_eq!(report.pv_area_sqm_est, 0.0);
        assert_eq!(report.capacity_kw_est, 0.0);
        assert_eq!(report.bbox_or_mask, "");
        assert_eq!(report.qc_status, QcStatus::NotVerifiable);
        assert!(!report.qc_notes.is_empty());
    }
}

#[test]
fn default_profile_reports_satisfy_the_contract() {
    for seed in 0..40 {
        let engine = engine_with(SimulationProfile::default(), seed);
        let request = DetectionRequest::new(format!("S-{seed}"), 12.0 + seed as f64 * 0.1, 77.0);
        let report = engine.detect(&request).expect("detection");

        // Echo fields come back untouched.
        assert_eq!(report.sample_id, request.sample_id);
        assert_eq!(report.lat, request.lat);
        assert_eq!(report.lon, request.lon);

        assert!(two_decimal(report.confidence), "confidence {}", report.confidence);
        assert!(one_decimal(report.pv_area_sqm_est));
        assert!(one_decimal(report.capacity_kw_est));

        if report.has_solar {
            assert!((4..=23).contains(&report.panel_count_est));
            assert!((0.75..=0.99).contains(&report.confidence));

            let expected_area =
                (report.panel_count_est as f64 * 1.7 * 10.0).round() / 10.0;
            assert_eq!(report.pv_area_sqm_est, expected_area);
            let expected_capacity =
                (report.pv_area_sqm_est * 0.18 * 10.0).round() / 10.0;
            assert_eq!(report.capacity_kw_est, expected_capacity);

            assert_eq!(
                report.bbox_or_mask.split(';').count() as u32,
                report.panel_count_est
            );
        } else {
            assert!((0.10..=0.40).contains(&report.confidence));
            assert_eq!(report.panel_count_est, 0);
            assert_eq!(report.pv_area_sqm_est, 0.0);
            assert_eq!(report.capacity_kw_est, 0.0);
            assert_eq!(report.bbox_or_mask, "");
        }
        assert!(!report.qc_notes.is_empty());
    }
}

#[test]
fn every_generated_box_satisfies_the_grammar() {
    let engine = engine_with(SimulationProfile::pinned(0.9, 23), 77);
    let report = engine
        .detect(&DetectionRequest::new("S5", 26.85, 80.95))
        .expect("detection");

    let boxes = geometry::decode_boxes(&report.bbox_or_mask).expect("grammar");
    assert_eq!(boxes.len(), 23);
    for parsed in boxes {
        assert!(parsed.w > 0);
        assert!(parsed.h > 0);
        let confidence = parsed.confidence.expect("confidence serialized");
        assert!((0.82..1.0).contains(&confidence));
    }
}

#[test]
fn invalid_input_is_rejected_before_scoring() {
    let engine = engine_with(SimulationProfile::default(), 1);
    for request in [
        DetectionRequest::new("", 12.0, 77.0),
        DetectionRequest::new("S1", 91.0, 77.0),
        DetectionRequest::new("S1", 12.0, -200.0),
        DetectionRequest::new("S1", f64::INFINITY, 77.0),
    ] {
        let err = engine.detect(&request).expect_err("must reject");
        assert!(matches!(
            err.downcast_ref::<DetectError>(),
            Some(DetectError::InvalidInput(_))
        ));
    }
}

#[test]
fn degraded_report_lets_review_proceed() {
    let request = DetectionRequest::new("S6", 11.0, 76.0);
    let report = DetectionReport::detection_unavailable(&request);
    assert_eq!(report.qc_status, QcStatus::NotVerifiable);
    assert_eq!(
        report.qc_notes,
        vec!["automated detection unavailable".to_string()]
    );
    assert!(!report.has_solar);
    assert_eq!(report.bbox_or_mask, "");
}

#[test]
fn capture_date_is_iso_utc() {
    let engine = engine_with(SimulationProfile::default(), 3);
    let report = engine
        .detect(&DetectionRequest::new("S7", 12.0, 77.0))
        .expect("detection");
    assert_eq!(report.image_metadata.source, "Satellite/Manual Upload");
    let date = &report.image_metadata.capture_date;
    assert_eq!(date.len(), 10);
    assert_eq!(date.as_bytes()[4], b'-');
    assert_eq!(date.as_bytes()[7], b'-');
}
