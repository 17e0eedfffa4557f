//! Audit export of detection reports.
//!
//! Reviewers download flattened reports for offline audit. Every field is
//! preserved verbatim; CSV cells containing separators, quotes or line breaks
//! are quoted with embedded quotes doubled. Each artifact carries a sha256
//! manifest so a downloaded copy can be checked against what was produced.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::detect::DetectionReport;

/// Column order of the CSV flattening. `qc_notes` is joined with `"; "` and
/// `image_metadata` is split into its two fields.
pub const CSV_COLUMNS: [&str; 14] = [
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
    "image_source",
    "capture_date",
    "processing_time_ms",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(anyhow!("unknown export format '{}'", other)),
        }
    }
}

/// Integrity record written alongside an export payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportManifest {
    pub report_count: usize,
    pub format: ExportFormat,
    /// Hex sha256 of the payload bytes.
    pub sha256: String,
}

#[derive(Clone, Debug)]
pub struct ExportArtifact {
    pub payload: String,
    pub manifest: ExportManifest,
}

/// Flatten reports into an artifact in the requested format.
pub fn export_reports(reports: &[DetectionReport], format: ExportFormat) -> Result<ExportArtifact> {
    let payload = match format {
        ExportFormat::Csv => to_csv(reports),
        ExportFormat::Json => serde_json::to_string_pretty(reports)?,
    };
    let digest: [u8; 32] = Sha256::digest(payload.as_bytes()).into();
    Ok(ExportArtifact {
        manifest: ExportManifest {
            report_count: reports.len(),
            format,
            sha256: hex::encode(digest),
        },
        payload,
    })
}

/// Recompute the payload hash and compare it to the manifest.
pub fn verify_artifact(artifact: &ExportArtifact) -> Result<()> {
    let digest: [u8; 32] = Sha256::digest(artifact.payload.as_bytes()).into();
    if hex::encode(digest) != artifact.manifest.sha256 {
        return Err(anyhow!("export manifest hash mismatch"));
    }
    Ok(())
}

/// Flatten reports into CSV with a header row.
pub fn to_csv(reports: &[DetectionReport]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');
    for report in reports {
        let fields = [
            report.sample_id.clone(),
            report.lat.to_string(),
            report.lon.to_string(),
            report.has_solar.to_string(),
            format!("{:.2}", report.confidence),
            report.panel_count_est.to_string(),
            format!("{:.1}", report.pv_area_sqm_est),
            format!("{:.1}", report.capacity_kw_est),
            report.qc_status.as_str().to_string(),
            report.qc_notes.join("; "),
            report.bbox_or_mask.clone(),
            report.image_metadata.source.clone(),
            report.image_metadata.capture_date.clone(),
            report.processing_time_ms.to_string(),
        ];
        let row: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    let needs_quoting = value.contains(',')
        || value.contains(';')
        || value.contains('"')
        || value.contains('\n');
    if needs_quoting {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ImageMetadata, QcStatus};

    fn sample_report() -> DetectionReport {
        DetectionReport {
            sample_id: "S1".to_string(),
            lat: 12.9716,
            lon: 77.5946,
            has_solar: true,
            confidence: 0.92,
            panel_count_est: 14,
            pv_area_sqm_est: 23.8,
            capacity_kw_est: 4.3,
            qc_status: QcStatus::Verifiable,
            qc_notes: vec![
                "clear roof view".to_string(),
                "large installation detected".to_string(),
            ],
            bbox_or_mask: "[100,90,80,45,0.91];[190,92,82,44,0.88]".to_string(),
            image_metadata: ImageMetadata {
                source: "Satellite/Manual Upload".to_string(),
                capture_date: "2026-08-06".to_string(),
            },
            processing_time_ms: 12,
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_report() {
        let csv = to_csv(&[sample_report(), sample_report()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
    }

    #[test]
    fn fields_with_separators_are_quoted_verbatim() {
        let csv = to_csv(&[sample_report()]);
        let row = csv.lines().nth(1).unwrap();
        // Notes join with "; " and the box string carries ';', so both cells
        // must arrive quoted but otherwise untouched.
        assert!(row.contains("\"clear roof view; large installation detected\""));
        assert!(row.contains("\"[100,90,80,45,0.91];[190,92,82,44,0.88]\""));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let mut report = sample_report();
        report.sample_id = "claim \"42\"".to_string();
        let csv = to_csv(&[report]);
        assert!(csv.contains("\"claim \"\"42\"\"\""));
    }

    #[test]
    fn json_artifact_roundtrips() {
        let reports = vec![sample_report()];
        let artifact = export_reports(&reports, ExportFormat::Json).unwrap();
        let parsed: Vec<DetectionReport> = serde_json::from_str(&artifact.payload).unwrap();
        assert_eq!(parsed, reports);
        assert_eq!(artifact.manifest.report_count, 1);
    }

    #[test]
    fn manifest_detects_tampering() {
        let mut artifact = export_reports(&[sample_report()], ExportFormat::Csv).unwrap();
        verify_artifact(&artifact).unwrap();
        artifact.payload.push_str("tail\n");
        assert!(verify_artifact(&artifact).is_err());
    }

    #[test]
    fn format_parses_from_flag_values() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
