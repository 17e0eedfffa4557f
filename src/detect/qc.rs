//! Quality-control evaluation.
//!
//! The verdict and its notes derive from the same rounded confidence the
//! report displays, so the two can never disagree. Thresholds are applied in
//! strictly descending order and the first match wins.

use crate::detect::report::QcStatus;

pub const NOTE_CLEAR_ROOF_VIEW: &str = "clear roof view";
pub const NOTE_MODULE_GRID: &str = "distinct module grid detected";
pub const NOTE_MOUNTING_SHADOWS: &str = "mounting shadows visible";
pub const NOTE_MODERATE_QUALITY: &str = "moderate image quality";
pub const NOTE_PARTIAL_ARRAY: &str = "panel array partially visible";
pub const NOTE_LOW_RESOLUTION: &str = "low resolution imagery";
pub const NOTE_PARTIAL_OCCLUSION: &str = "partial occlusion detected";
pub const NOTE_INSUFFICIENT_QUALITY: &str = "insufficient image quality";
pub const NOTE_HEAVY_SHADOW: &str = "heavy shadow/cloud cover";
pub const NOTE_LARGE_INSTALLATION: &str = "large installation detected";

/// Panel estimates above this count add the large-installation note.
pub const LARGE_INSTALLATION_PANELS: u32 = 10;

const HIGH_CONFIDENCE: f64 = 0.85;
const MODERATE_CONFIDENCE: f64 = 0.70;
const MARGINAL_CONFIDENCE: f64 = 0.50;

#[derive(Clone, Debug, PartialEq)]
pub struct QcVerdict {
    pub status: QcStatus,
    pub notes: Vec<String>,
}

/// Evaluate the threshold table over a rounded confidence.
///
/// `marginal_coin` settles the (0.50, 0.70] band, which the shipped pipeline
/// resolves with a 50/50 draw. The coin is an explicit argument so both
/// outcomes stay testable; callers that grow a real secondary quality signal
/// (image sharpness, cloud mask) only have to change what they pass here.
pub fn evaluate(confidence: f64, marginal_coin: bool) -> QcVerdict {
    if confidence > HIGH_CONFIDENCE {
        QcVerdict {
            status: QcStatus::Verifiable,
            notes: notes(&[
                NOTE_CLEAR_ROOF_VIEW,
                NOTE_MODULE_GRID,
                NOTE_MOUNTING_SHADOWS,
            ]),
        }
    } else if confidence > MODERATE_CONFIDENCE {
        QcVerdict {
            status: QcStatus::Verifiable,
            notes: notes(&[NOTE_MODERATE_QUALITY, NOTE_PARTIAL_ARRAY]),
        }
    } else if confidence > MARGINAL_CONFIDENCE {
        QcVerdict {
            status: if marginal_coin {
                QcStatus::Verifiable
            } else {
                QcStatus::NotVerifiable
            },
            notes: notes(&[NOTE_LOW_RESOLUTION, NOTE_PARTIAL_OCCLUSION]),
        }
    } else {
        QcVerdict {
            status: QcStatus::NotVerifiable,
            notes: notes(&[NOTE_INSUFFICIENT_QUALITY, NOTE_HEAVY_SHADOW]),
        }
    }
}

impl QcVerdict {
    /// Append the large-installation note when a positive detection crosses
    /// the panel threshold. Independent of the status branch, always last.
    pub fn annotate_panel_count(&mut self, has_solar: bool, panel_count: u32) {
        if has_solar && panel_count > LARGE_INSTALLATION_PANELS {
            self.notes.push(NOTE_LARGE_INSTALLATION.to_string());
        }
    }
}

fn notes(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|text| text.to_string()).collect()
}
