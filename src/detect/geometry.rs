//! Panel box synthesis and the bbox wire grammar.
//!
//! Boxes live in a fixed 640x640 reference frame and travel as a single
//! string: `"[x,y,w,h,conf];[x,y,w,h,conf];..."` with integer geometry, a
//! 2-decimal confidence and no trailing separator. Consumers must accept a
//! box without the confidence element and display a default instead of
//! erroring.

use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use rand::Rng;
use regex::Regex;

/// One synthesized panel box in the reference frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub confidence: f64,
}

/// Approximate row/column layout for a panel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
}

impl GridLayout {
    pub fn for_panel_count(panel_count: u32) -> Self {
        if panel_count == 0 {
            return Self { cols: 0, rows: 0 };
        }
        let cols = (panel_count as f64).sqrt().ceil() as u32;
        let rows = (panel_count as f64 / cols as f64).ceil() as u32;
        Self { cols, rows }
    }
}

// Grid origin, module size and spacing are drawn once per call; only the
// per-box jitter varies between cells.
const ORIGIN_RANGE: std::ops::Range<f64> = 80.0..180.0;
const PANEL_WIDTH_RANGE: std::ops::Range<f64> = 60.0..100.0;
const PANEL_HEIGHT_RANGE: std::ops::Range<f64> = 35.0..60.0;
const GAP_X_RANGE: std::ops::Range<f64> = 8.0..20.0;
const GAP_Y_RANGE: std::ops::Range<f64> = 6.0..16.0;
const BOX_CONFIDENCE_RANGE: std::ops::Range<f64> = 0.82..0.99;

/// Synthesize `panel_count` boxes arranged in an approximate grid.
///
/// Walks the grid row-major and stops once the count is reached, so the last
/// row may be partial. Each box gets small independent jitter on position and
/// size plus its own confidence.
pub fn synthesize_boxes<R: Rng>(rng: &mut R, panel_count: u32) -> Vec<PanelBox> {
    if panel_count == 0 {
        return Vec::new();
    }
    let layout = GridLayout::for_panel_count(panel_count);

    let start_x = rng.gen_range(ORIGIN_RANGE);
    let start_y = rng.gen_range(ORIGIN_RANGE);
    let panel_w = rng.gen_range(PANEL_WIDTH_RANGE);
    let panel_h = rng.gen_range(PANEL_HEIGHT_RANGE);
    let gap_x = rng.gen_range(GAP_X_RANGE);
    let gap_y = rng.gen_range(GAP_Y_RANGE);

    let mut boxes = Vec::with_capacity(panel_count as usize);
    'grid: for row in 0..layout.rows {
        for col in 0..layout.cols {
            if boxes.len() as u32 == panel_count {
                break 'grid;
            }
            let x = start_x + col as f64 * (panel_w + gap_x) + rng.gen_range(-4.0..4.0);
            let y = start_y + row as f64 * (panel_h + gap_y) + rng.gen_range(-3.0..3.0);
            let w = panel_w + rng.gen_range(-5.0..5.0);
            let h = panel_h + rng.gen_range(-4.0..4.0);
            boxes.push(PanelBox {
                x: x.max(0.0) as u32,
                y: y.max(0.0) as u32,
                w: w.max(1.0) as u32,
                h: h.max(1.0) as u32,
                confidence: rng.gen_range(BOX_CONFIDENCE_RANGE),
            });
        }
    }
    boxes
}

// -------------------- Wire Grammar --------------------

/// Serialize boxes into the canonical wire string.
pub fn encode_boxes(boxes: &[PanelBox]) -> String {
    boxes
        .iter()
        .map(|b| format!("[{},{},{},{},{:.2}]", b.x, b.y, b.w, b.h, b.confidence))
        .collect::<Vec<_>>()
        .join(";")
}

/// One box decoded from the wire string. `confidence` is `None` when the
/// serialized box omitted it; consumers display a default rather than
/// treating that as an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParsedBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub confidence: Option<f64>,
}

fn box_regex() -> &'static Regex {
    // Compile once; the grammar is fixed.
    static BOX_RE: OnceLock<Regex> = OnceLock::new();
    BOX_RE.get_or_init(|| {
        Regex::new(r"^\[(\d+),(\d+),(\d+),(\d+)(?:,(\d+(?:\.\d+)?))?\]$").unwrap()
    })
}

/// Decode a wire string back into boxes. The empty string is zero boxes.
pub fn decode_boxes(encoded: &str) -> Result<Vec<ParsedBox>> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    encoded.split(';').map(parse_box).collect()
}

fn parse_box(entry: &str) -> Result<ParsedBox> {
    let caps = box_regex()
        .captures(entry)
        .ok_or_else(|| anyhow!("malformed box entry {:?}", entry))?;
    let coord = |idx: usize| -> Result<u32> {
        caps[idx]
            .parse()
            .map_err(|e| anyhow!("box entry {:?}: {}", entry, e))
    };
    let confidence = match caps.get(5) {
        Some(m) => Some(
            m.as_str()
                .parse::<f64>()
                .map_err(|e| anyhow!("box entry {:?}: {}", entry, e))?,
        ),
        None => None,
    };
    Ok(ParsedBox {
        x: coord(1)?,
        y: coord(2)?,
        w: coord(3)?,
        h: coord(4)?,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn grid_layout_squares_off() {
        assert_eq!(GridLayout::for_panel_count(4), GridLayout { cols: 2, rows: 2 });
        assert_eq!(GridLayout::for_panel_count(14), GridLayout { cols: 4, rows: 4 });
        assert_eq!(GridLayout::for_panel_count(23), GridLayout { cols: 5, rows: 5 });
        assert_eq!(GridLayout::for_panel_count(5), GridLayout { cols: 3, rows: 2 });
        assert_eq!(GridLayout::for_panel_count(0), GridLayout { cols: 0, rows: 0 });
    }

    #[test]
    fn synthesizes_exactly_the_requested_count() {
        let mut rng = StdRng::seed_from_u64(11);
        for count in [1u32, 4, 7, 14, 23] {
            let boxes = synthesize_boxes(&mut rng, count);
            assert_eq!(boxes.len() as u32, count);
        }
        assert!(synthesize_boxes(&mut rng, 0).is_empty());
    }

    #[test]
    fn synthesized_boxes_stay_in_plausible_bounds() {
        let mut rng = StdRng::seed_from_u64(29);
        for b in synthesize_boxes(&mut rng, 23) {
            assert!(b.w >= 55 && b.w < 105, "width {}", b.w);
            assert!(b.h >= 31 && b.h < 64, "height {}", b.h);
            assert!(b.x >= 76, "x {}", b.x);
            assert!(b.y >= 77, "y {}", b.y);
            assert!((0.82..0.99).contains(&b.confidence));
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut rng = StdRng::seed_from_u64(5);
        let boxes = synthesize_boxes(&mut rng, 14);
        let wire = encode_boxes(&boxes);
        assert_eq!(wire.split(';').count(), 14);
        assert!(!wire.ends_with(';'));

        let parsed = decode_boxes(&wire).expect("decode");
        assert_eq!(parsed.len(), 14);
        for (original, decoded) in boxes.iter().zip(&parsed) {
            assert_eq!(decoded.x, original.x);
            assert_eq!(decoded.y, original.y);
            assert_eq!(decoded.w, original.w);
            assert_eq!(decoded.h, original.h);
            let conf = decoded.confidence.expect("confidence present");
            assert!((conf - original.confidence).abs() < 0.005);
        }
    }

    #[test]
    fn empty_string_decodes_to_no_boxes() {
        assert!(decode_boxes("").expect("decode").is_empty());
    }

    #[test]
    fn missing_confidence_is_unknown_not_an_error() {
        let parsed = decode_boxes("[120,96,81,44]").expect("decode");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].w, 81);
        assert_eq!(parsed[0].confidence, None);
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(decode_boxes("[1,2,3]").is_err());
        assert!(decode_boxes("[1,2,3,4,0.9];").is_err());
        assert!(decode_boxes("[-1,2,3,4]").is_err());
        assert!(decode_boxes("[1,2,3,4,conf]").is_err());
    }
}
