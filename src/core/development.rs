//! Development: threshold the latent image into printed edges
//!
//! Each row of the latent image is cut at the development threshold. Runs at
//! or above the threshold print; their ends are located to sub-pixel accuracy
//! by linear interpolation between the straddling samples. Printed runs are
//! then matched against the lines the mask expects in that row.
//!
//! Coordinates are in pixels with sample `i` at `x = i`; the image spans
//! `[-0.5, width - 0.5]`.

use serde::{Deserialize, Serialize};

use crate::core::error::{require_finite, Result, SimError};
use crate::core::field::{Field, LatentImage};
use crate::core::mask::{LineSpan, PatternMask};

/// Stochastic failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectKind {
    /// An expected line did not print in this row
    Pinch,
    /// Resist cleared across a gap (to a neighbouring line or the border)
    Bridge,
}

impl std::fmt::Display for DefectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefectKind::Pinch => write!(f, "pinch"),
            DefectKind::Bridge => write!(f, "bridge"),
        }
    }
}

/// One defect observation in one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefectEvent {
    pub row: usize,
    pub kind: DefectKind,
    /// Extent of the offending region (pixels)
    pub left: f64,
    pub right: f64,
}

/// Measured edges of one expected line in one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePair {
    pub row: usize,
    pub line: LineSpan,
    pub left: f64,
    pub right: f64,
}

impl EdgePair {
    pub fn width_px(&self) -> f64 {
        self.right - self.left
    }
}

/// Printed contour of a whole image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopedContour {
    pub height: usize,
    pub width: usize,
    pub threshold: f64,
    pub edges: Vec<EdgePair>,
    pub defects: Vec<DefectEvent>,
}

impl DevelopedContour {
    /// Rows holding at least one measured edge pair
    pub fn resolved_rows(&self) -> usize {
        let mut rows: Vec<usize> = self.edges.iter().map(|e| e.row).collect();
        rows.dedup();
        rows.len()
    }

    pub fn defect_count(&self) -> usize {
        self.defects.len()
    }

    pub fn count(&self, kind: DefectKind) -> usize {
        self.defects.iter().filter(|d| d.kind == kind).count()
    }
}

/// A printed run in one row
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    left: f64,
    right: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DevelopmentModel;

impl DevelopmentModel {
    /// Threshold `latent` and match printed runs against `mask`'s lines.
    ///
    /// A threshold that is never crossed yields a pinch for every expected
    /// line, never a zero-width measurement.
    pub fn develop(
        latent: &LatentImage,
        mask: &PatternMask,
        threshold: f64,
    ) -> Result<DevelopedContour> {
        let threshold = require_finite("development_threshold", threshold)?;
        if threshold <= 0.0 {
            return Err(SimError::config(
                "development_threshold",
                threshold,
                "must be positive",
            ));
        }
        if latent.shape() != mask.shape() {
            return Err(SimError::InvalidMask(format!(
                "latent image is {:?} but mask is {:?}",
                latent.shape(),
                mask.shape()
            )));
        }

        let (height, width) = mask.shape();
        let mut contour = DevelopedContour {
            height,
            width,
            threshold,
            edges: Vec::new(),
            defects: Vec::new(),
        };

        for row in 0..height {
            let profile = latent.row_profile(row);
            let segments = printed_segments(&profile, threshold);
            let spans = mask.line_spans(row);
            inspect_row(row, width, &spans, &segments, &mut contour);
        }

        Ok(contour)
    }
}

/// Runs of `profile >= threshold` with interpolated ends
fn printed_segments(profile: &[f64], threshold: f64) -> Vec<Segment> {
    let crossing = |a: usize| {
        let (va, vb) = (profile[a], profile[a + 1]);
        a as f64 + (threshold - va) / (vb - va)
    };

    let mut segments = Vec::new();
    let mut start: Option<f64> = None;
    for (i, &value) in profile.iter().enumerate() {
        let above = value >= threshold;
        match (above, start) {
            (true, None) => start = Some(if i == 0 { -0.5 } else { crossing(i - 1) }),
            (false, Some(left)) => {
                segments.push(Segment {
                    left,
                    right: crossing(i - 1),
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(left) = start {
        segments.push(Segment {
            left,
            right: profile.len() as f64 - 0.5,
        });
    }
    segments
}

fn inspect_row(
    row: usize,
    width: usize,
    spans: &[LineSpan],
    segments: &[Segment],
    contour: &mut DevelopedContour,
) {
    let border_left = -0.5;
    let border_right = width as f64 - 0.5;

    // Classify printed runs; remember which ones join more than they should
    let mut bridged = vec![false; segments.len()];
    for (i, seg) in segments.iter().enumerate() {
        let touching: Vec<&LineSpan> = spans
            .iter()
            .filter(|s| s.overlaps(seg.left, seg.right))
            .collect();

        if touching.is_empty() {
            // Resist cleared inside a gap
            bridged[i] = true;
            contour.defects.push(DefectEvent {
                row,
                kind: DefectKind::Bridge,
                left: seg.left,
                right: seg.right,
            });
            continue;
        }

        let mut joins = touching.len() - 1;
        if seg.left <= border_left && !touching.iter().any(|s| s.start == 0) {
            joins += 1;
        }
        if seg.right >= border_right && !touching.iter().any(|s| s.end == width) {
            joins += 1;
        }
        if joins > 0 {
            bridged[i] = true;
            for _ in 0..joins {
                contour.defects.push(DefectEvent {
                    row,
                    kind: DefectKind::Bridge,
                    left: seg.left,
                    right: seg.right,
                });
            }
        }
    }

    for span in spans {
        let overlapping: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, seg)| span.overlaps(seg.left, seg.right))
            .map(|(i, _)| i)
            .collect();

        if overlapping.is_empty() {
            contour.defects.push(DefectEvent {
                row,
                kind: DefectKind::Pinch,
                left: span.ideal_left(),
                right: span.ideal_right(),
            });
            continue;
        }

        // Clipped or merged lines have no trustworthy edge pair
        if span.touches_border(width) || overlapping.iter().any(|&i| bridged[i]) {
            continue;
        }

        let left = overlapping
            .iter()
            .map(|&i| segments[i].left)
            .fold(f64::INFINITY, f64::min);
        let right = overlapping
            .iter()
            .map(|&i| segments[i].right)
            .fold(f64::NEG_INFINITY, f64::max);
        contour.edges.push(EdgePair {
            row,
            line: *span,
            left,
            right,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn image_from_rows(rows: &[&[f64]]) -> LatentImage {
        let width = rows[0].len();
        LatentImage::new(DMatrix::from_fn(rows.len(), width, |r, c| rows[r][c]), 1.0)
    }

    #[test]
    fn test_segments_interpolate_crossings() {
        let profile = [0.0, 0.0, 4.0, 10.0, 10.0, 6.0, 0.0];
        let segs = printed_segments(&profile, 5.0);
        assert_eq!(segs.len(), 1);
        // Up-crossing between 2 (4.0) and 3 (10.0): 2 + 1/6
        assert!((segs[0].left - (2.0 + 1.0 / 6.0)).abs() < 1e-12);
        // Down-crossing between 5 (6.0) and 6 (0.0): 5 + 1/6
        assert!((segs[0].right - (5.0 + 1.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_segments_clip_at_borders() {
        let segs = printed_segments(&[9.0, 9.0, 0.0, 0.0, 9.0], 5.0);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].left, -0.5);
        assert_eq!(segs[1].right, 4.5);
    }

    #[test]
    fn test_clean_line_measured() {
        let mask = PatternMask::from_ascii("...###...\n...###...", 1.0).unwrap();
        let row: &[f64] = &[0.0, 0.0, 2.0, 8.0, 10.0, 8.0, 2.0, 0.0, 0.0];
        let latent = image_from_rows(&[row, row]);
        let contour = DevelopmentModel::develop(&latent, &mask, 5.0).unwrap();
        assert_eq!(contour.defect_count(), 0);
        assert_eq!(contour.edges.len(), 2);
        assert_eq!(contour.resolved_rows(), 2);
        let e = contour.edges[0];
        assert!((e.left - 2.5).abs() < 1e-12);
        assert!((e.right - 5.5).abs() < 1e-12);
        assert!((e.width_px() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_never_crossed_is_pinch() {
        let mask = PatternMask::from_ascii("..##....##..\n..##....##..", 1.0).unwrap();
        let latent = image_from_rows(&[&[1.0; 12], &[1.0; 12]]);
        let contour = DevelopmentModel::develop(&latent, &mask, 5.0).unwrap();
        assert!(contour.edges.is_empty());
        assert_eq!(contour.count(DefectKind::Pinch), 4);
        assert_eq!(contour.count(DefectKind::Bridge), 0);
    }

    #[test]
    fn test_merged_lines_are_bridge() {
        let mask = PatternMask::from_ascii("..##..##..", 1.0).unwrap();
        let latent = image_from_rows(&[&[0.0, 0.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 0.0, 0.0]]);
        let contour = DevelopmentModel::develop(&latent, &mask, 5.0).unwrap();
        assert_eq!(contour.count(DefectKind::Bridge), 1);
        assert_eq!(contour.count(DefectKind::Pinch), 0);
        assert!(contour.edges.is_empty());
    }

    #[test]
    fn test_print_in_gap_is_bridge() {
        let mask = PatternMask::from_ascii("..##......", 1.0).unwrap();
        let latent = image_from_rows(&[&[0.0, 0.0, 9.0, 9.0, 0.0, 0.0, 9.0, 0.0, 0.0, 0.0]]);
        let contour = DevelopmentModel::develop(&latent, &mask, 5.0).unwrap();
        assert_eq!(contour.count(DefectKind::Bridge), 1);
        assert_eq!(contour.edges.len(), 1);
    }

    #[test]
    fn test_print_to_border_is_bridge() {
        let mask = PatternMask::from_ascii("....##....", 1.0).unwrap();
        let latent = image_from_rows(&[&[0.0, 0.0, 0.0, 0.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0]]);
        let contour = DevelopmentModel::develop(&latent, &mask, 5.0).unwrap();
        assert_eq!(contour.count(DefectKind::Bridge), 1);
        assert!(contour.edges.is_empty());
    }

    #[test]
    fn test_border_line_inspected_not_measured() {
        let mask = PatternMask::from_ascii("##....##..", 1.0).unwrap();
        let latent = image_from_rows(&[&[9.0, 9.0, 0.0, 0.0, 0.0, 0.0, 9.0, 9.0, 0.0, 0.0]]);
        let contour = DevelopmentModel::develop(&latent, &mask, 5.0).unwrap();
        assert_eq!(contour.defect_count(), 0);
        assert_eq!(contour.edges.len(), 1);
        assert_eq!(contour.edges[0].line, LineSpan { start: 6, end: 8 });
    }

    #[test]
    fn test_broken_line_uses_outer_edges() {
        let mask = PatternMask::from_ascii("..######..", 1.0).unwrap();
        let latent = image_from_rows(&[&[0.0, 0.0, 9.0, 9.0, 0.0, 0.0, 9.0, 9.0, 0.0, 0.0]]);
        let contour = DevelopmentModel::develop(&latent, &mask, 5.0).unwrap();
        assert_eq!(contour.defect_count(), 0);
        assert_eq!(contour.edges.len(), 1);
        assert!(contour.edges[0].width_px() > 5.0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mask = PatternMask::from_ascii("..##..", 1.0).unwrap();
        let latent = image_from_rows(&[&[0.0; 5]]);
        assert!(matches!(
            DevelopmentModel::develop(&latent, &mask, 5.0),
            Err(SimError::InvalidMask(_))
        ));
        let latent = image_from_rows(&[&[0.0; 6]]);
        assert!(DevelopmentModel::develop(&latent, &mask, 0.0).is_err());
    }
}
