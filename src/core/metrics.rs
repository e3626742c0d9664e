//! Metrics extraction from a developed contour
//!
//! Edge roughness uses the 3σ convention: for each side, positions are taken
//! about each line's own mean position and pooled over lines, weighting each
//! line by its number of measured rows. `ler_nm` is the average of the left
//! and right values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::development::{DefectKind, DevelopedContour, EdgePair};
use crate::core::error::{require_finite, Result, SimError};

/// Minimum rows with a measured edge pair
pub const MIN_RESOLVED_ROWS: usize = 2;

/// Per-run lithographic metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub cd_nm: f64,
    /// Signed: measured minus target
    pub cd_error_nm: f64,
    pub ler_nm: f64,
    pub ler_left_nm: f64,
    pub ler_right_nm: f64,
    pub lwr_nm: f64,
    pub stochastic_defects_per_um2: f64,
    pub defect_count: usize,
    pub pinch_count: usize,
    pub bridge_count: usize,
    pub measured_rows: usize,
    pub measured_edges: usize,
}

impl Metrics {
    /// Placeholder for a run that produced no measurement
    pub fn unmeasured() -> Self {
        Self {
            cd_nm: f64::NAN,
            cd_error_nm: f64::NAN,
            ler_nm: f64::NAN,
            ler_left_nm: f64::NAN,
            ler_right_nm: f64::NAN,
            lwr_nm: f64::NAN,
            stochastic_defects_per_um2: f64::NAN,
            defect_count: 0,
            pinch_count: 0,
            bridge_count: 0,
            measured_rows: 0,
            measured_edges: 0,
        }
    }
}

/// Pooled sum of squares about per-group means
#[derive(Debug, Default)]
struct Pooled {
    sum_sq: f64,
    count: usize,
}

impl Pooled {
    fn add_group(&mut self, values: &[f64]) {
        if values.is_empty() {
            return;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        self.sum_sq += values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        self.count += values.len();
    }

    fn three_sigma(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        3.0 * (self.sum_sq / self.count as f64).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsExtractor;

impl MetricsExtractor {
    pub fn measure(
        contour: &DevelopedContour,
        target_cd_nm: f64,
        pixel_size_nm: f64,
    ) -> Result<Metrics> {
        let target_cd_nm = require_finite("target_cd_nm", target_cd_nm)?;
        if target_cd_nm <= 0.0 {
            return Err(SimError::config("target_cd_nm", target_cd_nm, "must be positive"));
        }
        let pixel_size_nm = require_finite("pixel_size_nm", pixel_size_nm)?;
        if pixel_size_nm <= 0.0 {
            return Err(SimError::config("pixel_size_nm", pixel_size_nm, "must be positive"));
        }

        let resolved_rows = contour.resolved_rows();
        if resolved_rows < MIN_RESOLVED_ROWS {
            return Err(SimError::InsufficientData { resolved_rows });
        }

        let cd_px = contour.edges.iter().map(EdgePair::width_px).sum::<f64>()
            / contour.edges.len() as f64;
        let cd_nm = cd_px * pixel_size_nm;

        // Keyed by line so summation order is stable between runs
        let mut lines: BTreeMap<(usize, usize), Vec<&EdgePair>> = BTreeMap::new();
        for edge in &contour.edges {
            lines
                .entry((edge.line.start, edge.line.end))
                .or_default()
                .push(edge);
        }

        let mut left = Pooled::default();
        let mut right = Pooled::default();
        let mut width = Pooled::default();
        for edges in lines.values() {
            left.add_group(&edges.iter().map(|e| e.left).collect::<Vec<_>>());
            right.add_group(&edges.iter().map(|e| e.right).collect::<Vec<_>>());
            width.add_group(&edges.iter().map(|e| e.width_px()).collect::<Vec<_>>());
        }

        let ler_left_nm = left.three_sigma() * pixel_size_nm;
        let ler_right_nm = right.three_sigma() * pixel_size_nm;

        let area_um2 =
            (contour.height * contour.width) as f64 * pixel_size_nm * pixel_size_nm * 1e-6;
        let defect_count = contour.defect_count();

        Ok(Metrics {
            cd_nm,
            cd_error_nm: cd_nm - target_cd_nm,
            ler_nm: 0.5 * (ler_left_nm + ler_right_nm),
            ler_left_nm,
            ler_right_nm,
            lwr_nm: width.three_sigma() * pixel_size_nm,
            stochastic_defects_per_um2: defect_count as f64 / area_um2,
            defect_count,
            pinch_count: contour.count(DefectKind::Pinch),
            bridge_count: contour.count(DefectKind::Bridge),
            measured_rows: resolved_rows,
            measured_edges: contour.edges.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::development::DefectEvent;
    use crate::core::mask::LineSpan;

    const LINE: LineSpan = LineSpan { start: 10, end: 26 };

    fn contour(edges: Vec<(usize, f64, f64)>) -> DevelopedContour {
        DevelopedContour {
            height: 100,
            width: 100,
            threshold: 1.0,
            edges: edges
                .into_iter()
                .map(|(row, left, right)| EdgePair {
                    row,
                    line: LINE,
                    left,
                    right,
                })
                .collect(),
            defects: Vec::new(),
        }
    }

    #[test]
    fn test_straight_edges_have_zero_roughness() {
        let c = contour((0..10).map(|r| (r, 9.5, 25.5)).collect());
        let m = MetricsExtractor::measure(&c, 16.0, 1.0).unwrap();
        assert!((m.cd_nm - 16.0).abs() < 1e-12);
        assert!(m.cd_error_nm.abs() < 1e-12);
        assert_eq!(m.ler_nm, 0.0);
        assert_eq!(m.lwr_nm, 0.0);
        assert_eq!(m.measured_rows, 10);
        assert_eq!(m.stochastic_defects_per_um2, 0.0);
    }

    #[test]
    fn test_ler_is_three_sigma() {
        // Left edge alternates ±1 px: σ = 1, 3σ = 3 px = 1.5 nm at 0.5 nm/px
        let c = contour(
            (0..10)
                .map(|r| (r, if r % 2 == 0 { 8.5 } else { 10.5 }, 25.5))
                .collect(),
        );
        let m = MetricsExtractor::measure(&c, 8.0, 0.5).unwrap();
        assert!((m.ler_left_nm - 1.5).abs() < 1e-12);
        assert_eq!(m.ler_right_nm, 0.0);
        assert!((m.ler_nm - 0.75).abs() < 1e-12);
        assert!((m.lwr_nm - 1.5).abs() < 1e-12);
        assert!((m.cd_nm - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_lines_pooled_about_own_mean() {
        // Two straight lines at different positions: no roughness
        let mut c = contour((0..5).map(|r| (r, 9.5, 25.5)).collect());
        for r in 0..5 {
            c.edges.push(EdgePair {
                row: r,
                line: LineSpan { start: 42, end: 58 },
                left: 41.0,
                right: 57.0,
            });
        }
        let m = MetricsExtractor::measure(&c, 16.0, 1.0).unwrap();
        assert_eq!(m.ler_nm, 0.0);
        assert_eq!(m.measured_edges, 10);
    }

    #[test]
    fn test_signed_cd_error() {
        let c = contour((0..4).map(|r| (r, 9.5, 23.5)).collect());
        let m = MetricsExtractor::measure(&c, 16.0, 1.0).unwrap();
        assert!((m.cd_error_nm + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_defect_density() {
        let mut c = contour((0..4).map(|r| (r, 9.5, 25.5)).collect());
        for row in 4..8 {
            c.defects.push(DefectEvent {
                row,
                kind: DefectKind::Pinch,
                left: 9.5,
                right: 25.5,
            });
        }
        c.defects.push(DefectEvent {
            row: 9,
            kind: DefectKind::Bridge,
            left: 30.0,
            right: 31.0,
        });
        // 100x100 px at 1 nm = 0.01 µm²
        let m = MetricsExtractor::measure(&c, 16.0, 1.0).unwrap();
        assert_eq!(m.defect_count, 5);
        assert_eq!(m.pinch_count, 4);
        assert_eq!(m.bridge_count, 1);
        assert!((m.stochastic_defects_per_um2 - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_rows() {
        let c = contour(vec![(3, 9.5, 25.5)]);
        assert_eq!(
            MetricsExtractor::measure(&c, 16.0, 1.0),
            Err(SimError::InsufficientData { resolved_rows: 1 })
        );
        let empty = contour(Vec::new());
        assert!(matches!(
            MetricsExtractor::measure(&empty, 16.0, 1.0),
            Err(SimError::InsufficientData { resolved_rows: 0 })
        ));
    }

    #[test]
    fn test_rejects_bad_target() {
        let c = contour((0..4).map(|r| (r, 9.5, 25.5)).collect());
        assert!(matches!(
            MetricsExtractor::measure(&c, 0.0, 1.0),
            Err(SimError::Configuration { parameter: "target_cd_nm", .. })
        ));
        assert!(MetricsExtractor::measure(&c, 16.0, f64::NAN).is_err());
    }

    #[test]
    fn test_unmeasured_is_nan() {
        let m = Metrics::unmeasured();
        assert!(m.cd_error_nm.is_nan() && m.ler_nm.is_nan());
    }
}
