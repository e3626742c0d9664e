//! Pattern mask - the intended layout as a binary occupancy grid
//!
//! Row index runs along y (top to bottom), column index along x. `true`
//! marks an exposed (clear) pixel, which is where a line should print.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::core::error::{require_finite, Result, SimError};

/// Immutable binary layout with a physical pixel pitch
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMask {
    cells: DMatrix<bool>,
    pixel_size_nm: f64,
}

/// Half-open column range `[start, end)` of exposed pixels in one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    /// Ideal left edge in sample coordinates (sample i sits at x = i)
    pub fn ideal_left(&self) -> f64 {
        self.start as f64 - 0.5
    }

    /// Ideal right edge in sample coordinates
    pub fn ideal_right(&self) -> f64 {
        self.end as f64 - 0.5
    }

    /// A span touching the image border has a clipped outer edge
    pub fn touches_border(&self, width: usize) -> bool {
        self.start == 0 || self.end == width
    }

    /// Overlap test against a continuous interval in sample coordinates
    pub fn overlaps(&self, left: f64, right: f64) -> bool {
        left < self.ideal_right() && right > self.ideal_left()
    }
}

impl PatternMask {
    /// Build a mask from rows of occupancy flags
    pub fn new(rows: Vec<Vec<bool>>, pixel_size_nm: f64) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(SimError::InvalidMask("mask must be at least 1x1".to_string()));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(SimError::InvalidMask(format!(
                "row {} has {} columns, expected {}",
                i,
                row.len(),
                width
            )));
        }
        Self::check_pixel_size(pixel_size_nm)?;

        let cells = DMatrix::from_fn(height, width, |r, c| rows[r][c]);
        Ok(Self {
            cells,
            pixel_size_nm,
        })
    }

    /// Vertical lines of `line_px` exposed columns repeating every `pitch_px`,
    /// the first line starting at column 0
    pub fn line_space(
        height: usize,
        width: usize,
        line_px: usize,
        pitch_px: usize,
        pixel_size_nm: f64,
    ) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(SimError::InvalidMask("mask must be at least 1x1".to_string()));
        }
        if pitch_px == 0 || line_px > pitch_px {
            return Err(SimError::InvalidMask(format!(
                "line width {} px must not exceed a non-zero pitch ({} px)",
                line_px, pitch_px
            )));
        }
        Self::check_pixel_size(pixel_size_nm)?;

        let cells = DMatrix::from_fn(height, width, |_, c| c % pitch_px < line_px);
        Ok(Self {
            cells,
            pixel_size_nm,
        })
    }

    /// Uniform mask, every pixel set to `exposed`
    pub fn filled(height: usize, width: usize, exposed: bool, pixel_size_nm: f64) -> Result<Self> {
        Self::new(vec![vec![exposed; width]; height], pixel_size_nm)
    }

    /// Parse a mask drawn as text: `#` or `1` exposed, `.` or `0` dark.
    /// Blank lines and surrounding whitespace are ignored.
    pub fn from_ascii(art: &str, pixel_size_nm: f64) -> Result<Self> {
        let mut rows = Vec::new();
        for line in art.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let row = line
                .chars()
                .map(|ch| match ch {
                    '#' | '1' => Ok(true),
                    '.' | '0' => Ok(false),
                    other => Err(SimError::InvalidMask(format!(
                        "unexpected character '{}' in mask art",
                        other
                    ))),
                })
                .collect::<Result<Vec<bool>>>()?;
            rows.push(row);
        }
        Self::new(rows, pixel_size_nm)
    }

    fn check_pixel_size(pixel_size_nm: f64) -> Result<()> {
        let size = require_finite("pixel_size_nm", pixel_size_nm)?;
        if size <= 0.0 {
            return Err(SimError::config("pixel_size_nm", size, "must be positive"));
        }
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.cells.nrows()
    }

    pub fn width(&self) -> usize {
        self.cells.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.shape()
    }

    pub fn pixel_size_nm(&self) -> f64 {
        self.pixel_size_nm
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[(row, col)]
    }

    /// Mask as 0.0 / 1.0 intensities, the input to the optical blur
    pub fn to_intensity(&self) -> DMatrix<f64> {
        self.cells.map(|exposed| if exposed { 1.0 } else { 0.0 })
    }

    pub fn exposed_fraction(&self) -> f64 {
        let exposed = self.cells.iter().filter(|&&c| c).count();
        exposed as f64 / self.cells.len() as f64
    }

    /// Physical area of the pattern in µm²
    pub fn area_um2(&self) -> f64 {
        let pixel_area_nm2 = self.pixel_size_nm * self.pixel_size_nm;
        self.cells.len() as f64 * pixel_area_nm2 * 1e-6
    }

    /// Maximal runs of exposed pixels in one row, left to right
    pub fn line_spans(&self, row: usize) -> Vec<LineSpan> {
        let mut spans = Vec::new();
        let mut start = None;
        for col in 0..self.width() {
            match (self.cells[(row, col)], start) {
                (true, None) => start = Some(col),
                (false, Some(s)) => {
                    spans.push(LineSpan { start: s, end: col });
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            spans.push(LineSpan {
                start: s,
                end: self.width(),
            });
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_space_layout() {
        let mask = PatternMask::line_space(4, 40, 8, 16, 1.0).unwrap();
        assert_eq!(mask.shape(), (4, 40));
        assert!(mask.get(0, 0));
        assert!(mask.get(3, 7));
        assert!(!mask.get(3, 8));
        assert!(mask.get(0, 16));

        let spans = mask.line_spans(2);
        assert_eq!(
            spans,
            vec![
                LineSpan { start: 0, end: 8 },
                LineSpan { start: 16, end: 24 },
                LineSpan { start: 32, end: 40 },
            ]
        );
        assert!(spans[0].touches_border(40));
        assert!(!spans[1].touches_border(40));
        assert!(spans[2].touches_border(40));
    }

    #[test]
    fn test_from_ascii() {
        let mask = PatternMask::from_ascii(
            "
            ..##..
            ..##..
            .####.
            ",
            2.0,
        )
        .unwrap();
        assert_eq!(mask.shape(), (3, 6));
        assert_eq!(mask.line_spans(0), vec![LineSpan { start: 2, end: 4 }]);
        assert_eq!(mask.line_spans(2), vec![LineSpan { start: 1, end: 5 }]);
        assert!((mask.area_um2() - 18.0 * 4.0 * 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = PatternMask::new(vec![vec![true, false], vec![true]], 1.0);
        assert!(matches!(result, Err(SimError::InvalidMask(_))));
    }

    #[test]
    fn test_rejects_bad_pixel_size() {
        assert!(PatternMask::filled(2, 2, true, 0.0).is_err());
        assert!(PatternMask::filled(2, 2, true, f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_line_wider_than_pitch() {
        assert!(PatternMask::line_space(2, 10, 6, 4, 1.0).is_err());
        assert!(PatternMask::line_space(2, 10, 0, 0, 1.0).is_err());
    }

    #[test]
    fn test_span_geometry() {
        let span = LineSpan { start: 10, end: 26 };
        assert_eq!(span.width(), 16);
        assert_eq!(span.ideal_left(), 9.5);
        assert_eq!(span.ideal_right(), 25.5);
        assert!(span.overlaps(20.0, 30.0));
        assert!(!span.overlaps(26.0, 30.0));
    }

    #[test]
    fn test_exposed_fraction() {
        let mask = PatternMask::line_space(10, 32, 16, 32, 1.0).unwrap();
        assert!((mask.exposed_fraction() - 0.5).abs() < 1e-12);
        let dark = PatternMask::filled(3, 3, false, 1.0).unwrap();
        assert_eq!(dark.line_spans(1), vec![]);
    }
}
