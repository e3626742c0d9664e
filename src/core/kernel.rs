//! Separable Gaussian blur shared by the optical and diffusion stages
//!
//! The blur scatters every source sample over its neighbours with a
//! normalized kernel. Contributions that would leave the grid are reflected
//! back across the border (symmetric boundary), so each pass conserves the
//! field's total exactly up to rounding. Once sigma is at least twice an
//! axis length the reflected Gaussian is flat along that axis, and the pass
//! replaces each line by its mean.

use nalgebra::DMatrix;

/// Truncation radius in units of sigma
const TRUNCATE_SIGMAS: f64 = 4.0;

/// Below this width (in pixels) the kernel degenerates to the identity
const MIN_SIGMA_PX: f64 = 1e-6;

/// Widths are clamped here; a kernel this wide flattens any grid it can meet
const MAX_SIGMA_PX: f64 = 1e9;

/// Sampled taps stop at this radius
const MAX_RADIUS_PX: usize = 1 << 16;

/// An axis of length `len` is averaged outright once sigma reaches
/// `FLAT_SIGMAS * len`
const FLAT_SIGMAS: f64 = 2.0;

/// Normalized, symmetric, sampled 1D Gaussian
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    sigma_px: f64,
    radius: usize,
    weights: Vec<f64>,
}

impl GaussianKernel {
    /// Kernel with standard deviation `sigma_px` (pixels). NaN and widths
    /// below 1e-6 px give the identity; larger widths are clamped to 1e9 px.
    pub fn new(sigma_px: f64) -> Self {
        if !(sigma_px > MIN_SIGMA_PX) {
            return Self {
                sigma_px: 0.0,
                radius: 0,
                weights: vec![1.0],
            };
        }

        let sigma_px = sigma_px.min(MAX_SIGMA_PX);
        let radius = (TRUNCATE_SIGMAS * sigma_px).ceil().min(MAX_RADIUS_PX as f64) as usize;
        let two_var = 2.0 * sigma_px * sigma_px;
        let mut weights: Vec<f64> = (0..=2 * radius)
            .map(|i| {
                let x = i as f64 - radius as f64;
                (-x * x / two_var).exp()
            })
            .collect();
        let total: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }

        Self {
            sigma_px,
            radius,
            weights,
        }
    }

    /// Kernel for a physical width, given the grid pitch
    pub fn from_nm(sigma_nm: f64, pixel_size_nm: f64) -> Self {
        Self::new(sigma_nm / pixel_size_nm)
    }

    pub fn sigma_px(&self) -> f64 {
        self.sigma_px
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of the 1D weights; the separable 2D kernel sums to its square
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn is_identity(&self) -> bool {
        self.radius == 0
    }

    /// True when a pass along an axis of `len` samples reduces to its mean
    pub fn flattens(&self, len: usize) -> bool {
        !self.is_identity() && self.sigma_px >= FLAT_SIGMAS * len as f64
    }

    /// Blur a field along both axes
    pub fn blur(&self, field: &DMatrix<f64>) -> DMatrix<f64> {
        if self.is_identity() {
            return field.clone();
        }
        let (height, width) = field.shape();
        if height == 0 || width == 0 {
            return field.clone();
        }

        // Pass 1: along x. Storage is column-major, so scattering whole
        // columns keeps the inner loop contiguous.
        let mut along_x = DMatrix::<f64>::zeros(height, width);
        if self.flattens(width) {
            for row in 0..height {
                let mean = field.row(row).sum() / width as f64;
                along_x.row_mut(row).fill(mean);
            }
        } else {
            let src = field.as_slice();
            let dst = along_x.as_mut_slice();
            for col in 0..width {
                let source = &src[col * height..(col + 1) * height];
                for (k, &weight) in self.weights.iter().enumerate() {
                    let target = reflect(col as isize + k as isize - self.radius as isize, width);
                    let dest = &mut dst[target * height..(target + 1) * height];
                    for (d, s) in dest.iter_mut().zip(source) {
                        *d += weight * s;
                    }
                }
            }
        }

        // Pass 2: along y, one column at a time
        let mut out = DMatrix::<f64>::zeros(height, width);
        if self.flattens(height) {
            for col in 0..width {
                let mean = along_x.column(col).sum() / height as f64;
                out.column_mut(col).fill(mean);
            }
        } else {
            let src = along_x.as_slice();
            let dst = out.as_mut_slice();
            for col in 0..width {
                let base = col * height;
                for row in 0..height {
                    let value = src[base + row];
                    if value == 0.0 {
                        continue;
                    }
                    for (k, &weight) in self.weights.iter().enumerate() {
                        let target =
                            reflect(row as isize + k as isize - self.radius as isize, height);
                        dst[base + target] += weight * value;
                    }
                }
            }
        }

        out
    }
}

/// Symmetric reflection of an index into `0..len` (edge sample repeated)
fn reflect(index: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = index.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}
