//! Derived 2D fields produced along the exposure pipeline
//!
//! Each field has the shape of the mask it was derived from and is owned by
//! a single pipeline invocation.

use nalgebra::DMatrix;

/// Common read access to a pipeline field
pub trait Field {
    fn values(&self) -> &DMatrix<f64>;

    fn pixel_size_nm(&self) -> f64;

    fn shape(&self) -> (usize, usize) {
        self.values().shape()
    }

    /// Sum over all pixels
    fn total(&self) -> f64 {
        self.values().sum()
    }

    fn max_value(&self) -> f64 {
        self.values().iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// One row as a plain vector (x profile at fixed y)
    fn row_profile(&self, row: usize) -> Vec<f64> {
        self.values().row(row).iter().copied().collect()
    }

    /// Column-averaged x profile
    fn mean_profile(&self) -> Vec<f64> {
        let (height, width) = self.shape();
        (0..width)
            .map(|c| self.values().column(c).sum() / height as f64)
            .collect()
    }
}

/// Where a dose field's photons enter the film: absorbed dose (mJ/cm²)
/// passing each mask pixel before the PSF, a uniform flare dose, and the PSF
/// width the transmitted photons are spread by.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureSource {
    pub transmitted: DMatrix<f64>,
    pub flare_dose: f64,
    pub psf_sigma_px: f64,
}

/// Absorbed dose per pixel in mJ/cm²
#[derive(Debug, Clone, PartialEq)]
pub struct DoseField {
    values: DMatrix<f64>,
    pixel_size_nm: f64,
    wavelength_nm: f64,
    source: ExposureSource,
}

impl DoseField {
    /// Dose field whose photons land exactly where the dose is recorded
    pub fn new(values: DMatrix<f64>, pixel_size_nm: f64, wavelength_nm: f64) -> Self {
        let source = ExposureSource {
            transmitted: values.clone(),
            flare_dose: 0.0,
            psf_sigma_px: 0.0,
        };
        Self::with_source(values, pixel_size_nm, wavelength_nm, source)
    }

    /// Dose field produced by imaging `source`; `values` is its mean
    pub fn with_source(
        values: DMatrix<f64>,
        pixel_size_nm: f64,
        wavelength_nm: f64,
        source: ExposureSource,
    ) -> Self {
        Self {
            values,
            pixel_size_nm,
            wavelength_nm,
            source,
        }
    }

    /// Wavelength the dose was delivered at, needed to count photons
    pub fn wavelength_nm(&self) -> f64 {
        self.wavelength_nm
    }

    pub fn source(&self) -> &ExposureSource {
        &self.source
    }
}

impl Field for DoseField {
    fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    fn pixel_size_nm(&self) -> f64 {
        self.pixel_size_nm
    }
}

/// Generated acid concentration (molecules/nm²) before the bake
#[derive(Debug, Clone, PartialEq)]
pub struct AcidGenerationField {
    values: DMatrix<f64>,
    pixel_size_nm: f64,
}

impl AcidGenerationField {
    pub fn new(values: DMatrix<f64>, pixel_size_nm: f64) -> Self {
        Self {
            values,
            pixel_size_nm,
        }
    }

    /// Total number of acid molecules (concentration × pixel area)
    pub fn molecules(&self) -> f64 {
        self.total() * self.pixel_size_nm * self.pixel_size_nm
    }
}

impl Field for AcidGenerationField {
    fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    fn pixel_size_nm(&self) -> f64 {
        self.pixel_size_nm
    }
}

/// Acid concentration (molecules/nm²) after post-exposure bake
#[derive(Debug, Clone, PartialEq)]
pub struct LatentImage {
    values: DMatrix<f64>,
    pixel_size_nm: f64,
}

impl LatentImage {
    pub fn new(values: DMatrix<f64>, pixel_size_nm: f64) -> Self {
        Self {
            values,
            pixel_size_nm,
        }
    }

    pub fn molecules(&self) -> f64 {
        self.total() * self.pixel_size_nm * self.pixel_size_nm
    }
}

impl Field for LatentImage {
    fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    fn pixel_size_nm(&self) -> f64 {
        self.pixel_size_nm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let values = DMatrix::from_fn(2, 3, |r, c| (r * 3 + c) as f64);
        let image = LatentImage::new(values, 0.5);
        assert_eq!(image.shape(), (2, 3));
        assert_eq!(image.row_profile(1), vec![3.0, 4.0, 5.0]);
        assert_eq!(image.mean_profile(), vec![1.5, 2.5, 3.5]);
        assert_eq!(image.max_value(), 5.0);
        assert!((image.molecules() - 15.0 * 0.25).abs() < 1e-12);
    }
}
