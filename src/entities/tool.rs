//! Exposure tool parameters

use serde::{Deserialize, Serialize};

use crate::core::error::{require_finite, Result, SimError};

/// EUV wavelength (nm); every tool in this model exposes at 13.5 nm
pub const EUV_WAVELENGTH_NM: f64 = 13.5;

/// Scanner settings for one exposure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolParameters {
    /// Incident dose (mJ/cm²)
    #[serde(default = "default_dose")]
    pub dose_mj_cm2: f64,

    /// Numerical aperture, in (0, 1]
    #[serde(default = "default_na")]
    pub numerical_aperture: f64,

    /// Focus offset (nm); sign is irrelevant to the blur model
    #[serde(default)]
    pub focus_nm: f64,

    /// PSF width as a multiple of λ/NA
    #[serde(default = "default_psf_sigma_factor")]
    pub psf_sigma_factor: f64,

    /// Defocus at which the PSF doubles in width (nm)
    #[serde(default = "default_defocus_scale")]
    pub defocus_scale_nm: f64,

    /// Fraction of clear-field intensity leaking into dark regions
    #[serde(default = "default_flare")]
    pub flare_fraction: f64,
}

fn default_dose() -> f64 {
    30.0
}

fn default_na() -> f64 {
    0.33
}

fn default_psf_sigma_factor() -> f64 {
    0.1
}

fn default_defocus_scale() -> f64 {
    100.0
}

fn default_flare() -> f64 {
    0.02
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            dose_mj_cm2: default_dose(),
            numerical_aperture: default_na(),
            focus_nm: 0.0,
            psf_sigma_factor: default_psf_sigma_factor(),
            defocus_scale_nm: default_defocus_scale(),
            flare_fraction: default_flare(),
        }
    }
}

impl ToolParameters {
    /// Low-NA production scanner (NA 0.33)
    pub fn low_na() -> Self {
        Self::default()
    }

    /// High-NA scanner (NA 0.55)
    pub fn high_na() -> Self {
        Self {
            numerical_aperture: 0.55,
            ..Self::default()
        }
    }

    pub fn wavelength_nm(&self) -> f64 {
        EUV_WAVELENGTH_NM
    }

    pub fn with_dose(mut self, dose_mj_cm2: f64) -> Self {
        self.dose_mj_cm2 = dose_mj_cm2;
        self
    }

    pub fn with_focus(mut self, focus_nm: f64) -> Self {
        self.focus_nm = focus_nm;
        self
    }

    pub fn with_numerical_aperture(mut self, na: f64) -> Self {
        self.numerical_aperture = na;
        self
    }

    /// In-focus PSF standard deviation (nm), inversely proportional to NA
    pub fn psf_sigma_nm(&self) -> f64 {
        self.psf_sigma_factor * self.wavelength_nm() / self.numerical_aperture
    }

    /// PSF standard deviation including defocus broadening (nm)
    pub fn effective_psf_sigma_nm(&self) -> f64 {
        self.psf_sigma_nm() * (1.0 + self.focus_nm.abs() / self.defocus_scale_nm)
    }

    /// Check every field; the first violation is reported
    pub fn validate(&self) -> Result<()> {
        let na = require_finite("numerical_aperture", self.numerical_aperture)?;
        if na <= 0.0 || na > 1.0 {
            return Err(SimError::config("numerical_aperture", na, "must lie in (0, 1]"));
        }

        let dose = require_finite("dose_mj_cm2", self.dose_mj_cm2)?;
        if dose <= 0.0 {
            return Err(SimError::config("dose_mj_cm2", dose, "must be positive"));
        }

        require_finite("focus_nm", self.focus_nm)?;

        let factor = require_finite("psf_sigma_factor", self.psf_sigma_factor)?;
        if factor < 0.0 {
            return Err(SimError::config("psf_sigma_factor", factor, "must not be negative"));
        }

        let scale = require_finite("defocus_scale_nm", self.defocus_scale_nm)?;
        if scale <= 0.0 {
            return Err(SimError::config("defocus_scale_nm", scale, "must be positive"));
        }

        let flare = require_finite("flare_fraction", self.flare_fraction)?;
        if !(0.0..1.0).contains(&flare) {
            return Err(SimError::config("flare_fraction", flare, "must lie in [0, 1)"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let tool = ToolParameters::default();
        assert!(tool.validate().is_ok());
        assert_eq!(tool.wavelength_nm(), 13.5);
        assert!(ToolParameters::high_na().validate().is_ok());
    }

    #[test]
    fn test_na_out_of_range() {
        for na in [0.0, -0.1, 1.01, f64::NAN] {
            let tool = ToolParameters::default().with_numerical_aperture(na);
            match tool.validate() {
                Err(SimError::Configuration { parameter, .. }) => {
                    assert_eq!(parameter, "numerical_aperture")
                }
                other => panic!("NA {} accepted: {:?}", na, other),
            }
        }
        assert!(ToolParameters::default()
            .with_numerical_aperture(1.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_psf_narrows_with_na() {
        let low = ToolParameters::low_na();
        let high = ToolParameters::high_na();
        assert!(high.psf_sigma_nm() < low.psf_sigma_nm());
        assert!((low.psf_sigma_nm() - 0.1 * 13.5 / 0.33).abs() < 1e-12);
    }

    #[test]
    fn test_defocus_broadens_psf() {
        let tool = ToolParameters::default();
        let defocused = tool.with_focus(-50.0);
        assert!((defocused.effective_psf_sigma_nm() - 1.5 * tool.psf_sigma_nm()).abs() < 1e-12);
        assert_eq!(
            tool.with_focus(50.0).effective_psf_sigma_nm(),
            defocused.effective_psf_sigma_nm()
        );
    }

    #[test]
    fn test_yaml_defaults_fill_missing_fields() {
        let tool: ToolParameters = serde_yml::from_str("dose_mj_cm2: 24.0\n").unwrap();
        assert_eq!(tool.dose_mj_cm2, 24.0);
        assert_eq!(tool.numerical_aperture, 0.33);
        assert_eq!(tool.flare_fraction, 0.02);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<ToolParameters, _> =
            serde_yml::from_str("dose_mj_cm2: 24.0\nsigma: 0.5\n");
        assert!(result.is_err());
    }
}
