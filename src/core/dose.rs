//! Deterministic dose deposition
//!
//! Aerial image = mask blurred by a Gaussian PSF whose width scales with λ/NA
//! and broadens with defocus. A flare floor keeps dark regions from reaching
//! zero. Beer-Lambert absorption through the film turns incident dose into
//! absorbed dose. The field keeps its unblurred source so the photon stage
//! can trace individual photons through the same PSF.

use log::debug;

use crate::core::error::Result;
use crate::core::field::{DoseField, ExposureSource};
use crate::core::kernel::GaussianKernel;
use crate::core::mask::PatternMask;
use crate::entities::resist::ResistParameters;
use crate::entities::tool::ToolParameters;

/// Optical/absorption stage. Stateless; holds nothing between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoseModel;

impl DoseModel {
    /// Absorbed dose map for `mask` under the given tool and resist.
    ///
    /// Fails with a configuration error before any work when the absorption
    /// coefficient is not positive or the NA is outside (0, 1].
    pub fn compute(
        mask: &PatternMask,
        tool: &ToolParameters,
        resist: &ResistParameters,
    ) -> Result<DoseField> {
        tool.validate()?;
        resist.validate()?;

        let psf = GaussianKernel::from_nm(tool.effective_psf_sigma_nm(), mask.pixel_size_nm());

        let flare = tool.flare_fraction;
        let absorbed = tool.dose_mj_cm2 * resist.absorbed_fraction();
        let transmitted = mask.to_intensity() * (absorbed * (1.0 - flare));
        let flare_dose = absorbed * flare;
        let values = psf.blur(&transmitted).add_scalar(flare_dose);

        debug!(
            "dose: {}x{} px, psf sigma {:.2} px, absorbed fraction {:.4}",
            mask.height(),
            mask.width(),
            psf.sigma_px(),
            resist.absorbed_fraction()
        );

        let source = ExposureSource {
            transmitted,
            flare_dose,
            psf_sigma_px: psf.sigma_px(),
        };
        Ok(DoseField::with_source(
            values,
            mask.pixel_size_nm(),
            tool.wavelength_nm(),
            source,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SimError;
    use crate::core::field::Field;

    fn lines() -> PatternMask {
        PatternMask::line_space(8, 64, 16, 32, 1.0).unwrap()
    }

    #[test]
    fn test_dose_bounded_by_incident() {
        let tool = ToolParameters::default();
        let resist = ResistParameters::default();
        let dose = DoseModel::compute(&lines(), &tool, &resist).unwrap();
        assert_eq!(dose.shape(), (8, 64));
        let ceiling = tool.dose_mj_cm2 * resist.absorbed_fraction();
        let floor = ceiling * tool.flare_fraction;
        for &v in dose.values().iter() {
            assert!(v >= floor - 1e-9 && v <= ceiling + 1e-9, "dose {} outside [{}, {}]", v, floor, ceiling);
        }
    }

    #[test]
    fn test_exposed_brighter_than_dark() {
        let dose = DoseModel::compute(
            &lines(),
            &ToolParameters::default(),
            &ResistParameters::default(),
        )
        .unwrap();
        let profile = dose.row_profile(4);
        // Line centre (col 40) vs gap centre (col 56)
        assert!(profile[40] > 2.0 * profile[56]);
    }

    #[test]
    fn test_higher_na_sharpens_edge() {
        let resist = ResistParameters::default();
        let low = DoseModel::compute(&lines(), &ToolParameters::low_na(), &resist).unwrap();
        let high = DoseModel::compute(&lines(), &ToolParameters::high_na(), &resist).unwrap();
        // Edge slope between columns 31 and 32
        let slope = |d: &DoseField| (d.values()[(4, 32)] - d.values()[(4, 31)]).abs();
        assert!(slope(&high) > slope(&low));
    }

    #[test]
    fn test_defocus_lowers_contrast() {
        let resist = ResistParameters::default();
        let tool = ToolParameters::default();
        let focused = DoseModel::compute(&lines(), &tool, &resist).unwrap();
        let defocused = DoseModel::compute(&lines(), &tool.with_focus(80.0), &resist).unwrap();
        let contrast = |d: &DoseField| d.values()[(4, 40)] - d.values()[(4, 56)];
        assert!(contrast(&defocused) < contrast(&focused));
    }

    #[test]
    fn test_source_images_to_dose() {
        let tool = ToolParameters::default();
        let resist = ResistParameters::default();
        let dose = DoseModel::compute(&lines(), &tool, &resist).unwrap();
        let source = dose.source();
        assert!((source.psf_sigma_px - tool.effective_psf_sigma_nm()).abs() < 1e-12);
        // Blurring conserves dose, so totals agree up to the flare floor
        let (h, w) = dose.shape();
        let expected = source.transmitted.sum() + source.flare_dose * (h * w) as f64;
        assert!((dose.total() - expected).abs() < 1e-9 * expected);
        assert_eq!(source.transmitted[(4, 56)], 0.0);
    }

    #[test]
    fn test_is_deterministic() {
        let tool = ToolParameters::default();
        let resist = ResistParameters::default();
        let a = DoseModel::compute(&lines(), &tool, &resist).unwrap();
        let b = DoseModel::compute(&lines(), &tool, &resist).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let resist = ResistParameters {
            absorption_coefficient: -0.1,
            ..Default::default()
        };
        let err = DoseModel::compute(&lines(), &ToolParameters::default(), &resist).unwrap_err();
        assert!(matches!(err, SimError::Configuration { .. }));

        let tool = ToolParameters::default().with_numerical_aperture(1.5);
        let err = DoseModel::compute(&lines(), &tool, &ResistParameters::default()).unwrap_err();
        assert!(matches!(
            err,
            SimError::Configuration {
                parameter: "numerical_aperture",
                ..
            }
        ));
    }
}
