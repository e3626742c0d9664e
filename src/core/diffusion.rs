//! Post-exposure-bake acid diffusion
//!
//! Acid spreads as a Gaussian with the resist's diffusion length, shortened
//! by quencher capture. The blur conserves total acid.

use log::debug;

use crate::core::error::Result;
use crate::core::field::{AcidGenerationField, Field, LatentImage};
use crate::core::kernel::GaussianKernel;
use crate::entities::resist::ResistParameters;

#[derive(Debug, Clone, Copy, Default)]
pub struct DiffusionModel;

impl DiffusionModel {
    /// Bake kernel for `resist` on a grid of `pixel_size_nm`
    pub fn kernel(resist: &ResistParameters, pixel_size_nm: f64) -> GaussianKernel {
        GaussianKernel::from_nm(resist.effective_diffusion_length_nm(), pixel_size_nm)
    }

    pub fn diffuse(acid: &AcidGenerationField, resist: &ResistParameters) -> Result<LatentImage> {
        resist.validate()?;

        let kernel = Self::kernel(resist, acid.pixel_size_nm());
        let latent = LatentImage::new(kernel.blur(acid.values()), acid.pixel_size_nm());

        debug!(
            "diffusion: sigma {:.2} px, acid {:.4e} -> {:.4e} molecules",
            kernel.sigma_px(),
            acid.molecules(),
            latent.molecules()
        );

        Ok(latent)
    }
}
