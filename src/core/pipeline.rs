//! One exposure: mask to metrics

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::development::{DevelopedContour, DevelopmentModel};
use crate::core::diffusion::DiffusionModel;
use crate::core::dose::DoseModel;
use crate::core::error::Result;
use crate::core::field::{AcidGenerationField, DoseField, LatentImage};
use crate::core::mask::PatternMask;
use crate::core::metrics::{Metrics, MetricsExtractor};
use crate::core::photon::{PhotonStatistics, StochasticPhotonModel};
use crate::entities::resist::ResistParameters;
use crate::entities::tool::ToolParameters;

/// Configured exposure. Holds parameters only, so one value can be shared
/// by every worker of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposurePipeline {
    tool: ToolParameters,
    resist: ResistParameters,
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub dose_mj_cm2: f64,
    pub focus_nm: f64,
    pub target_cd_nm: f64,
    pub metrics: Metrics,
}

/// Every intermediate field of one run, for inspection and plotting
#[derive(Debug, Clone)]
pub struct ExposureTrace {
    pub dose: DoseField,
    pub acid: AcidGenerationField,
    pub latent: LatentImage,
    pub contour: DevelopedContour,
    /// `Err` when the contour could not be measured
    pub metrics: Result<Metrics>,
}

impl ExposurePipeline {
    /// Validate the configuration once, before any simulation work
    pub fn new(tool: ToolParameters, resist: ResistParameters) -> Result<Self> {
        tool.validate()?;
        resist.validate()?;
        Ok(Self { tool, resist })
    }

    pub fn tool(&self) -> &ToolParameters {
        &self.tool
    }

    pub fn resist(&self) -> &ResistParameters {
        &self.resist
    }

    /// Same resist, different dose and focus
    pub fn at(&self, dose_mj_cm2: f64, focus_nm: f64) -> Result<Self> {
        Self::new(
            self.tool.with_dose(dose_mj_cm2).with_focus(focus_nm),
            self.resist,
        )
    }

    pub fn photon_statistics(&self, mask: &PatternMask) -> PhotonStatistics {
        PhotonStatistics::for_dose(
            self.tool.dose_mj_cm2,
            self.tool.wavelength_nm(),
            mask.area_um2(),
        )
    }

    pub fn run(&self, mask: &PatternMask, target_cd_nm: f64, seed: u64) -> Result<RunReport> {
        let contour = self.develop(mask, seed)?.3;
        let metrics = MetricsExtractor::measure(&contour, target_cd_nm, mask.pixel_size_nm())?;

        debug!(
            "run: dose {} focus {} seed {} -> cd {:.3} nm, ler {:.3} nm, {} defect(s)",
            self.tool.dose_mj_cm2,
            self.tool.focus_nm,
            seed,
            metrics.cd_nm,
            metrics.ler_nm,
            metrics.defect_count
        );

        Ok(RunReport {
            seed,
            dose_mj_cm2: self.tool.dose_mj_cm2,
            focus_nm: self.tool.focus_nm,
            target_cd_nm,
            metrics,
        })
    }

    /// Like [`run`](Self::run) but keeps the intermediate fields. Only
    /// configuration problems are returned as `Err`.
    pub fn trace(&self, mask: &PatternMask, target_cd_nm: f64, seed: u64) -> Result<ExposureTrace> {
        let (dose, acid, latent, contour) = self.develop(mask, seed)?;
        let metrics = MetricsExtractor::measure(&contour, target_cd_nm, mask.pixel_size_nm());
        Ok(ExposureTrace {
            dose,
            acid,
            latent,
            contour,
            metrics,
        })
    }

    fn develop(
        &self,
        mask: &PatternMask,
        seed: u64,
    ) -> Result<(DoseField, AcidGenerationField, LatentImage, DevelopedContour)> {
        let dose = DoseModel::compute(mask, &self.tool, &self.resist)?;
        let acid = StochasticPhotonModel::generate(&dose, &self.resist, seed)?;
        let latent = DiffusionModel::diffuse(&acid, &self.resist)?;
        let contour = DevelopmentModel::develop(&latent, mask, self.resist.development_threshold)?;
        Ok((dose, acid, latent, contour))
    }
}
