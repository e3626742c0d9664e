//! Photon shot noise, secondary electrons and acid generation
//!
//! Photons are traced one by one. Each source pixel emits a Poisson number
//! of transmitted and flare photons; transmitted photons are displaced by the
//! PSF, and every photon releases a Poisson number of secondary electrons.
//! The electrons' acid is deposited bilinearly at the landing point and then
//! spread by the electron scatter. The random stream depends only on dose and
//! seed, so changing the optics moves photons without re-rolling them.

use log::debug;
use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::field::{AcidGenerationField, DoseField, Field};
use crate::core::kernel::GaussianKernel;
use crate::core::sampling::{inverse_normal_cdf, lognormal_quantile, poisson_quantile, seeded_rng};
use crate::entities::resist::{AcidGeneration, ResistParameters};

/// h·c in eV·nm
const PLANCK_EV_NM: f64 = 1239.841_984;

/// Joules per electron-volt
const JOULES_PER_EV: f64 = 1.602_176_634e-19;

/// nm² per cm²
const NM2_PER_CM2: f64 = 1e14;

/// Photon energy in eV at `wavelength_nm`
pub fn photon_energy_ev(wavelength_nm: f64) -> f64 {
    PLANCK_EV_NM / wavelength_nm
}

/// Photons per nm² delivered by `dose_mj_cm2`
pub fn photons_per_nm2(dose_mj_cm2: f64, wavelength_nm: f64) -> f64 {
    let joules_per_photon = photon_energy_ev(wavelength_nm) * JOULES_PER_EV;
    dose_mj_cm2 * 1e-3 / joules_per_photon / NM2_PER_CM2
}

/// Shot-noise budget of an exposure over an area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotonStatistics {
    pub dose_mj_cm2: f64,
    pub wavelength_nm: f64,
    pub photon_energy_ev: f64,
    pub photons_per_nm2: f64,
    pub area_um2: f64,
    pub total_photons: f64,
    /// √N
    pub shot_noise: f64,
    /// 1/√N
    pub relative_shot_noise: f64,
}

impl PhotonStatistics {
    pub fn for_dose(dose_mj_cm2: f64, wavelength_nm: f64, area_um2: f64) -> Self {
        let density = photons_per_nm2(dose_mj_cm2, wavelength_nm);
        let total_photons = density * area_um2 * 1e6;
        let shot_noise = total_photons.sqrt();
        let relative_shot_noise = if total_photons > 0.0 {
            shot_noise / total_photons
        } else {
            f64::INFINITY
        };

        Self {
            dose_mj_cm2,
            wavelength_nm,
            photon_energy_ev: photon_energy_ev(wavelength_nm),
            photons_per_nm2: density,
            area_um2,
            total_photons,
            shot_noise,
            relative_shot_noise,
        }
    }
}

/// Stochastic generation stage. Owns no generator; each call seeds its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct StochasticPhotonModel;

impl StochasticPhotonModel {
    /// Sample acid concentration (molecules/nm²) for `dose`.
    ///
    /// Per pixel, in row-major order: two uniforms for the transmitted and
    /// flare photon counts. Per photon: four uniforms for the PSF
    /// displacement, the electron count and the electrons' mean gain. An
    /// amplified resist draws the gain from a lognormal with variance
    /// `yield_variance / electrons`; a direct resist converts exactly
    /// `acid_per_electron` sites per electron.
    pub fn generate(
        dose: &DoseField,
        resist: &ResistParameters,
        seed: u64,
    ) -> Result<AcidGenerationField> {
        resist.validate()?;

        let source = dose.source();
        let mut rng = seeded_rng(seed);
        let pixel_area = dose.pixel_size_nm() * dose.pixel_size_nm();
        let photons_per_unit_dose = photons_per_nm2(1.0, dose.wavelength_nm()) * pixel_area;
        let flare_expected = source.flare_dose * photons_per_unit_dose;
        let generation = resist.kind.generation();
        let (height, width) = dose.shape();

        let mut deposit = Deposit::new(height, width);
        let mut photons_total: u64 = 0;
        let mut electrons_total: u64 = 0;
        for row in 0..height {
            for col in 0..width {
                let u_transmitted: f64 = rng.random();
                let u_flare: f64 = rng.random();
                let expected = source.transmitted[(row, col)] * photons_per_unit_dose;
                let transmitted = poisson_quantile(expected, u_transmitted);
                let flare = poisson_quantile(flare_expected, u_flare);
                photons_total += transmitted + flare;

                for photon in 0..transmitted + flare {
                    let u_dy: f64 = rng.random();
                    let u_dx: f64 = rng.random();
                    let u_electrons: f64 = rng.random();
                    let u_gain: f64 = rng.random();

                    let (mut y, mut x) = (row as f64, col as f64);
                    if photon < transmitted && source.psf_sigma_px > 0.0 {
                        y += source.psf_sigma_px * inverse_normal_cdf(u_dy);
                        x += source.psf_sigma_px * inverse_normal_cdf(u_dx);
                    }

                    let electrons = poisson_quantile(resist.secondary_electron_yield, u_electrons);
                    if electrons == 0 {
                        continue;
                    }
                    electrons_total += electrons;

                    let n = electrons as f64;
                    let gain = match generation {
                        AcidGeneration::Amplified => lognormal_quantile(
                            resist.acid_per_electron(),
                            resist.yield_variance / n,
                            u_gain,
                        ),
                        AcidGeneration::Direct => resist.acid_per_electron(),
                    };
                    deposit.splat(y, x, n * gain);
                }
            }
        }

        let scatter =
            GaussianKernel::from_nm(resist.electron_blur_sigma_nm(), dose.pixel_size_nm());
        let acid = scatter.blur(&(deposit.into_matrix() / pixel_area));

        debug!(
            "photon: seed {} absorbed {} photons, {} secondary electrons over {} px",
            seed,
            photons_total,
            electrons_total,
            height * width
        );

        Ok(AcidGenerationField::new(acid, dose.pixel_size_nm()))
    }
}

/// Accumulates point deposits on the pixel grid. Positions are in pixel
/// units with pixel centres on integers; anything past the border is
/// mirrored back, matching the blur's boundary.
struct Deposit {
    values: DMatrix<f64>,
}

impl Deposit {
    fn new(height: usize, width: usize) -> Self {
        Self {
            values: DMatrix::zeros(height, width),
        }
    }

    /// Share `amount` among the four pixels around (`y`, `x`)
    fn splat(&mut self, y: f64, x: f64, amount: f64) {
        let (height, width) = self.values.shape();
        let y = fold(y, height);
        let x = fold(x, width);

        let (y0, x0) = (y.floor(), x.floor());
        let (fy, fx) = (y - y0, x - x0);
        let rows = [(clamp_index(y0, height), 1.0 - fy), (clamp_index(y0 + 1.0, height), fy)];
        let cols = [(clamp_index(x0, width), 1.0 - fx), (clamp_index(x0 + 1.0, width), fx)];
        for &(r, wy) in &rows {
            for &(c, wx) in &cols {
                self.values[(r, c)] += amount * wy * wx;
            }
        }
    }

    fn into_matrix(self) -> DMatrix<f64> {
        self.values
    }
}

/// Mirror a coordinate into [-0.5, len - 0.5]
fn fold(position: f64, len: usize) -> f64 {
    let period = 2.0 * len as f64;
    let m = (position + 0.5).rem_euclid(period);
    if m < len as f64 {
        m - 0.5
    } else {
        period - m - 0.5
    }
}

fn clamp_index(index: f64, len: usize) -> usize {
    (index.max(0.0) as usize).min(len - 1)
}
