//! Photoresist parameters

use serde::{Deserialize, Serialize};

use crate::core::error::{require_finite, Result, SimError};
use crate::core::photon::photons_per_nm2;
use crate::entities::tool::ToolParameters;

/// Resist platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum ResistKind {
    /// Chemically amplified resist (photo-acid generator + quencher)
    #[default]
    ChemicallyAmplified,
    /// Metal-oxide resist
    MetalOxide,
    /// Non-amplified main-chain scission resist
    MainChainScission,
}

/// How absorbed energy turns into soluble sites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcidGeneration {
    /// Each secondary electron activates an acid whose catalytic gain is
    /// random (lognormal, variance `yield_variance`)
    Amplified,
    /// Each secondary electron converts a fixed number of sites directly
    Direct,
}

impl ResistKind {
    pub fn generation(&self) -> AcidGeneration {
        match self {
            ResistKind::ChemicallyAmplified => AcidGeneration::Amplified,
            ResistKind::MetalOxide | ResistKind::MainChainScission => AcidGeneration::Direct,
        }
    }
}

impl std::fmt::Display for ResistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResistKind::ChemicallyAmplified => write!(f, "chemically-amplified"),
            ResistKind::MetalOxide => write!(f, "metal-oxide"),
            ResistKind::MainChainScission => write!(f, "main-chain-scission"),
        }
    }
}

impl std::str::FromStr for ResistKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chemically-amplified" | "car" => Ok(ResistKind::ChemicallyAmplified),
            "metal-oxide" | "meox" | "mox" => Ok(ResistKind::MetalOxide),
            "main-chain-scission" | "mcs" => Ok(ResistKind::MainChainScission),
            _ => Err(format!("Unknown resist kind: {}", s)),
        }
    }
}

/// Film and chemistry settings for one resist
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResistParameters {
    #[serde(default)]
    pub kind: ResistKind,

    /// Linear absorption coefficient at 13.5 nm (1/nm)
    #[serde(default = "default_absorption")]
    pub absorption_coefficient: f64,

    /// Film thickness (nm)
    #[serde(default = "default_thickness")]
    pub thickness_nm: f64,

    /// Acid diffusion length during PEB (nm)
    #[serde(default = "default_diffusion_length")]
    pub diffusion_length_nm: f64,

    /// Mean acid molecules per absorbed photon. Unbounded above: values over 1
    /// model multi-exciton generation
    #[serde(default = "default_quantum_yield")]
    pub quantum_yield: f64,

    /// Variance of the acid gain of one secondary electron. Only amplified
    /// resists use it
    #[serde(default = "default_yield_variance")]
    pub yield_variance: f64,

    /// Mean secondary electrons released per absorbed photon (Poisson)
    #[serde(default = "default_secondary_electron_yield")]
    pub secondary_electron_yield: f64,

    /// Secondary-electron travel before reacting (nm), taken as 2σ of a
    /// Gaussian scatter
    #[serde(default = "default_electron_range")]
    pub electron_range_nm: f64,

    /// Quencher loading as a fraction in [0, 1]; shortens effective diffusion
    #[serde(default = "default_quencher")]
    pub quencher_loading: f64,

    /// Acid concentration (molecules/nm²) at which the film clears
    #[serde(default = "default_threshold")]
    pub development_threshold: f64,
}

fn default_absorption() -> f64 {
    0.78
}

fn default_thickness() -> f64 {
    40.0
}

fn default_diffusion_length() -> f64 {
    5.2
}

fn default_quantum_yield() -> f64 {
    2.0
}

fn default_yield_variance() -> f64 {
    0.5
}

fn default_secondary_electron_yield() -> f64 {
    3.2
}

fn default_electron_range() -> f64 {
    4.8
}

fn default_quencher() -> f64 {
    0.15
}

fn default_threshold() -> f64 {
    20.8
}

impl Default for ResistParameters {
    fn default() -> Self {
        Self::chemically_amplified()
    }
}

impl ResistParameters {
    // Preset thresholds size 16 nm lines on a 32 nm pitch at 30 mJ/cm² with
    // the default tool.

    pub fn chemically_amplified() -> Self {
        Self {
            kind: ResistKind::ChemicallyAmplified,
            absorption_coefficient: default_absorption(),
            thickness_nm: default_thickness(),
            diffusion_length_nm: default_diffusion_length(),
            quantum_yield: default_quantum_yield(),
            yield_variance: default_yield_variance(),
            secondary_electron_yield: default_secondary_electron_yield(),
            electron_range_nm: default_electron_range(),
            quencher_loading: default_quencher(),
            development_threshold: default_threshold(),
        }
    }

    pub fn metal_oxide() -> Self {
        Self {
            kind: ResistKind::MetalOxide,
            absorption_coefficient: 1.2,
            thickness_nm: 20.0,
            diffusion_length_nm: 2.0,
            quantum_yield: 1.5,
            yield_variance: 0.0,
            secondary_electron_yield: 4.0,
            electron_range_nm: 3.0,
            quencher_loading: 0.0,
            development_threshold: 15.6,
        }
    }

    pub fn main_chain_scission() -> Self {
        Self {
            kind: ResistKind::MainChainScission,
            absorption_coefficient: 0.5,
            thickness_nm: 30.0,
            diffusion_length_nm: 1.0,
            quantum_yield: 1.0,
            yield_variance: 0.0,
            secondary_electron_yield: 3.2,
            electron_range_nm: 4.0,
            quencher_loading: 0.0,
            development_threshold: 10.4,
        }
    }

    pub fn preset(kind: ResistKind) -> Self {
        match kind {
            ResistKind::ChemicallyAmplified => Self::chemically_amplified(),
            ResistKind::MetalOxide => Self::metal_oxide(),
            ResistKind::MainChainScission => Self::main_chain_scission(),
        }
    }

    /// Fraction of incident photons absorbed in the film (Beer-Lambert)
    pub fn absorbed_fraction(&self) -> f64 {
        1.0 - (-self.absorption_coefficient * self.thickness_nm).exp()
    }

    /// Mean acid (or converted sites) produced per secondary electron
    pub fn acid_per_electron(&self) -> f64 {
        self.quantum_yield / self.secondary_electron_yield
    }

    /// Standard deviation of the secondary-electron scatter (nm)
    pub fn electron_blur_sigma_nm(&self) -> f64 {
        0.5 * self.electron_range_nm
    }

    /// Diffusion length after quencher capture (nm)
    pub fn effective_diffusion_length_nm(&self) -> f64 {
        self.diffusion_length_nm * (1.0 - self.quencher_loading)
    }

    /// Set the development threshold so that an equal line/space pattern
    /// prints at its drawn size when exposed at `dose_to_size` with `tool`
    pub fn sized_for(mut self, dose_to_size: f64, tool: &ToolParameters) -> Self {
        let clear_field = dose_to_size
            * self.absorbed_fraction()
            * photons_per_nm2(1.0, tool.wavelength_nm())
            * self.quantum_yield;
        let edge_transmission = tool.flare_fraction + (1.0 - tool.flare_fraction) * 0.5;
        self.development_threshold = clear_field * edge_transmission;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let absorption = require_finite("absorption_coefficient", self.absorption_coefficient)?;
        if absorption <= 0.0 {
            return Err(SimError::config(
                "absorption_coefficient",
                absorption,
                "must be positive",
            ));
        }

        let thickness = require_finite("thickness_nm", self.thickness_nm)?;
        if thickness <= 0.0 {
            return Err(SimError::config("thickness_nm", thickness, "must be positive"));
        }

        let diffusion = require_finite("diffusion_length_nm", self.diffusion_length_nm)?;
        if diffusion < 0.0 {
            return Err(SimError::config(
                "diffusion_length_nm",
                diffusion,
                "must not be negative",
            ));
        }

        let qy = require_finite("quantum_yield", self.quantum_yield)?;
        if qy < 0.0 {
            return Err(SimError::config("quantum_yield", qy, "must not be negative"));
        }

        let variance = require_finite("yield_variance", self.yield_variance)?;
        if variance < 0.0 {
            return Err(SimError::config("yield_variance", variance, "must not be negative"));
        }

        let electrons = require_finite("secondary_electron_yield", self.secondary_electron_yield)?;
        if electrons <= 0.0 {
            return Err(SimError::config(
                "secondary_electron_yield",
                electrons,
                "must be positive",
            ));
        }

        let range = require_finite("electron_range_nm", self.electron_range_nm)?;
        if range < 0.0 {
            return Err(SimError::config("electron_range_nm", range, "must not be negative"));
        }

        let quencher = require_finite("quencher_loading", self.quencher_loading)?;
        if !(0.0..=1.0).contains(&quencher) {
            return Err(SimError::config("quencher_loading", quencher, "must lie in [0, 1]"));
        }

        let threshold = require_finite("development_threshold", self.development_threshold)?;
        if threshold <= 0.0 {
            return Err(SimError::config(
                "development_threshold",
                threshold,
                "must be positive",
            ));
        }

        Ok(())
    }
}
