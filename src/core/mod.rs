//! Core module - exposure physics, sampling and metrics

pub mod development;
pub mod diffusion;
pub mod dose;
pub mod error;
pub mod field;
pub mod kernel;
pub mod mask;
pub mod metrics;
pub mod photon;
pub mod pipeline;
pub mod sampling;
pub mod sweep;

pub use development::{DefectEvent, DefectKind, DevelopedContour, DevelopmentModel, EdgePair};
pub use diffusion::DiffusionModel;
pub use dose::DoseModel;
pub use error::{Result, SimError};
pub use field::{AcidGenerationField, DoseField, ExposureSource, Field, LatentImage};
pub use kernel::GaussianKernel;
pub use mask::{LineSpan, PatternMask};
pub use metrics::{Metrics, MetricsExtractor};
pub use photon::{PhotonStatistics, StochasticPhotonModel};
pub use pipeline::{ExposurePipeline, ExposureTrace, RunReport};
pub use sampling::derive_seed;
pub use sweep::{
    GridPoint, ProcessWindowResult, ProcessWindowSweeper, SweepControl, SweepThresholds,
};
