//! Experiment definitions: tool, resist and recipe records

pub mod recipe;
pub mod resist;
pub mod tool;

pub use recipe::{MaskSpec, Recipe, SweepSettings};
pub use resist::{AcidGeneration, ResistKind, ResistParameters};
pub use tool::{ToolParameters, EUV_WAVELENGTH_NM};
