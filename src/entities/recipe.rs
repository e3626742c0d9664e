//! Recipe - a complete exposure experiment in one YAML document

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::mask::PatternMask;
use crate::core::pipeline::ExposurePipeline;
use crate::core::sweep::{ProcessWindowSweeper, SweepControl, SweepThresholds};
use crate::entities::resist::ResistParameters;
use crate::entities::tool::ToolParameters;

/// How the pattern mask is generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
pub enum MaskSpec {
    /// Vertical lines of `line_px` on a `pitch_px` pitch, first line at x = 0
    LineSpace {
        height_px: usize,
        width_px: usize,
        line_px: usize,
        pitch_px: usize,
        #[serde(default = "default_pixel_size")]
        pixel_size_nm: f64,
    },
    /// Drawn layout: `#`/`1` exposed, `.`/`0` dark, one text line per row
    Ascii {
        art: String,
        #[serde(default = "default_pixel_size")]
        pixel_size_nm: f64,
    },
}

fn default_pixel_size() -> f64 {
    1.0
}

impl Default for MaskSpec {
    fn default() -> Self {
        MaskSpec::LineSpace {
            height_px: 256,
            width_px: 256,
            line_px: 16,
            pitch_px: 32,
            pixel_size_nm: default_pixel_size(),
        }
    }
}

impl MaskSpec {
    pub fn build(&self) -> Result<PatternMask> {
        match self {
            MaskSpec::LineSpace {
                height_px,
                width_px,
                line_px,
                pitch_px,
                pixel_size_nm,
            } => PatternMask::line_space(*height_px, *width_px, *line_px, *pitch_px, *pixel_size_nm),
            MaskSpec::Ascii { art, pixel_size_nm } => PatternMask::from_ascii(art, *pixel_size_nm),
        }
    }

    /// Drawn line width in nm, when the generator defines one
    pub fn nominal_cd_nm(&self) -> Option<f64> {
        match self {
            MaskSpec::LineSpace {
                line_px,
                pixel_size_nm,
                ..
            } => Some(*line_px as f64 * pixel_size_nm),
            MaskSpec::Ascii { .. } => None,
        }
    }
}

/// Dose × focus grid settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSettings {
    /// [start, end] in mJ/cm²
    #[serde(default = "default_dose_range")]
    pub dose_range: [f64; 2],

    /// [start, end] in nm
    #[serde(default = "default_focus_range")]
    pub focus_range: [f64; 2],

    /// Points per axis
    #[serde(default = "default_grid_resolution")]
    pub grid_resolution: usize,

    /// Fixed worker count; all cores when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

fn default_dose_range() -> [f64; 2] {
    [24.0, 36.0]
}

fn default_focus_range() -> [f64; 2] {
    [-50.0, 50.0]
}

fn default_grid_resolution() -> usize {
    5
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            dose_range: default_dose_range(),
            focus_range: default_focus_range(),
            grid_resolution: default_grid_resolution(),
            workers: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tool: ToolParameters,

    #[serde(default)]
    pub resist: ResistParameters,

    #[serde(default)]
    pub mask: MaskSpec,

    /// Target line width (nm)
    #[serde(default = "default_target_cd")]
    pub target_cd_nm: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub thresholds: SweepThresholds,

    #[serde(default)]
    pub sweep: SweepSettings,
}

fn default_target_cd() -> f64 {
    16.0
}

fn default_seed() -> u64 {
    42
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            name: String::new(),
            tool: ToolParameters::default(),
            resist: ResistParameters::default(),
            mask: MaskSpec::default(),
            target_cd_nm: default_target_cd(),
            seed: default_seed(),
            thresholds: SweepThresholds::default(),
            sweep: SweepSettings::default(),
        }
    }
}

impl Recipe {
    pub fn pipeline(&self) -> Result<ExposurePipeline> {
        ExposurePipeline::new(self.tool, self.resist)
    }

    pub fn sweeper(&self, mut control: SweepControl) -> ProcessWindowSweeper {
        if control.workers.is_none() {
            control.workers = self.sweep.workers;
        }
        ProcessWindowSweeper::new(self.tool, self.resist)
            .with_seed(self.seed)
            .with_control(control)
    }

    /// Every physical rule violation in the recipe, in document order
    pub fn check(&self) -> Vec<SimError> {
        let mut problems = Vec::new();
        if let Err(e) = self.tool.validate() {
            problems.push(e);
        }
        if let Err(e) = self.resist.validate() {
            problems.push(e);
        }
        if let Err(e) = self.mask.build() {
            problems.push(e);
        }
        if !(self.target_cd_nm.is_finite() && self.target_cd_nm > 0.0) {
            problems.push(SimError::config(
                "target_cd_nm",
                self.target_cd_nm,
                "must be positive",
            ));
        }
        if let Err(e) = self.thresholds.validate() {
            problems.push(e);
        }
        if self.sweep.grid_resolution == 0 {
            problems.push(SimError::InvalidSweep(
                "grid_resolution must be at least 1".to_string(),
            ));
        }
        if self.sweep.workers == Some(0) {
            problems.push(SimError::InvalidSweep("workers must be at least 1".to_string()));
        }
        let lowest_dose = self.sweep.dose_range[0].min(self.sweep.dose_range[1]);
        if !(lowest_dose > 0.0) {
            problems.push(SimError::config(
                "sweep.dose_range",
                lowest_dose,
                "doses must be positive",
            ));
        }
        if !self.sweep.focus_range.iter().all(|f| f.is_finite()) {
            problems.push(SimError::InvalidSweep("focus_range must be finite".to_string()));
        }
        problems
    }
}
