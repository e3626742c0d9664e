//! Process-window sweep over a dose × focus grid
//!
//! Grid points are independent. Each one runs a full exposure with a seed
//! derived from the sweep seed and the point's indices, so results do not
//! depend on scheduling or on the number of workers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::error::{require_finite, Result, SimError};
use crate::core::mask::PatternMask;
use crate::core::metrics::Metrics;
use crate::core::pipeline::ExposurePipeline;
use crate::core::sampling::derive_seed;
use crate::entities::resist::ResistParameters;
use crate::entities::tool::ToolParameters;

/// Default CD tolerance as a fraction of the target CD
pub const DEFAULT_CD_TOLERANCE: f64 = 0.10;

/// Default LER limit (nm)
pub const DEFAULT_MAX_LER_NM: f64 = 1.5;

fn default_max_ler() -> f64 {
    DEFAULT_MAX_LER_NM
}

/// Pass/fail limits for one grid point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepThresholds {
    /// |CD error| limit (nm); `None` means 10 % of the target CD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_abs_cd_error_nm: Option<f64>,

    #[serde(default = "default_max_ler")]
    pub max_ler_nm: f64,

    /// Defect density limit (defects/µm²); unchecked when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_defects_per_um2: Option<f64>,
}

impl Default for SweepThresholds {
    fn default() -> Self {
        Self {
            max_abs_cd_error_nm: None,
            max_ler_nm: DEFAULT_MAX_LER_NM,
            max_defects_per_um2: None,
        }
    }
}

impl SweepThresholds {
    pub fn cd_limit_nm(&self, target_cd_nm: f64) -> f64 {
        self.max_abs_cd_error_nm
            .unwrap_or(DEFAULT_CD_TOLERANCE * target_cd_nm)
    }

    /// NaN metrics never pass
    pub fn passes(&self, metrics: &Metrics, target_cd_nm: f64) -> bool {
        let cd_ok = metrics.cd_error_nm.abs() <= self.cd_limit_nm(target_cd_nm);
        let ler_ok = metrics.ler_nm <= self.max_ler_nm;
        let defects_ok = self
            .max_defects_per_um2
            .is_none_or(|max| metrics.stochastic_defects_per_um2 <= max);
        cd_ok && ler_ok && defects_ok
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(cd) = self.max_abs_cd_error_nm {
            if require_finite("max_abs_cd_error_nm", cd)? < 0.0 {
                return Err(SimError::config("max_abs_cd_error_nm", cd, "must not be negative"));
            }
        }
        if require_finite("max_ler_nm", self.max_ler_nm)? < 0.0 {
            return Err(SimError::config("max_ler_nm", self.max_ler_nm, "must not be negative"));
        }
        if let Some(d) = self.max_defects_per_um2 {
            if require_finite("max_defects_per_um2", d)? < 0.0 {
                return Err(SimError::config("max_defects_per_um2", d, "must not be negative"));
            }
        }
        Ok(())
    }
}

/// Cooperative cancellation and worker sizing
#[derive(Debug, Clone, Default)]
pub struct SweepControl {
    /// Checked before each grid point
    pub cancel: Option<Arc<AtomicBool>>,
    /// Points not started by this instant are skipped
    pub deadline: Option<Instant>,
    /// Fixed worker count; rayon's global pool otherwise
    pub workers: Option<usize>,
    /// Incremented as each grid point finishes
    pub progress: Option<Arc<AtomicUsize>>,
}

impl SweepControl {
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_progress(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.progress = Some(counter);
        self
    }

    fn should_stop(&self) -> bool {
        let cancelled = self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        cancelled || expired
    }
}

/// Dose/focus grid outcome; all sequences run in grid order (dose-major)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessWindowResult {
    pub dose: Vec<f64>,
    pub focus: Vec<f64>,
    pub dose_index: Vec<usize>,
    pub focus_index: Vec<usize>,
    pub cd_error: Vec<f64>,
    pub ler: Vec<f64>,
    pub defects_per_um2: Vec<f64>,
    pub passed: Vec<bool>,
    /// Why a point could not be measured
    pub failure: Vec<Option<String>>,
    /// Percentage of evaluated points passing every threshold
    pub process_window_size: f64,
    pub grid_resolution: usize,
    pub target_cd_nm: f64,
    pub seed: u64,
    pub thresholds: SweepThresholds,
    pub cancelled: bool,
}

/// One row of a [`ProcessWindowResult`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPoint {
    pub dose: f64,
    pub focus: f64,
    pub cd_error: f64,
    pub ler: f64,
    pub defects: f64,
    pub pass: bool,
}

impl ProcessWindowResult {
    pub fn len(&self) -> usize {
        self.dose.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dose.is_empty()
    }

    pub fn passing(&self) -> usize {
        self.passed.iter().filter(|&&p| p).count()
    }

    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        (0..self.len()).map(move |i| GridPoint {
            dose: self.dose[i],
            focus: self.focus[i],
            cd_error: self.cd_error[i],
            ler: self.ler[i],
            defects: self.defects_per_um2[i],
            pass: self.passed[i],
        })
    }

    /// Widest contiguous passing dose range at any one focus, as a
    /// percentage of that range's centre dose
    pub fn exposure_latitude_percent(&self) -> f64 {
        (0..self.grid_resolution)
            .filter_map(|j| {
                let column: Vec<(f64, bool)> = (0..self.len())
                    .filter(|&i| self.focus_index[i] == j)
                    .map(|i| (self.dose[i], self.passed[i]))
                    .collect();
                widest_run(&column)
            })
            .map(|(lo, hi)| 100.0 * (hi - lo) / (0.5 * (hi + lo)))
            .fold(0.0, f64::max)
    }

    /// Widest contiguous passing focus range at any one dose (nm)
    pub fn depth_of_focus_nm(&self) -> f64 {
        (0..self.grid_resolution)
            .filter_map(|i_dose| {
                let row: Vec<(f64, bool)> = (0..self.len())
                    .filter(|&i| self.dose_index[i] == i_dose)
                    .map(|i| (self.focus[i], self.passed[i]))
                    .collect();
                widest_run(&row)
            })
            .map(|(lo, hi)| hi - lo)
            .fold(0.0, f64::max)
    }
}

/// Extent of the longest run of consecutive passing samples
fn widest_run(samples: &[(f64, bool)]) -> Option<(f64, f64)> {
    let mut best: Option<(f64, f64)> = None;
    let mut start: Option<f64> = None;
    let mut last = 0.0;
    for &(value, pass) in samples.iter().chain(std::iter::once(&(f64::NAN, false))) {
        match (pass, start) {
            (true, None) => start = Some(value),
            (false, Some(lo)) => {
                if best.is_none_or(|(b_lo, b_hi)| last - lo > b_hi - b_lo) {
                    best = Some((lo, last));
                }
                start = None;
            }
            _ => {}
        }
        last = value;
    }
    best
}

/// Inclusive, evenly spaced; a single point sits at the range start
pub fn grid_values(range: (f64, f64), resolution: usize) -> Vec<f64> {
    if resolution <= 1 {
        return vec![range.0];
    }
    let step = (range.1 - range.0) / (resolution - 1) as f64;
    (0..resolution)
        .map(|i| {
            if i == resolution - 1 {
                range.1
            } else {
                range.0 + step * i as f64
            }
        })
        .collect()
}

/// Outcome of one grid point
struct PointOutcome {
    metrics: Metrics,
    failure: Option<String>,
}

pub struct ProcessWindowSweeper {
    tool: ToolParameters,
    resist: ResistParameters,
    seed: u64,
    control: SweepControl,
}

impl ProcessWindowSweeper {
    pub fn new(tool: ToolParameters, resist: ResistParameters) -> Self {
        Self {
            tool,
            resist,
            seed: 0,
            control: SweepControl::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_control(mut self, control: SweepControl) -> Self {
        self.control = control;
        self
    }

    pub fn control(&self) -> &SweepControl {
        &self.control
    }

    /// Evaluate the grid. Configuration problems abort before any point
    /// runs; unmeasurable points are recorded as failing.
    pub fn sweep(
        &self,
        mask: &PatternMask,
        dose_range: (f64, f64),
        focus_range: (f64, f64),
        grid_resolution: usize,
        target_cd_nm: f64,
        thresholds: &SweepThresholds,
    ) -> Result<ProcessWindowResult> {
        if grid_resolution == 0 {
            return Err(SimError::InvalidSweep(
                "grid_resolution must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("dose_range.start", dose_range.0),
            ("dose_range.end", dose_range.1),
            ("focus_range.start", focus_range.0),
            ("focus_range.end", focus_range.1),
        ] {
            if !value.is_finite() {
                return Err(SimError::InvalidSweep(format!("{} is not finite", name)));
            }
        }
        if require_finite("target_cd_nm", target_cd_nm)? <= 0.0 {
            return Err(SimError::config("target_cd_nm", target_cd_nm, "must be positive"));
        }
        thresholds.validate()?;
        if self.control.workers == Some(0) {
            return Err(SimError::InvalidSweep("workers must be at least 1".to_string()));
        }

        let doses = grid_values(dose_range, grid_resolution);
        let focuses = grid_values(focus_range, grid_resolution);

        // Every grid configuration is checked up front
        let base = ExposurePipeline::new(self.tool, self.resist)?;
        let mut pipelines = Vec::with_capacity(doses.len() * focuses.len());
        for &dose in &doses {
            for &focus in &focuses {
                pipelines.push(base.at(dose, focus)?);
            }
        }

        info!(
            "sweep: {}x{} grid, dose {:?} mJ/cm², focus {:?} nm, seed {}",
            grid_resolution, grid_resolution, dose_range, focus_range, self.seed
        );

        let outcomes = match self.control.workers {
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| SimError::InvalidSweep(format!("worker pool: {}", e)))?;
                pool.install(|| self.evaluate_all(mask, &pipelines, grid_resolution, target_cd_nm))
            }
            None => self.evaluate_all(mask, &pipelines, grid_resolution, target_cd_nm),
        };

        let total = outcomes.len();
        let mut result = ProcessWindowResult {
            dose: Vec::with_capacity(total),
            focus: Vec::with_capacity(total),
            dose_index: Vec::with_capacity(total),
            focus_index: Vec::with_capacity(total),
            cd_error: Vec::with_capacity(total),
            ler: Vec::with_capacity(total),
            defects_per_um2: Vec::with_capacity(total),
            passed: Vec::with_capacity(total),
            failure: Vec::with_capacity(total),
            process_window_size: 0.0,
            grid_resolution,
            target_cd_nm,
            seed: self.seed,
            thresholds: *thresholds,
            cancelled: false,
        };

        for (k, outcome) in outcomes.into_iter().enumerate() {
            // Keep only the finished prefix in grid order
            let Some(outcome) = outcome else {
                result.cancelled = true;
                break;
            };
            let outcome = outcome?;
            let (i, j) = (k / grid_resolution, k % grid_resolution);
            let pass =
                outcome.failure.is_none() && thresholds.passes(&outcome.metrics, target_cd_nm);

            result.dose.push(doses[i]);
            result.focus.push(focuses[j]);
            result.dose_index.push(i);
            result.focus_index.push(j);
            result.cd_error.push(outcome.metrics.cd_error_nm);
            result.ler.push(outcome.metrics.ler_nm);
            result.defects_per_um2.push(outcome.metrics.stochastic_defects_per_um2);
            result.passed.push(pass);
            result.failure.push(outcome.failure);
        }

        if !result.is_empty() {
            result.process_window_size = 100.0 * result.passing() as f64 / result.len() as f64;
        }

        if result.cancelled {
            warn!(
                "sweep: stopped after {} of {} point(s)",
                result.len(),
                total
            );
        }
        info!(
            "sweep: {} of {} point(s) pass, window {:.1}%",
            result.passing(),
            result.len(),
            result.process_window_size
        );

        Ok(result)
    }

    /// `None` marks points skipped after cancellation
    fn evaluate_all(
        &self,
        mask: &PatternMask,
        pipelines: &[ExposurePipeline],
        grid_resolution: usize,
        target_cd_nm: f64,
    ) -> Vec<Option<Result<PointOutcome>>> {
        let stopped = AtomicBool::new(false);
        pipelines
            .par_iter()
            .enumerate()
            .map(|(k, pipeline)| {
                if stopped.load(Ordering::Relaxed) || self.control.should_stop() {
                    stopped.store(true, Ordering::Relaxed);
                    return None;
                }
                let (i, j) = (k / grid_resolution, k % grid_resolution);
                let seed = derive_seed(self.seed, i, j);
                let outcome = self.evaluate_point(mask, pipeline, target_cd_nm, seed);
                if let Some(counter) = &self.control.progress {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
                Some(outcome)
            })
            .collect()
    }

    fn evaluate_point(
        &self,
        mask: &PatternMask,
        pipeline: &ExposurePipeline,
        target_cd_nm: f64,
        seed: u64,
    ) -> Result<PointOutcome> {
        match pipeline.run(mask, target_cd_nm, seed) {
            Ok(report) => Ok(PointOutcome {
                metrics: report.metrics,
                failure: None,
            }),
            Err(e) if e.is_per_run() => {
                warn!(
                    "sweep: dose {} focus {} failed: {}",
                    pipeline.tool().dose_mj_cm2,
                    pipeline.tool().focus_nm,
                    e
                );
                Ok(PointOutcome {
                    metrics: Metrics::unmeasured(),
                    failure: Some(e.to_string()),
                })
            }
            Err(e) => Err(e),
        }
    }
}
