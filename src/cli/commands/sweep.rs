//! `euvsim sweep` command - dose × focus process window

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::helpers::{format_nm, format_signed_nm, parse_range, truncate_str};
use crate::cli::output::effective_format;
use crate::cli::viz;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{ProcessWindowResult, SweepControl};
use crate::yaml::load_recipe;

#[derive(clap::Args, Debug)]
pub struct SweepArgs {
    /// Recipe file (YAML or JSON)
    pub recipe: PathBuf,

    /// Dose range START,END in mJ/cm²
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    pub dose_range: Option<(f64, f64)>,

    /// Focus range START,END in nm
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    pub focus_range: Option<(f64, f64)>,

    /// Points per axis
    #[arg(long, short = 'n')]
    pub resolution: Option<usize>,

    /// Override the recipe seed
    #[arg(long, short = 's')]
    pub seed: Option<u64>,

    /// Fixed number of worker threads
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Stop starting new grid points after this many seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Also write every grid point to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Draw the pass/fail map
    #[arg(long)]
    pub map: bool,
}

#[derive(Tabled)]
struct GridRow {
    #[tabled(rename = "DOSE")]
    dose: String,
    #[tabled(rename = "FOCUS")]
    focus: String,
    #[tabled(rename = "CD ERR")]
    cd_error: String,
    #[tabled(rename = "LER")]
    ler: String,
    #[tabled(rename = "DEFECTS/µm²")]
    defects: String,
    #[tabled(rename = "RESULT")]
    result: String,
}

#[derive(Debug, Serialize)]
struct SweepOutput<'a> {
    recipe: &'a str,
    generated: String,
    exposure_latitude_percent: f64,
    depth_of_focus_nm: f64,
    #[serde(flatten)]
    result: &'a ProcessWindowResult,
}

pub fn run(args: SweepArgs, global: &GlobalOpts) -> Result<()> {
    let mut recipe = load_recipe(&args.recipe)?;
    if let Some(seed) = args.seed {
        recipe.seed = seed;
    }
    let dose_range = args
        .dose_range
        .unwrap_or((recipe.sweep.dose_range[0], recipe.sweep.dose_range[1]));
    let focus_range = args
        .focus_range
        .unwrap_or((recipe.sweep.focus_range[0], recipe.sweep.focus_range[1]));
    let resolution = args.resolution.unwrap_or(recipe.sweep.grid_resolution);

    let mut control = SweepControl::default();
    if let Some(workers) = args.workers {
        control = control.with_workers(workers);
    }
    if let Some(seconds) = args.timeout {
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(miette::miette!("--timeout must be a non-negative number of seconds"));
        }
        control = control.with_deadline(Instant::now() + Duration::from_secs_f64(seconds));
    }

    let mask = recipe.mask.build()?;
    let result = recipe.sweeper(control).sweep(
        &mask,
        dose_range,
        focus_range,
        resolution,
        recipe.target_cd_nm,
        &recipe.thresholds,
    )?;

    if let Some(ref path) = args.csv {
        let file = std::fs::File::create(path).into_diagnostic()?;
        write_csv(&result, file)?;
        if !global.quiet {
            eprintln!(
                "{} Wrote {} grid point(s) to {}",
                style("✓").green(),
                result.len(),
                style(path.display()).cyan()
            );
        }
    }

    match effective_format(global.output, true) {
        OutputFormat::Json => {
            let output = sweep_output(&recipe.name, &result);
            println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            let output = sweep_output(&recipe.name, &result);
            print!("{}", serde_yml::to_string(&output).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            write_csv(&result, std::io::stdout())?;
        }
        OutputFormat::Auto | OutputFormat::Table | OutputFormat::Text => {
            print_table(&result);
            print_summary(&recipe.name, &args.recipe, &result);
        }
    }

    if args.map {
        println!();
        println!("{}", viz::render_window_map(&result));
    }

    Ok(())
}

fn sweep_output<'a>(name: &'a str, result: &'a ProcessWindowResult) -> SweepOutput<'a> {
    SweepOutput {
        recipe: name,
        generated: Utc::now().to_rfc3339(),
        exposure_latitude_percent: result.exposure_latitude_percent(),
        depth_of_focus_nm: result.depth_of_focus_nm(),
        result,
    }
}

/// One row per grid point: dose, focus, cd_error, ler, defects, pass
fn write_csv<W: std::io::Write>(result: &ProcessWindowResult, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for point in result.points() {
        wtr.serialize(point).into_diagnostic()?;
    }
    wtr.flush().into_diagnostic()?;
    Ok(())
}

fn print_table(result: &ProcessWindowResult) {
    let rows: Vec<GridRow> = (0..result.len())
        .map(|k| GridRow {
            dose: format!("{:.2}", result.dose[k]),
            focus: format!("{:+.1}", result.focus[k]),
            cd_error: format_signed_nm(result.cd_error[k], 2),
            ler: format_nm(result.ler[k], 3),
            defects: format_nm(result.defects_per_um2[k], 1),
            result: match (&result.failure[k], result.passed[k]) {
                (Some(reason), _) => truncate_str(reason, 24),
                (None, true) => "pass".to_string(),
                (None, false) => "fail".to_string(),
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn print_summary(name: &str, path: &Path, result: &ProcessWindowResult) {
    let title = if name.is_empty() {
        path.display().to_string()
    } else {
        name.to_string()
    };

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("Process window").bold(), style(title).cyan());
    println!("{}", style("─".repeat(60)).dim());

    let window = style(format!("{:.1}%", result.process_window_size));
    let window = if result.process_window_size > 0.0 {
        window.green()
    } else {
        window.red()
    };
    println!(
        "  Window:            {} ({} of {} point(s) pass)",
        window,
        result.passing(),
        result.len()
    );
    println!(
        "  Exposure latitude: {:.1}%",
        result.exposure_latitude_percent()
    );
    println!("  Depth of focus:    {:.1} nm", result.depth_of_focus_nm());

    let limit = result.thresholds.cd_limit_nm(result.target_cd_nm);
    let finite: Vec<f64> = result.cd_error.iter().copied().filter(|v| v.is_finite()).collect();
    if !finite.is_empty() {
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!();
        println!("{}", style("CD error across the grid (nm):").bold());
        println!("{}", viz::render_range_bar(min, max, -limit, limit));
    }

    if result.cancelled {
        println!();
        println!(
            "{} Sweep stopped early; {} point(s) evaluated",
            style("!").yellow(),
            result.len()
        );
    }
}
