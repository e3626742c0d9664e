//! `euvsim run` command - one stochastic exposure

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::helpers::{format_nm, format_signed_nm};
use crate::cli::output::effective_format;
use crate::cli::viz;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Field, PhotonStatistics, RunReport};
use crate::yaml::load_recipe;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Recipe file (YAML or JSON)
    pub recipe: PathBuf,

    /// Override the recipe dose (mJ/cm²)
    #[arg(long, short = 'd')]
    pub dose: Option<f64>,

    /// Override the recipe focus offset (nm)
    #[arg(long, short = 'f', allow_hyphen_values = true)]
    pub focus: Option<f64>,

    /// Override the numerical aperture
    #[arg(long)]
    pub na: Option<f64>,

    /// Override the recipe seed
    #[arg(long, short = 's')]
    pub seed: Option<u64>,

    /// Include photon shot-noise statistics
    #[arg(long)]
    pub stats: bool,

    /// Plot the latent-image cross-section
    #[arg(long)]
    pub plot: bool,
}

/// Machine-readable run output
#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    recipe: &'a str,
    generated: String,
    #[serde(flatten)]
    report: &'a RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    photon_statistics: Option<PhotonStatistics>,
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let mut recipe = load_recipe(&args.recipe)?;
    if let Some(dose) = args.dose {
        recipe.tool.dose_mj_cm2 = dose;
    }
    if let Some(focus) = args.focus {
        recipe.tool.focus_nm = focus;
    }
    if let Some(na) = args.na {
        recipe.tool.numerical_aperture = na;
    }
    let seed = args.seed.unwrap_or(recipe.seed);

    let pipeline = recipe.pipeline()?;
    let mask = recipe.mask.build()?;
    let trace = pipeline.trace(&mask, recipe.target_cd_nm, seed)?;
    let metrics = trace.metrics.clone()?;

    let report = RunReport {
        seed,
        dose_mj_cm2: recipe.tool.dose_mj_cm2,
        focus_nm: recipe.tool.focus_nm,
        target_cd_nm: recipe.target_cd_nm,
        metrics,
    };
    let stats = args.stats.then(|| pipeline.photon_statistics(&mask));

    match effective_format(global.output, false) {
        OutputFormat::Json => {
            let output = RunOutput {
                recipe: &recipe.name,
                generated: Utc::now().to_rfc3339(),
                report: &report,
                photon_statistics: stats,
            };
            println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            let output = RunOutput {
                recipe: &recipe.name,
                generated: Utc::now().to_rfc3339(),
                report: &report,
                photon_statistics: stats,
            };
            print!("{}", serde_yml::to_string(&output).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            let m = &report.metrics;
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(["dose", "focus", "seed", "cd", "cd_error", "ler", "lwr", "defects"])
                .into_diagnostic()?;
            wtr.write_record([
                report.dose_mj_cm2.to_string(),
                report.focus_nm.to_string(),
                report.seed.to_string(),
                m.cd_nm.to_string(),
                m.cd_error_nm.to_string(),
                m.ler_nm.to_string(),
                m.lwr_nm.to_string(),
                m.stochastic_defects_per_um2.to_string(),
            ])
            .into_diagnostic()?;
            wtr.flush().into_diagnostic()?;
        }
        OutputFormat::Auto | OutputFormat::Text | OutputFormat::Table => {
            print_report(&recipe.name, &report, stats.as_ref());
        }
    }

    if args.plot {
        println!();
        println!(
            "{}",
            viz::render_profile(
                "Latent image cross-section (acid/nm², mean over rows):",
                &trace.latent.mean_profile(),
                trace.contour.threshold,
                viz::PROFILE_WIDTH,
                viz::PROFILE_HEIGHT,
            )
        );
    }

    Ok(())
}

fn print_report(name: &str, report: &RunReport, stats: Option<&PhotonStatistics>) {
    let m = &report.metrics;
    let title = if name.is_empty() { "exposure" } else { name };

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {}   {}: {} mJ/cm²   {}: {:+} nm   {}: {}",
        style("Recipe").bold(),
        style(title).cyan(),
        style("Dose").bold(),
        report.dose_mj_cm2,
        style("Focus").bold(),
        report.focus_nm,
        style("Seed").bold(),
        report.seed
    );
    println!("{}", style("─".repeat(60)).dim());
    println!(
        "  CD:        {} nm (target {} nm, error {} nm)",
        style(format_nm(m.cd_nm, 2)).yellow(),
        report.target_cd_nm,
        format_signed_nm(m.cd_error_nm, 2)
    );
    println!(
        "  LER (3σ):  {} nm (left {} / right {})",
        style(format_nm(m.ler_nm, 3)).yellow(),
        format_nm(m.ler_left_nm, 3),
        format_nm(m.ler_right_nm, 3)
    );
    println!("  LWR (3σ):  {} nm", format_nm(m.lwr_nm, 3));

    let defects = style(format!(
        "{:.1} /µm² ({} pinch, {} bridge)",
        m.stochastic_defects_per_um2, m.pinch_count, m.bridge_count
    ));
    let defects = if m.defect_count == 0 {
        defects.green()
    } else {
        defects.red()
    };
    println!("  Defects:   {}", defects);
    println!(
        "  Measured:  {} edge pair(s) over {} row(s)",
        m.measured_edges, m.measured_rows
    );

    if let Some(s) = stats {
        println!();
        println!("{}", style("Photon statistics").bold());
        println!("  Photon energy:   {:.2} eV", s.photon_energy_ev);
        println!("  Photons/nm²:     {:.2}", s.photons_per_nm2);
        println!("  Exposed area:    {:.4} µm²", s.area_um2);
        println!("  Total photons:   {:.3e}", s.total_photons);
        println!("  Shot noise:      {:.3e} ({:.4}%)", s.shot_noise, s.relative_shot_noise * 100.0);
    }
}
