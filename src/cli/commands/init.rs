//! `euvsim init` command - write a starter recipe

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::entities::{ResistKind, ToolParameters};
use crate::schema::template::{RecipeTemplate, TemplateGenerator};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Recipe file to create
    #[arg(default_value = "recipe.yaml")]
    pub path: PathBuf,

    /// Recipe name (defaults to the file stem)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Resist preset: car, meox or mcs
    #[arg(long, short = 'r', default_value = "car")]
    pub resist: ResistKind,

    /// Use the high-NA (0.55) scanner
    #[arg(long)]
    pub high_na: bool,

    /// Line width in pixels
    #[arg(long, default_value_t = 16)]
    pub line_px: usize,

    /// Line pitch in pixels
    #[arg(long, default_value_t = 32)]
    pub pitch_px: usize,

    /// Mask height and width in pixels
    #[arg(long, default_value_t = 256)]
    pub size_px: usize,

    /// Pixel size (nm)
    #[arg(long, default_value_t = 1.0)]
    pub pixel_size_nm: f64,

    /// Base random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Overwrite an existing file
    #[arg(long, short = 'f')]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    if args.path.exists() && !args.force {
        return Err(miette::miette!(
            help = "Pass --force to overwrite it",
            "{} already exists",
            args.path.display()
        ));
    }

    let name = args.name.clone().unwrap_or_else(|| {
        args.path
            .file_stem()
            .map(|s| s.to_string_lossy().trim_end_matches(".recipe").to_string())
            .unwrap_or_else(|| "recipe".to_string())
    });
    let file_name = args
        .path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "recipe.yaml".to_string());
    let tool = if args.high_na {
        ToolParameters::high_na()
    } else {
        ToolParameters::low_na()
    };

    let generator = TemplateGenerator::new()?;
    let ctx = RecipeTemplate::new(&name)
        .with_file_name(file_name)
        .with_tool(tool)
        .with_resist(args.resist)
        .with_pattern(args.line_px, args.pitch_px)
        .with_size(args.size_px, args.size_px)
        .with_pixel_size(args.pixel_size_nm)
        .with_seed(args.seed);
    let yaml_content = generator.generate_recipe(&ctx)?;

    if let Some(parent) = args.path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }
    }
    fs::write(&args.path, &yaml_content).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Created recipe {}",
            style("✓").green(),
            style(&name).cyan()
        );
        println!("   {}", style(args.path.display()).dim());
        println!(
            "   {} {} resist, NA {}",
            style("→").dim(),
            style(args.resist).yellow(),
            tool.numerical_aperture
        );
    }

    Ok(())
}
