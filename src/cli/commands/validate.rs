//! `euvsim validate` command - check recipes against the schema and physics

use console::style;
use miette::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::GlobalOpts;
use crate::entities::Recipe;
use crate::schema::{SchemaKind, SchemaValidator};
use crate::yaml::{parse_document, parse_yaml};

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Recipe files or directories to validate
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Continue validation after first failing file
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let validator = SchemaValidator::new();
    let files = expand_paths(&args.paths);
    let verbose = !args.summary && !global.quiet;

    if files.is_empty() {
        return Err(miette::miette!("No recipe files found"));
    }

    if !global.quiet {
        println!(
            "{} Validating {} file(s)...\n",
            style("→").blue(),
            files.len()
        );
    }

    let mut stats = ValidationStats::default();
    for path in &files {
        stats.files_checked += 1;

        let errors = check_file(path, &validator, verbose);
        if errors == 0 {
            stats.files_passed += 1;
            if verbose {
                println!("{} {}", style("✓").green(), path.display());
            }
        } else {
            stats.files_failed += 1;
            stats.total_errors += errors;
            if !args.keep_going {
                break;
            }
        }
    }

    if !global.quiet {
        println!();
        println!("{}", style("─".repeat(60)).dim());
        println!("{}", style("Validation Summary").bold());
        println!("{}", style("─".repeat(60)).dim());
        println!("  Files checked:  {}", style(stats.files_checked).cyan());
        println!("  Files passed:   {}", style(stats.files_passed).green());
        println!("  Files failed:   {}", style(stats.files_failed).red());
        println!("  Total errors:   {}", style(stats.total_errors).red());
        println!();
    }

    if stats.files_failed > 0 {
        if stats.files_failed == 1 {
            Err(miette::miette!("Validation failed: 1 file has errors"))
        } else {
            Err(miette::miette!(
                "Validation failed: {} files have errors",
                stats.files_failed
            ))
        }
    } else {
        if !global.quiet {
            println!("{} All recipes passed validation!", style("✓").green().bold());
        }
        Ok(())
    }
}

/// Number of problems found in one file, printed as they are found
fn check_file(path: &Path, validator: &SchemaValidator, verbose: bool) -> usize {
    let fail_header = |count: usize| {
        if verbose {
            println!(
                "{} {} - {} error(s)",
                style("✗").red(),
                path.display(),
                count
            );
        }
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if verbose {
                println!("{} {} - {}", style("✗").red(), path.display(), e);
            }
            return 1;
        }
    };
    let filename = path.display().to_string();

    let document = match parse_document(&content, &filename) {
        Ok(doc) => doc,
        Err(e) => {
            fail_header(1);
            if verbose {
                println!("{:?}", miette::Report::new(e));
            }
            return 1;
        }
    };

    let issues = match validator.validate(SchemaKind::Recipe, &document) {
        Ok(issues) => issues,
        Err(e) => {
            fail_header(1);
            if verbose {
                println!("   {}", e);
            }
            return 1;
        }
    };
    if !issues.is_empty() {
        fail_header(issues.len());
        if verbose {
            for issue in &issues {
                println!("   {} {}", style("•").red(), issue);
            }
        }
        return issues.len();
    }

    // Schema-clean documents still have to deserialize and be physical
    let recipe: Recipe = match parse_yaml(&content, &filename) {
        Ok(r) => r,
        Err(e) => {
            fail_header(1);
            if verbose {
                println!("{:?}", miette::Report::new(e));
            }
            return 1;
        }
    };
    let problems = recipe.check();
    if !problems.is_empty() {
        fail_header(problems.len());
        if verbose {
            for problem in &problems {
                println!("   {} {}", style("•").red(), problem);
            }
        }
    }
    problems.len()
}

/// Expand paths - if a directory is given, find all recipe files in it
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if is_recipe_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            // Missing files are reported by check_file
            files.push(path.clone());
        }
    }

    files.sort();
    files
}

fn is_recipe_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}
