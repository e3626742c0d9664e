//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    completions::CompletionsArgs, init::InitArgs, run::RunArgs, sweep::SweepArgs,
    validate::ValidateArgs,
};

/// euvsim - stochastic EUV exposure simulator
#[derive(Parser, Debug)]
#[command(name = "euvsim", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "auto", env = "EUVSIM_OUTPUT")]
    pub output: OutputFormat,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalOpts {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable for single runs, table for sweeps
    Auto,
    Yaml,
    Json,
    /// Styled text
    Text,
    Table,
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a commented starter recipe
    Init(InitArgs),

    /// Check recipes against the schema and physical limits
    Validate(ValidateArgs),

    /// Simulate one exposure and report CD, LER and defects
    Run(RunArgs),

    /// Sweep dose and focus and report the process window
    Sweep(SweepArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
