use clap::Parser;
use miette::Result;
use euvsim::cli::logging::ConsoleLogger;
use euvsim::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    ConsoleLogger::install(cli.global.log_level());

    let global = &cli.global;
    match cli.command {
        Commands::Init(args) => commands::init::run(args, global),
        Commands::Validate(args) => commands::validate::run(args, global),
        Commands::Run(args) => commands::run::run(args, global),
        Commands::Sweep(args) => commands::sweep::run(args, global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
