//! Skirmish CLI: run scenario plan books
//!
//! ## Usage
//!
//! ```bash
//! skirmish run plans.yaml                       # Run every plan once
//! skirmish run plans.yaml -p smoke -n 10        # Ten iterations of one plan
//! skirmish run plans.yaml --seed 42 -f json     # Replay a seed, JSON report
//! skirmish plans plans.yaml                     # List plans
//! skirmish validate plans.yaml                  # Check names against the registry
//! ```

use clap::Parser;
use skirmish_cli::{runner, Cli, CliConfig, CliResult, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into());
    config.init_logging();

    match cli.command {
        Commands::Run(args) => runner::run(&config, &args),
        Commands::Plans(args) => runner::plans(&config, &args),
        Commands::Validate(args) => runner::validate(&config, &args),
    }
}
