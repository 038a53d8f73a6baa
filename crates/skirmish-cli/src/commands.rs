//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use skirmish::{AlertLevel, Iterations, Seed};
use std::path::PathBuf;

/// Skirmish: scenario-driven orchestration of actors against a live system
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run plans from a plan book
    Run(RunArgs),

    /// List the plans of a plan book
    Plans(PlansArgs),

    /// Validate a plan book against the built-in actors and actions
    Validate(ValidateArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Plan book (YAML or JSON)
    pub book: PathBuf,

    /// Plan to run, in order (repeatable; default: every plan in the book)
    #[arg(short, long = "plan")]
    pub plans: Vec<String>,

    /// Number of iterations, or "forever"
    #[arg(short = 'n', long, default_value = "1")]
    pub iterations: Iterations,

    /// Seconds to sleep between iterations
    #[arg(long, default_value = "0")]
    pub sleep: f64,

    /// Seed (integer, or any text hashed into one)
    #[arg(short, long)]
    pub seed: Option<Seed>,

    /// Record failing slots and keep going instead of aborting
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Upper bound in seconds for any single hook
    #[arg(long)]
    pub hook_timeout: Option<f64>,

    /// Endpoint of the system under test, passed to actor factories
    #[arg(long)]
    pub url: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Alert level to dispatch after the run
    #[arg(long)]
    pub alert: Option<AlertArg>,

    /// Alerter to notify (repeatable)
    #[arg(long = "alerter", default_value = "log")]
    pub alerters: Vec<String>,
}

/// Arguments for the plans command
#[derive(Parser, Debug)]
pub struct PlansArgs {
    /// Plan book (YAML or JSON)
    pub book: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Plan book (YAML or JSON)
    pub book: PathBuf,
}

/// Output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty JSON
    Json,
}

/// Alert level argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertArg {
    /// Always alert
    Info,
    /// Alert only on failure
    Error,
}

impl From<AlertArg> for AlertLevel {
    fn from(arg: AlertArg) -> Self {
        match arg {
            AlertArg::Info => Self::Info,
            AlertArg::Error => Self::Error,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
