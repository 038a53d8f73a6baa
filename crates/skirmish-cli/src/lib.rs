//! Skirmish CLI library
//!
//! Command-line front end for the Skirmish engine: loads plan books, runs
//! them against the built-in diagnostic actions and prints the report.

#![warn(missing_docs)]

pub mod builtin;
mod commands;
mod config;
mod error;
mod output;
pub mod runner;

pub use commands::{AlertArg, Cli, ColorArg, Commands, OutputFormat, PlansArgs, RunArgs, ValidateArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_plans, render_report, Printer};
