//! Command implementations

use crate::builtin;
use crate::commands::{PlansArgs, RunArgs, ValidateArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use skirmish::{
    Engine, EngineOptions, EngineResult, LogAlerter, NullTarget, PlanBook, Registry, Report,
    WriterAlerter,
};
use std::path::Path;
use std::time::Duration;

/// Read a plan book from disk
pub fn load_book(path: &Path) -> CliResult<PlanBook> {
    if !path.is_file() {
        return Err(CliError::config(format!(
            "plan book not found: {}",
            path.display()
        )));
    }
    Ok(PlanBook::load(path)?)
}

fn seconds(flag: &str, value: f64) -> CliResult<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        CliError::invalid_argument(format!("{flag} must be a non-negative number of seconds"))
    })
}

/// Engine options for a `run` invocation; no `--plan` means every plan in
/// the book, in name order
pub fn build_options(args: &RunArgs, book: &PlanBook) -> CliResult<EngineOptions> {
    let plans: Vec<String> = if args.plans.is_empty() {
        book.plans.keys().cloned().collect()
    } else {
        args.plans.clone()
    };
    if plans.is_empty() {
        return Err(CliError::config("plan book has no plans"));
    }

    let mut builder = EngineOptions::builder()
        .plans(plans)
        .iterations(args.iterations)
        .sleep(seconds("--sleep", args.sleep)?)
        .continue_on_failure(args.continue_on_failure);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(url) = &args.url {
        builder = builder.url(url.clone());
    }
    if let Some(timeout) = args.hook_timeout {
        builder = builder.hook_timeout(seconds("--hook-timeout", timeout)?);
    }
    Ok(builder.build()?)
}

/// Built-in registry plus the book's plans and the stock alerters
#[must_use]
pub fn registry_for(book: PlanBook) -> Registry<NullTarget> {
    builtin::registry()
        .with_plan_book(book)
        .with_alerter("log", LogAlerter)
        .with_alerter("stderr", WriterAlerter::new(std::io::stderr()))
}

/// Run the engine, then fan the report out to the requested alerters.
///
/// The alert outcome is returned next to the run outcome so that a failing
/// alerter never hides how the run itself went.
async fn drive(
    engine: &mut Engine<NullTarget>,
    args: &RunArgs,
) -> (EngineResult<Report>, EngineResult<()>) {
    let stop = engine.stop_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping at the next slot");
            stop.stop();
        }
    });
    let outcome = engine.run().await;
    watcher.abort();

    let alerted = match args.alert {
        Some(level) => {
            let names: Vec<&str> = args.alerters.iter().map(String::as_str).collect();
            engine.alert(level.into(), &names).await
        }
        None => Ok(()),
    };
    if let Err(err) = &alerted {
        tracing::error!(error = %err, "alert dispatch failed");
    }
    (outcome, alerted)
}

/// `skirmish run`
pub fn run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let book = load_book(&args.book)?;
    let options = build_options(args, &book)?;
    let registry = registry_for(book);

    let printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut engine = Engine::new(options, registry, NullTarget::new());
    tracing::info!(seed = %engine.seed(), "starting run");
    let (outcome, alerted) = runtime.block_on(drive(&mut engine, args));

    if let Some(report) = engine.report() {
        printer.report(report, args.format)?;
    }
    if let Err(err) = &alerted {
        printer.failure(&format!("alert failed: {err}"));
    }
    let report = outcome?;
    if report.is_clean() {
        printer.success(&format!("run passed (seed {})", report.seed));
        alerted?;
        return Ok(());
    }
    let message = match &report.error {
        Some(err) if !report.success => err.message.clone(),
        _ => format!(
            "{} of {} slots failed",
            report.failed_count(),
            report.results.len()
        ),
    };
    printer.failure(&format!("{message} (replay with --seed {})", report.seed));
    Err(CliError::run_failed(message))
}

/// `skirmish plans`
pub fn plans(_config: &CliConfig, args: &PlansArgs) -> CliResult<()> {
    let book = load_book(&args.book)?;
    Printer::new(false, false).plans(&book, args.format)
}

/// `skirmish validate`
pub fn validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<()> {
    let book = load_book(&args.book)?;
    if book.plans.is_empty() {
        return Err(CliError::config("plan book has no plans"));
    }
    let names: Vec<String> = book.plans.keys().cloned().collect();
    let registry = registry_for(book);
    let printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());

    let mut invalid = 0usize;
    for name in &names {
        match registry.validate_plan(name) {
            Ok(()) => printer.success(name),
            Err(err) => {
                invalid += 1;
                printer.failure(&format!("{name}: {err}"));
            }
        }
    }
    if invalid > 0 {
        return Err(CliError::config(format!(
            "{invalid} of {} plans are invalid",
            names.len()
        )));
    }
    Ok(())
}
