//! Output formatting

use crate::commands::OutputFormat;
use crate::error::CliResult;
use console::{style, Term};
use skirmish::{PlanBook, Report};
use std::fmt::Write as _;

/// Writes results to stdout and diagnostics to stderr
#[derive(Debug)]
pub struct Printer {
    out: Term,
    err: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Printer {
    /// Create a new printer
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print a finished report
    pub fn report(&self, report: &Report, format: OutputFormat) -> CliResult<()> {
        let text = match format {
            OutputFormat::Json => report
                .to_pretty_json()
                .map_err(skirmish::EngineError::from)?,
            OutputFormat::Text => render_report(report, self.use_color),
        };
        self.out.write_line(text.trim_end())?;
        Ok(())
    }

    /// Print the plans of a book
    pub fn plans(&self, book: &PlanBook, format: OutputFormat) -> CliResult<()> {
        let text = match format {
            OutputFormat::Json => serde_json::to_string_pretty(book).map_err(skirmish::EngineError::from)?,
            OutputFormat::Text => render_plans(book),
        };
        self.out.write_line(text.trim_end())?;
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }
}

/// Text rendering of a report with a styled status line
#[must_use]
pub fn render_report(report: &Report, use_color: bool) -> String {
    let body = report.to_string();
    if !use_color {
        return body;
    }
    let mut lines = body.lines();
    let mut out = String::new();
    if let Some(head) = lines.next() {
        let head = if report.is_clean() {
            style(head).green().bold()
        } else if report.success {
            style(head).yellow().bold()
        } else {
            style(head).red().bold()
        };
        let _ = writeln!(out, "{head}");
    }
    for line in lines {
        if line.contains(": FAILED ") || line.trim_start().starts_with("aborted at") {
            let _ = writeln!(out, "{}", style(line).red());
        } else {
            let _ = writeln!(out, "{line}");
        }
    }
    out
}

/// One line per plan: name, mode, actor count, slot count
#[must_use]
pub fn render_plans(book: &PlanBook) -> String {
    let mut out = String::new();
    for (name, plan) in &book.plans {
        let _ = writeln!(
            out,
            "{name}  mode={:?}  actors={}  slots={}",
            plan.mode,
            plan.actors.len(),
            plan.actions.len()
        );
    }
    out
}
