//! Alert fan-out over finished reports.
//!
//! Alerters are opaque sinks: the engine hands each one the alert level and
//! the report, and they decide whether to say anything.

use crate::report::Report;
use crate::result::HookResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Severity filter passed to alerters, like a log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Always report
    Info,
    /// Report only runs that had a failure
    Error,
}

impl AlertLevel {
    /// Default policy: `Info` always notifies, `Error` only when the report
    /// is not clean
    #[must_use]
    pub fn should_notify(self, report: &Report) -> bool {
        match self {
            Self::Info => true,
            Self::Error => !report.is_clean(),
        }
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown alert level: {other}")),
        }
    }
}

/// Receives finished reports
#[async_trait]
pub trait Alerter: Send + Sync {
    /// Deliver (or skip) an alert for `report`
    async fn alert(&self, level: AlertLevel, report: &Report) -> HookResult<()>;
}

/// Render a report as a fenced JSON block, the way chat alerts show it
pub fn format_report(report: &Report) -> serde_json::Result<String> {
    Ok(format!("```{}```", report.to_pretty_json()?))
}

/// Emits alerts as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
    async fn alert(&self, level: AlertLevel, report: &Report) -> HookResult<()> {
        if !level.should_notify(report) {
            tracing::info!(run_id = %report.run_id, "run succeeded; sending no alert");
            return Ok(());
        }
        let message = format_report(report)?;
        if report.is_clean() {
            tracing::info!(run_id = %report.run_id, seed = %report.seed, "{message}");
        } else {
            tracing::error!(run_id = %report.run_id, seed = %report.seed, "{message}");
        }
        Ok(())
    }
}

/// Writes the formatted report to any writer (stderr, a file, a buffer)
#[derive(Debug, Clone)]
pub struct WriterAlerter<W> {
    sink: Arc<Mutex<W>>,
}

impl<W: Write + Send> WriterAlerter<W> {
    /// Wrap a writer
    pub fn new(sink: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Shared handle to the writer
    #[must_use]
    pub fn sink(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.sink)
    }
}

#[async_trait]
impl<W: Write + Send + 'static> Alerter for WriterAlerter<W> {
    async fn alert(&self, level: AlertLevel, report: &Report) -> HookResult<()> {
        if !level.should_notify(report) {
            return Ok(());
        }
        let message = format_report(report)?;
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| "alert sink lock poisoned")?;
        writeln!(sink, "{message}")?;
        sink.flush()?;
        Ok(())
    }
}
