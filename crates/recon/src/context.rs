//! Run-scoped state handed to every pipeline phase.

use chrono::{Datelike, NaiveDate};

use crate::config::Settings;
use crate::error::ReconError;

/// Receiver for operator-facing notifications. Drivers (CLI, GUI, service)
/// implement this to render progress; the engine never blocks on it.
pub trait RunSink {
    /// Phase-level message ("1. preprocessing general ledger", ...).
    fn notify(&mut self, _message: &str) {}

    /// Percentage of invoice rows processed, 0.0..=100.0.
    fn progress(&mut self, _percent: f64) {}
}

/// Sink used when running headless.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl RunSink for NoopSink {}

/// Inclusive invoice-date bounds requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Resolve optional bounds into a range.
    ///
    /// Only `begin` given: the range ends `today`. Only `end` given: the
    /// range starts on the first day of `end`'s month. `begin` after `end`
    /// is rejected.
    pub fn resolve(
        begin: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Option<Self>, ReconError> {
        let (begin, end) = match (begin, end) {
            (None, None) => return Ok(None),
            (Some(b), Some(e)) => (b, e),
            (Some(b), None) => (b, today),
            (None, Some(e)) => (e.with_day(1).unwrap_or(e), e),
        };
        if begin > end {
            return Err(ReconError::ConfigValidation(format!(
                "begin date {} is after end date {}",
                begin.format("%Y/%m/%d"),
                end.format("%Y/%m/%d")
            )));
        }
        Ok(Some(Self { begin, end }))
    }
}

pub struct RunContext<'a> {
    pub settings: &'a Settings,
    /// Requested invoice-date bounds. Not applied to row selection.
    pub date_range: Option<DateRange>,
    sink: &'a mut dyn RunSink,
}

impl<'a> RunContext<'a> {
    pub fn new(settings: &'a Settings, sink: &'a mut dyn RunSink) -> Self {
        Self {
            settings,
            date_range: None,
            sink,
        }
    }

    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }

    pub fn notify(&mut self, message: &str) {
        tracing::info!("{message}");
        self.sink.notify(message);
    }

    pub fn progress(&mut self, percent: f64) {
        self.sink.progress(percent.clamp(0.0, 100.0));
    }
}
