//! Applies a mutation to every unit a provider yields

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use crate::core::config::BatchConfig;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::progress::{ProgressGuard, ProgressReporter};
use crate::provider::{OperationTarget, SequenceEntry, TerrainUnitProvider};
use crate::terrain::{TerrainUnit, UnitId};

use super::outcome::{RunReport, UnitError, UnitFailure, UnitOutcome, UnitRecord};

/// Per-run options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Operation name used in progress messages and the report
    pub label: String,
    pub allow_cancel: bool,
    /// Whether this run needed user confirmation first
    pub requires_confirmation: bool,
    /// Set by the caller once the user has confirmed
    pub confirmed: bool,
}

impl RunOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            allow_cancel: true,
            requires_confirmation: false,
            confirmed: false,
        }
    }

    /// Mark the run as needing confirmation, and whether it was given
    pub fn confirmation(mut self, confirmed: bool) -> Self {
        self.requires_confirmation = true;
        self.confirmed = confirmed;
        self
    }

    pub fn with_cancel(mut self, allow_cancel: bool) -> Self {
        self.allow_cancel = allow_cancel;
        self
    }
}

/// Runs one mutation across a provider's units.
///
/// Strictly sequential: each unit is loaded, mutated, and released before
/// the next one is touched. Failures (returned errors and panics) are
/// recorded against their unit and never stop the run. Cancellation is
/// polled between units only.
#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    config: BatchConfig,
}

impl BatchExecutor {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Apply `mutate` to every unit `target` selects.
    ///
    /// Errors only for run-level problems: a missing confirmation, an
    /// invalid target, or a provider that cannot produce even the first
    /// unit. Everything else lands in the report.
    pub fn run<F>(
        &self,
        provider: &mut dyn TerrainUnitProvider,
        target: &OperationTarget,
        options: &RunOptions,
        reporter: &mut dyn ProgressReporter,
        mut mutate: F,
    ) -> Result<RunReport>
    where
        F: FnMut(&mut TerrainUnit) -> std::result::Result<(), UnitError>,
    {
        if options.requires_confirmation && !options.confirmed {
            return Err(Error::precondition(format!("'{}' was not confirmed", options.label)));
        }

        let sequence = provider.units(target).map_err(|e| match e {
            Error::Precondition(_) => e,
            other => Error::RunFailure(other.to_string()),
        })?;
        let total = sequence.total_hint();
        let mut report = RunReport::new(&options.label, sequence.len());

        log::info!(
            "{}: starting over {} planned units{}",
            options.label,
            sequence.len(),
            if provider.has_streaming_units() { " (streaming)" } else { "" }
        );

        let mut progress = ProgressGuard::new(
            reporter,
            &self.config.progress_key,
            &self.config.progress_title,
            options.allow_cancel,
        );
        let mut first_load = true;

        for (slot, entry) in sequence.entries().iter().enumerate() {
            if progress.is_cancel_requested() {
                log::info!("{}: cancelled after {} units", options.label, report.attempted());
                report.cancelled = true;
                break;
            }

            let id = match *entry {
                SequenceEntry::Unit(id) => id,
                SequenceEntry::Null => {
                    progress.show(format!("{}: empty entry", options.label), slot, total);
                    log::warn!("{}: skipping empty entry at slot {}", options.label, slot);
                    report.records.push(UnitRecord { slot, unit: None, outcome: UnitOutcome::SkippedNull });
                    continue;
                }
            };

            let unit = match provider.load(id) {
                Ok(unit) => unit,
                Err(e) if first_load => {
                    log::error!("{}: provider could not start: {}", options.label, e);
                    return Err(Error::RunFailure(e.to_string()));
                }
                Err(e) => {
                    progress.show(format!("{}: unit {}", options.label, id), slot, total);
                    let failure = self.fail(&options.label, id, UnitError::new(e.to_string()));
                    report.records.push(UnitRecord { slot, unit: Some(id), outcome: failure });
                    continue;
                }
            };
            first_load = false;

            if sequence.active_only() && !unit.active {
                log::debug!("{}: unit {} is inactive, skipping", options.label, id);
                self.release(provider, &options.label, id);
                continue;
            }

            progress.show(format!("{}: {}", options.label, unit.name), slot, total);

            let mut outcome = match invoke(&mut mutate, unit, self.config.log_backtraces) {
                Ok(()) => UnitOutcome::Success,
                Err(e) => self.fail(&options.label, id, e),
            };

            if let Some(e) = self.release(provider, &options.label, id) {
                if outcome == UnitOutcome::Success {
                    outcome = self.fail(&options.label, id, UnitError::new(format!("release failed: {}", e)));
                }
            }

            report.records.push(UnitRecord { slot, unit: Some(id), outcome });
        }

        // A request made while the last unit was in flight still counts
        if !report.cancelled && progress.is_cancel_requested() {
            log::info!("{}: cancelled during the last unit", options.label);
            report.cancelled = true;
        }

        drop(progress);
        log::info!("{}", report.summary());
        Ok(report)
    }

    fn fail(&self, label: &str, id: UnitId, error: UnitError) -> UnitOutcome {
        if self.config.log_backtraces && !error.backtrace().is_empty() {
            log::error!("{}: unit {} failed: {}\n{}", label, id, error.message(), error.backtrace());
        } else {
            log::error!("{}: unit {} failed: {}", label, id, error.message());
        }
        UnitOutcome::Failed(UnitFailure {
            unit: id,
            message: error.message().to_string(),
            backtrace: error.backtrace().to_string(),
        })
    }

    fn release(&self, provider: &mut dyn TerrainUnitProvider, label: &str, id: UnitId) -> Option<Error> {
        match provider.release_if_transient(id) {
            Ok(()) => None,
            Err(e) => {
                log::error!("{}: releasing unit {} failed: {}", label, id, e);
                Some(e)
            }
        }
    }
}

/// Call the delegate inside a fault boundary that also catches panics.
fn invoke<F>(mutate: &mut F, unit: &mut TerrainUnit, force_backtrace: bool) -> std::result::Result<(), UnitError>
where
    F: FnMut(&mut TerrainUnit) -> std::result::Result<(), UnitError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| mutate(unit))) {
        Ok(result) => result,
        Err(payload) => {
            let backtrace = if force_backtrace {
                Backtrace::force_capture().to_string()
            } else {
                String::new()
            };
            Err(UnitError::with_backtrace(
                format!("panicked: {}", panic_message(payload.as_ref())),
                backtrace,
            ))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
