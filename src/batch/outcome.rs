//! Per-unit outcomes and the aggregate run report

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use thiserror::Error;

use crate::core::error::Error;
use crate::terrain::{TerrainError, UnitId};

/// Failure raised by a mutation delegate for one unit
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UnitError {
    message: String,
    backtrace: String,
}

impl UnitError {
    /// Captures a backtrace when `RUST_BACKTRACE` enables it
    pub fn new(message: impl Into<String>) -> Self {
        let backtrace = Backtrace::capture();
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => backtrace.to_string(),
            _ => String::new(),
        };
        Self {
            message: message.into(),
            backtrace,
        }
    }

    pub(crate) fn with_backtrace(message: impl Into<String>, backtrace: String) -> Self {
        Self {
            message: message.into(),
            backtrace,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }
}

impl From<TerrainError> for UnitError {
    fn from(e: TerrainError) -> Self {
        UnitError::new(e.to_string())
    }
}

impl From<Error> for UnitError {
    fn from(e: Error) -> Self {
        UnitError::new(e.to_string())
    }
}

/// Diagnostics for one failed unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: UnitId,
    pub message: String,
    pub backtrace: String,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit {}: {}", self.unit, self.message)
    }
}

/// Outcome of one slot in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Success,
    /// Empty entry in an explicit list
    SkippedNull,
    Failed(UnitFailure),
}

/// One processed slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    /// Position in the planned sequence
    pub slot: usize,
    pub unit: Option<UnitId>,
    pub outcome: UnitOutcome,
}

/// Aggregate result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every processed slot succeeded
    Success,
    /// At least one slot failed or was skipped
    PartialFailure { failed: Vec<UnitId>, skipped: usize },
    /// Stopped early on request
    Cancelled { processed: usize },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled { .. })
    }
}

/// Everything a run did, in processing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub label: String,
    pub records: Vec<UnitRecord>,
    pub cancelled: bool,
    /// Slots planned before the run started
    pub planned: usize,
}

impl RunReport {
    pub fn new(label: impl Into<String>, planned: usize) -> Self {
        Self {
            label: label.into(),
            records: Vec::new(),
            cancelled: false,
            planned,
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.cancelled {
            return RunOutcome::Cancelled { processed: self.records.len() };
        }
        let failed: Vec<UnitId> = self.failures().map(|f| f.unit).collect();
        let skipped = self.skipped();
        if failed.is_empty() && skipped == 0 {
            RunOutcome::Success
        } else {
            RunOutcome::PartialFailure { failed, skipped }
        }
    }

    /// Slots that produced an outcome
    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.outcome == UnitOutcome::Success).count()
    }

    pub fn skipped(&self) -> usize {
        self.records.iter().filter(|r| r.outcome == UnitOutcome::SkippedNull).count()
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitFailure> {
        self.records.iter().filter_map(|r| match &r.outcome {
            UnitOutcome::Failed(f) => Some(f),
            _ => None,
        })
    }

    /// Units that succeeded, in processing order
    pub fn succeeded_units(&self) -> Vec<UnitId> {
        self.records
            .iter()
            .filter(|r| r.outcome == UnitOutcome::Success)
            .filter_map(|r| r.unit)
            .collect()
    }

    /// One-line summary for display
    pub fn summary(&self) -> String {
        let state = match self.outcome() {
            RunOutcome::Success => "completed",
            RunOutcome::PartialFailure { .. } => "completed with failures",
            RunOutcome::Cancelled { .. } => "cancelled",
        };
        format!(
            "{} {}: {} attempted, {} succeeded, {} failed, {} skipped",
            self.label,
            state,
            self.attempted(),
            self.succeeded(),
            self.failed(),
            self.skipped()
        )
    }
}
