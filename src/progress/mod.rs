//! Progress reporting for batch runs
//!
//! Reporting is best-effort: a reporter that fails never aborts a run.
//! Reports with the same key update one slot instead of stacking, and
//! every run clears its slot exactly once through [`ProgressGuard`].

pub mod board;
pub mod logged;

pub use board::{CancelHandle, ProgressBoard, ProgressSlot};
pub use logged::LogProgress;

use thiserror::Error;

/// Reporter failures. Swallowed by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("Progress display unavailable")]
    Unavailable,

    #[error("No progress slot for key '{0}'")]
    UnknownKey(String),
}

/// One progress report
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Slot key; reports with the same key replace each other
    pub key: String,
    pub title: String,
    pub message: String,
    /// Zero-based index of the unit being processed
    pub current: usize,
    /// Total units, when known cheaply
    pub total: Option<usize>,
    pub allow_cancel: bool,
}

impl ProgressUpdate {
    /// Completed fraction in [0, 1], or None when the total is unknown
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.current as f32 / total as f32).min(1.0)),
            None => None,
        }
    }
}

/// Observer of batch progress.
///
/// Implementations must return promptly; runs are single-threaded and
/// report on every unit.
pub trait ProgressReporter {
    /// Record or display progress for `update.key`
    fn show(&mut self, update: &ProgressUpdate) -> Result<(), ProgressError>;

    /// Remove the slot for `key`
    fn clear(&mut self, key: &str) -> Result<(), ProgressError>;

    /// Polled between units
    fn is_cancel_requested(&self, key: &str) -> bool;
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn show(&mut self, _update: &ProgressUpdate) -> Result<(), ProgressError> {
        Ok(())
    }

    fn clear(&mut self, _key: &str) -> Result<(), ProgressError> {
        Ok(())
    }

    fn is_cancel_requested(&self, _key: &str) -> bool {
        false
    }
}

/// Scoped progress slot. Clears the slot exactly once when dropped,
/// including on early returns and unwinding.
pub struct ProgressGuard<'a> {
    reporter: &'a mut dyn ProgressReporter,
    key: String,
    title: String,
    allow_cancel: bool,
}

impl<'a> ProgressGuard<'a> {
    pub fn new(
        reporter: &'a mut dyn ProgressReporter,
        key: impl Into<String>,
        title: impl Into<String>,
        allow_cancel: bool,
    ) -> Self {
        Self {
            reporter,
            key: key.into(),
            title: title.into(),
            allow_cancel,
        }
    }

    /// Report progress; failures are logged and swallowed
    pub fn show(&mut self, message: impl Into<String>, current: usize, total: Option<usize>) {
        let update = ProgressUpdate {
            key: self.key.clone(),
            title: self.title.clone(),
            message: message.into(),
            current,
            total,
            allow_cancel: self.allow_cancel,
        };
        if let Err(e) = self.reporter.show(&update) {
            log::debug!("Progress report for '{}' failed: {}", self.key, e);
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.allow_cancel && self.reporter.is_cancel_requested(&self.key)
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.reporter.clear(&self.key) {
            log::debug!("Clearing progress '{}' failed: {}", self.key, e);
        }
    }
}
