//! Progress reporter backed by the `log` facade

use super::board::CancelHandle;
use super::{ProgressError, ProgressReporter, ProgressUpdate};

/// Writes progress to the log at `info`.
///
/// Logs at most once per `step_percent` of progress so long runs stay
/// readable; runs with an unknown total log every report at `debug`.
#[derive(Debug, Clone)]
pub struct LogProgress {
    step_percent: u32,
    last_percent: Option<u32>,
    cancel: CancelHandle,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(10)
    }
}

impl LogProgress {
    pub fn new(step_percent: u32) -> Self {
        Self {
            step_percent: step_percent.clamp(1, 100),
            last_percent: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Use an external flag for cancellation (e.g. a signal handler)
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl ProgressReporter for LogProgress {
    fn show(&mut self, update: &ProgressUpdate) -> Result<(), ProgressError> {
        match (update.total, update.fraction()) {
            (Some(total), Some(fraction)) => {
                let percent = (fraction * 100.0) as u32;
                let bucket = percent / self.step_percent;
                if self.last_percent != Some(bucket) {
                    self.last_percent = Some(bucket);
                    log::info!(
                        "[{}] {} ({}/{}, {}%)",
                        update.title, update.message, update.current + 1, total, percent
                    );
                }
            }
            _ => {
                log::debug!("[{}] {} ({})", update.title, update.message, update.current + 1);
            }
        }
        Ok(())
    }

    fn clear(&mut self, _key: &str) -> Result<(), ProgressError> {
        self.last_percent = None;
        Ok(())
    }

    fn is_cancel_requested(&self, _key: &str) -> bool {
        self.cancel.is_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_cancel() {
        let cancel = CancelHandle::new();
        let reporter = LogProgress::default().with_cancel(cancel.clone());
        assert!(!reporter.is_cancel_requested("any"));
        cancel.request();
        assert!(reporter.is_cancel_requested("any"));
    }

    #[test]
    fn test_show_never_fails() {
        let mut reporter = LogProgress::new(25);
        for i in 0..8 {
            let update = ProgressUpdate {
                key: "k".into(),
                title: "t".into(),
                message: format!("Unit {}", i),
                current: i,
                total: if i % 2 == 0 { Some(8) } else { None },
                allow_cancel: false,
            };
            assert!(reporter.show(&update).is_ok());
        }
        assert!(reporter.clear("k").is_ok());
    }
}
