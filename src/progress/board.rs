//! In-memory progress slots with cancel handles

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ProgressError, ProgressReporter, ProgressUpdate};

/// Shared cancellation flag for one progress key.
///
/// Cloning shares the flag, so the observer and whoever requests the
/// cancel can hold separate handles.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Latest state of one progress slot
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSlot {
    pub update: ProgressUpdate,
    /// Number of reports folded into this slot
    pub revisions: usize,
}

/// Progress observer that keeps one slot per key.
///
/// Stands in for an on-screen progress bar: the latest report per key,
/// counters of every show/clear, and a cancel handle per key.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    slots: HashMap<String, ProgressSlot>,
    cancels: HashMap<String, CancelHandle>,
    shows: HashMap<String, usize>,
    clears: HashMap<String, usize>,
    history: Vec<ProgressUpdate>,
    unavailable: bool,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a display that cannot be drawn to
    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    /// Cancel handle for a key, created on first use
    pub fn cancel_handle(&mut self, key: &str) -> CancelHandle {
        self.cancels.entry(key.to_string()).or_default().clone()
    }

    pub fn slot(&self, key: &str) -> Option<&ProgressSlot> {
        self.slots.get(key)
    }

    /// Number of currently open slots
    pub fn open_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn show_count(&self, key: &str) -> usize {
        self.shows.get(key).copied().unwrap_or(0)
    }

    pub fn clear_count(&self, key: &str) -> usize {
        self.clears.get(key).copied().unwrap_or(0)
    }

    /// Every accepted report, oldest first
    pub fn history(&self) -> &[ProgressUpdate] {
        &self.history
    }
}

impl ProgressReporter for ProgressBoard {
    fn show(&mut self, update: &ProgressUpdate) -> Result<(), ProgressError> {
        if self.unavailable {
            return Err(ProgressError::Unavailable);
        }

        *self.shows.entry(update.key.clone()).or_default() += 1;
        self.history.push(update.clone());

        self.slots
            .entry(update.key.clone())
            .and_modify(|slot| {
                slot.update = update.clone();
                slot.revisions += 1;
            })
            .or_insert_with(|| ProgressSlot {
                update: update.clone(),
                revisions: 1,
            });
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), ProgressError> {
        if self.unavailable {
            return Err(ProgressError::Unavailable);
        }

        *self.clears.entry(key.to_string()).or_default() += 1;
        if let Some(handle) = self.cancels.get(key) {
            handle.reset();
        }
        self.slots
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ProgressError::UnknownKey(key.to_string()))
    }

    fn is_cancel_requested(&self, key: &str) -> bool {
        self.cancels.get(key).is_some_and(|h| h.is_requested())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(key: &str, current: usize) -> ProgressUpdate {
        ProgressUpdate {
            key: key.to_string(),
            title: "Mass Edit".to_string(),
            message: format!("Unit {}", current),
            current,
            total: Some(3),
            allow_cancel: true,
        }
    }

    #[test]
    fn test_same_key_updates_one_slot() {
        let mut board = ProgressBoard::new();
        board.show(&update("a", 0)).unwrap();
        board.show(&update("a", 1)).unwrap();
        board.show(&update("b", 0)).unwrap();

        assert_eq!(board.open_slots(), 2);
        let slot = board.slot("a").unwrap();
        assert_eq!(slot.update.current, 1);
        assert_eq!(slot.revisions, 2);
        assert_eq!(board.history().len(), 3);
    }

    #[test]
    fn test_clear_removes_slot() {
        let mut board = ProgressBoard::new();
        board.show(&update("a", 0)).unwrap();
        board.clear("a").unwrap();
        assert!(board.slot("a").is_none());
        assert_eq!(board.clear_count("a"), 1);

        assert_eq!(board.clear("a"), Err(ProgressError::UnknownKey("a".into())));
    }

    #[test]
    fn test_cancel_handle_shared() {
        let mut board = ProgressBoard::new();
        let handle = board.cancel_handle("a");
        assert!(!board.is_cancel_requested("a"));

        handle.request();
        assert!(board.is_cancel_requested("a"));
        assert!(!board.is_cancel_requested("b"));
    }

    #[test]
    fn test_clear_resets_cancel() {
        let mut board = ProgressBoard::new();
        let handle = board.cancel_handle("a");
        board.show(&update("a", 0)).unwrap();
        handle.request();

        board.clear("a").unwrap();
        assert!(!board.is_cancel_requested("a"));
    }

    #[test]
    fn test_unavailable() {
        let mut board = ProgressBoard::new();
        board.set_available(false);
        assert_eq!(board.show(&update("a", 0)), Err(ProgressError::Unavailable));
        assert_eq!(board.show_count("a"), 0);
    }
}
