//! Event debouncer for file system events
//!
//! Accumulates file system events within a time window and produces
//! normalized change batches, so bursts like a git checkout or an editor's
//! save sequence reach the snapshot manager as one batch.

use crate::snapshot::{PathChangeEntry, PathChangeKind};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub struct EventDebouncer {
    window: Duration,
    /// Net change per path, merged with [`PathChangeKind::merge`].
    pending: FxHashMap<PathBuf, PathChangeKind>,
    /// Time of the last event for any path.
    last_event: Option<Instant>,
}

impl EventDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashMap::default(),
            last_event: None,
        }
    }

    pub fn add_event(&mut self, path: PathBuf, kind: PathChangeKind) {
        self.last_event = Some(Instant::now());
        let merged = self
            .pending
            .get(&path)
            .copied()
            .unwrap_or(PathChangeKind::None)
            .merge(kind);
        if merged == PathChangeKind::None {
            // Create + Delete: the path never existed as far as we care.
            self.pending.remove(&path);
        } else {
            self.pending.insert(path, merged);
        }
    }

    /// True once no event arrived for a whole window.
    pub fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|last| last.elapsed() >= self.window)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn time_until_ready(&self) -> Option<Duration> {
        self.last_event
            .map(|last| self.window.saturating_sub(last.elapsed()))
    }

    /// Drain the pending changes, sorted by path. `None` if there are none.
    pub fn flush(&mut self) -> Option<Vec<PathChangeEntry>> {
        self.last_event = None;
        if self.pending.is_empty() {
            return None;
        }
        let mut batch: Vec<PathChangeEntry> = self
            .pending
            .drain()
            .map(|(path, kind)| PathChangeEntry::new(path, kind))
            .collect();
        batch.sort_by(|a, b| a.path.cmp(&b.path));
        Some(batch)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn debouncer() -> EventDebouncer {
        EventDebouncer::new(Duration::from_millis(50))
    }

    fn kinds(batch: &[PathChangeEntry]) -> Vec<PathChangeKind> {
        batch.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn single_event() {
        let mut debouncer = debouncer();
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Changed);
        assert!(debouncer.has_pending());
        assert_eq!(debouncer.pending_count(), 1);

        sleep(Duration::from_millis(60));
        assert!(debouncer.is_ready());
        let batch = debouncer.flush().unwrap();
        assert_eq!(kinds(&batch), vec![PathChangeKind::Changed]);
    }

    #[test]
    fn create_then_modify_is_create() {
        let mut debouncer = debouncer();
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Created);
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Changed);
        let batch = debouncer.flush().unwrap();
        assert_eq!(kinds(&batch), vec![PathChangeKind::Created]);
    }

    #[test]
    fn create_then_delete_is_dropped() {
        let mut debouncer = debouncer();
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Created);
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Deleted);
        assert!(debouncer.flush().is_none());
    }

    #[test]
    fn delete_then_create_is_change() {
        let mut debouncer = debouncer();
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Deleted);
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Created);
        let batch = debouncer.flush().unwrap();
        assert_eq!(kinds(&batch), vec![PathChangeKind::Changed]);
    }

    #[test]
    fn multiple_files_sorted() {
        let mut debouncer = debouncer();
        debouncer.add_event(PathBuf::from("c.rs"), PathChangeKind::Deleted);
        debouncer.add_event(PathBuf::from("a.rs"), PathChangeKind::Created);
        debouncer.add_event(PathBuf::from("b.rs"), PathChangeKind::Changed);
        let batch = debouncer.flush().unwrap();
        assert_eq!(
            kinds(&batch),
            vec![
                PathChangeKind::Created,
                PathChangeKind::Changed,
                PathChangeKind::Deleted
            ]
        );
    }

    #[test]
    fn not_ready_immediately() {
        let mut debouncer = debouncer();
        debouncer.add_event(PathBuf::from("test.rs"), PathChangeKind::Changed);
        assert!(!debouncer.is_ready());
        assert!(debouncer.time_until_ready().unwrap() > Duration::ZERO);
    }
}
