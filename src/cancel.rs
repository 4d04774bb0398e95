//! Generation-based cancellation.
//!
//! A [`VersionTracker`] hands out one token per unit of work. Starting a new
//! generation (`next_token`) implicitly cancels every token handed out for an
//! older generation, so superseded searches and rebuilds stop at their next
//! check point (piece or directory boundary).

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the active generation for one family of operations.
#[derive(Debug, Default, Clone)]
pub struct VersionTracker {
    active_version: Arc<AtomicU64>,
}

impl VersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, cancelling every previously issued token.
    pub fn next_token(&self) -> CancellationToken {
        let version = self.active_version.fetch_add(1, Ordering::SeqCst) + 1;
        CancellationToken {
            active_version: Some(Arc::clone(&self.active_version)),
            version,
        }
    }

    /// Token bound to the current generation without starting a new one.
    pub fn current_token(&self) -> CancellationToken {
        CancellationToken {
            active_version: Some(Arc::clone(&self.active_version)),
            version: self.active_version.load(Ordering::SeqCst),
        }
    }

    /// Cancel every outstanding token.
    pub fn cancel_all(&self) {
        self.active_version.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }
}

/// Token checked at well-defined points of long-running work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// `None` for tokens that can never be cancelled.
    active_version: Option<Arc<AtomicU64>>,
    version: u64,
}

impl CancellationToken {
    /// A token that is never cancelled. Useful for tests and one-shot CLI work.
    pub fn noop() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        match &self.active_version {
            Some(active) => active.load(Ordering::Relaxed) != self.version,
            None => false,
        }
    }

    /// `Err(Error::Cancelled)` once a newer generation has started.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_token_is_never_cancelled() {
        let token = CancellationToken::noop();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn new_generation_cancels_previous_token() {
        let tracker = VersionTracker::new();
        let first = tracker.next_token();
        assert!(!first.is_cancelled());

        let second = tracker.next_token();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(matches!(first.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn cancel_all_cancels_current_token() {
        let tracker = VersionTracker::new();
        let token = tracker.current_token();
        tracker.cancel_all();
        assert!(token.is_cancelled());
    }
}
