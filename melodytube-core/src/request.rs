//! Monotonic request tokens for discarding stale responses.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token handed out when a request starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

/// Issues increasing tokens; only the most recent one is current.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Start a new request, superseding every earlier token
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether no newer request has been issued since `token`
    #[must_use]
    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase() {
        let tracker = RequestTracker::new();
        let a = tracker.issue();
        let b = tracker.issue();
        assert!(b > a);
        assert_eq!(b.sequence(), a.sequence() + 1);
    }

    #[test]
    fn test_only_newest_is_latest() {
        let tracker = RequestTracker::new();
        let first = tracker.issue();
        assert!(tracker.is_latest(first));

        let second = tracker.issue();
        assert!(!tracker.is_latest(first));
        assert!(tracker.is_latest(second));
    }
}
