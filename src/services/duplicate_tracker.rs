//! Duplicate-attempt tracker
//!
//! Bounded in-memory buffer of pending duplicate check-in notifications,
//! polled by the dashboard. Capacity 10; pushing past the cap evicts the
//! oldest entry. `snapshot` returns the contents without clearing and
//! `clear` empties the buffer unconditionally, so attempts pushed between
//! a poller's snapshot and its clear call are lost. Not persisted; the
//! buffer starts empty on every restart.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Number of attempts retained before the oldest is evicted
pub const TRACKER_CAPACITY: usize = 10;

/// A recognized tag's second-or-later scan of the day
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateAttempt {
    pub uid: String,
    pub name: String,
    pub time: String,
    pub date: String,
    #[serde(rename = "timestamp")]
    pub detected_at: String,
}

/// Shared bounded buffer of duplicate attempts
#[derive(Debug, Clone)]
pub struct DuplicateTracker {
    attempts: Arc<RwLock<VecDeque<DuplicateAttempt>>>,
    capacity: usize,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::with_capacity(TRACKER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append an attempt, evicting the oldest entries past capacity
    pub async fn push(&self, attempt: DuplicateAttempt) {
        let mut attempts = self.attempts.write().await;
        attempts.push_back(attempt);
        while attempts.len() > self.capacity {
            attempts.pop_front();
        }
    }

    /// Current contents, oldest first. Does not clear.
    pub async fn snapshot(&self) -> Vec<DuplicateAttempt> {
        self.attempts.read().await.iter().cloned().collect()
    }

    /// Empty the buffer unconditionally
    pub async fn clear(&self) {
        self.attempts.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.attempts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.attempts.read().await.is_empty()
    }
}

impl Default for DuplicateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(n: usize) -> DuplicateAttempt {
        DuplicateAttempt {
            uid: format!("01:40:3B:{n:02X}"),
            name: format!("Student {n}"),
            time: "2025-03-14 09:00:00".to_string(),
            date: "2025-03-14".to_string(),
            detected_at: "2025-03-14T09:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn push_past_capacity_evicts_oldest() {
        let tracker = DuplicateTracker::new();
        for n in 0..11 {
            tracker.push(attempt(n)).await;
        }

        let attempts = tracker.snapshot().await;
        assert_eq!(attempts.len(), TRACKER_CAPACITY);
        assert_eq!(attempts[0].name, "Student 1");
        assert_eq!(attempts[9].name, "Student 10");
    }

    #[tokio::test]
    async fn snapshot_does_not_clear() {
        let tracker = DuplicateTracker::new();
        tracker.push(attempt(0)).await;

        assert_eq!(tracker.snapshot().await.len(), 1);
        assert_eq!(tracker.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_unconditionally() {
        let tracker = DuplicateTracker::new();
        for n in 0..3 {
            tracker.push(attempt(n)).await;
        }

        tracker.clear().await;
        assert!(tracker.is_empty().await);
    }
}
