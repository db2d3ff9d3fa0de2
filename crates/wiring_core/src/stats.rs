//! History statistics.
//!
//! Counters for what the history has recorded and replayed. All counters
//! are atomic and can be read while other threads are mutating tables.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by a [`History`](crate::History).
#[derive(Debug, Default)]
pub struct HistoryStats {
    /// Events appended.
    appended: AtomicU64,
    /// Read events appended (subset of `appended`).
    reads: AtomicU64,
    /// Events successfully undone.
    undos: AtomicU64,
    /// Events successfully redone.
    redos: AtomicU64,
    /// Batches rejected with a usage error.
    rejected_batches: AtomicU64,
    /// Redo/undo assertions that failed.
    corruptions: AtomicU64,
}

impl HistoryStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_append(&self, is_read: bool) {
        self.appended.fetch_add(1, Ordering::Relaxed);
        if is_read {
            self.reads.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_undo(&self) {
        self.undos.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_redo(&self) {
        self.redos.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_batch(&self) {
        self.rejected_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_corruption(&self) {
        self.corruptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of appended events.
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    /// Returns the number of appended read events.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of undone events.
    pub fn undos(&self) -> u64 {
        self.undos.load(Ordering::Relaxed)
    }

    /// Returns the number of redone events.
    pub fn redos(&self) -> u64 {
        self.redos.load(Ordering::Relaxed)
    }

    /// Returns the number of rejected batches.
    pub fn rejected_batches(&self) -> u64 {
        self.rejected_batches.load(Ordering::Relaxed)
    }

    /// Returns the number of failed redo/undo assertions.
    pub fn corruptions(&self) -> u64 {
        self.corruptions.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            appended: self.appended(),
            reads: self.reads(),
            undos: self.undos(),
            redos: self.redos(),
            rejected_batches: self.rejected_batches(),
            corruptions: self.corruptions(),
        }
    }
}

/// A point-in-time copy of [`HistoryStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Events appended.
    pub appended: u64,
    /// Read events appended.
    pub reads: u64,
    /// Events undone.
    pub undos: u64,
    /// Events redone.
    pub redos: u64,
    /// Batches rejected with a usage error.
    pub rejected_batches: u64,
    /// Failed redo/undo assertions.
    pub corruptions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = HistoryStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_operations() {
        let stats = HistoryStats::new();

        stats.record_append(false);
        stats.record_append(true);
        stats.record_undo();
        stats.record_redo();
        stats.record_redo();
        stats.record_rejected_batch();

        let snap = stats.snapshot();
        assert_eq!(snap.appended, 2);
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.undos, 1);
        assert_eq!(snap.redos, 2);
        assert_eq!(snap.rejected_batches, 1);
        assert_eq!(snap.corruptions, 0);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(HistoryStats::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_append(false);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.appended(), 800);
    }
}
