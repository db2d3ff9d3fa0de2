//! Stress tests for wiring tables.
//!
//! These helpers drive tables from many threads at once and check the
//! guarantees that must hold afterwards.

use crate::fixtures::Carrier;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use wiring_core::{CoreResult, Registry, RowId, Snapshot};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
        }
    }
}

/// Allocates ids from every thread and checks that none repeats.
///
/// Returns the result and the number of duplicate ids seen (always zero
/// unless allocation is broken).
pub fn stress_concurrent_next_id(registry: &Registry, config: &StressConfig) -> (StressTestResult, usize) {
    let table = registry.get_or_create_table::<Carrier>();
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let table = table.clone();
            let failed = Arc::clone(&failed);
            let operations = config.operations;
            thread::spawn(move || {
                let mut ids = Vec::with_capacity(operations);
                for _ in 0..operations {
                    match table.next_id() {
                        Ok(id) => ids.push(id),
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                ids
            })
        })
        .collect();

    let mut seen: HashSet<RowId> = HashSet::new();
    let mut allocated = 0usize;
    let mut duplicates = 0usize;
    for handle in handles {
        for id in handle.join().expect("Thread panicked") {
            allocated += 1;
            if !seen.insert(id) {
                duplicates += 1;
            }
        }
    }

    let result = StressTestResult::new(allocated, failed.load(Ordering::Relaxed), start.elapsed());
    (result, duplicates)
}

/// Adds, replaces and removes rows from every thread.
///
/// Each thread owns a disjoint slice of the id space, so no operation
/// should fail.
pub fn stress_concurrent_writes(registry: &Registry, config: &StressConfig) -> StressTestResult {
    let table = registry.get_or_create_table::<Carrier>();
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let table = table.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;
            let base = (t * operations) as u64;

            thread::spawn(move || {
                for i in 0..operations as u64 {
                    let id = RowId::new(base + i);
                    let result = match i % 3 {
                        0 => table.add([table.row(id, Carrier::new(1, base + i))]),
                        1 => {
                            let prev = RowId::new(base + i - 1);
                            table.replace([table.row(prev, Carrier::new(2, base + i))])
                        }
                        _ => table.remove([RowId::new(base + i - 2)]).map(drop),
                    };
                    match result {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs concurrent writes, then undoes them all and checks the table is
/// back to where it started.
///
/// Returns the write result and whether the round trip restored the table.
pub fn stress_undo_round_trip(registry: &Registry, config: &StressConfig) -> CoreResult<(StressTestResult, bool)> {
    let table = registry.get_or_create_table::<Carrier>();
    let history = registry.history();
    let start = history.len();
    let initial: (Snapshot<Carrier>, RowId) = (table.snapshot(), table.peek_next_id());

    let result = stress_concurrent_writes(registry, config);
    history.undo_last(history.len() - start)?;

    let restored = (table.snapshot(), table.peek_next_id()) == initial;
    Ok((result, restored))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_next_id() {
        let registry = Registry::new();
        let config = StressConfig {
            operations: 500,
            threads: 8,
        };

        let (result, duplicates) = stress_concurrent_next_id(&registry, &config);
        assert_eq!(duplicates, 0);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 4_000);
    }

    #[test]
    fn test_concurrent_writes() {
        let registry = Registry::new();
        let config = StressConfig {
            operations: 300,
            threads: 4,
        };

        let result = stress_concurrent_writes(&registry, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, 1_200);
        // Every third operation removes the row added two steps earlier.
        assert_eq!(registry.get_or_create_table::<Carrier>().len(), 0);
    }

    #[test]
    fn test_undo_round_trip() {
        let registry = Registry::new();
        let config = StressConfig {
            operations: 200,
            threads: 4,
        };

        let (result, restored) = stress_undo_round_trip(&registry, &config).unwrap();
        assert_eq!(result.failed_ops, 0);
        assert!(restored);
    }
}
