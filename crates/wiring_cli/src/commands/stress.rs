//! Stress command implementation.

use tracing::info;
use wiring_core::Registry;
use wiring_testkit::stress::{stress_concurrent_next_id, stress_undo_round_trip, StressConfig};

/// Runs the stress command.
pub fn run(threads: usize, ops: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = StressConfig {
        operations: ops,
        threads,
    };

    let registry = Registry::new();
    let (ids, duplicates) = stress_concurrent_next_id(&registry, &config);
    ids.print_summary("Concurrent id allocation");
    if duplicates > 0 {
        return Err(format!("{duplicates} duplicate ids allocated").into());
    }

    let registry = Registry::new();
    let (writes, restored) = stress_undo_round_trip(&registry, &config)?;
    writes.print_summary("Concurrent writes");
    info!(
        events = registry.history().len(),
        undos = registry.history().stats().undos(),
        "history replayed"
    );
    if writes.failed_ops > 0 {
        return Err(format!("{} writes failed", writes.failed_ops).into());
    }
    if !restored {
        return Err("undo did not restore the initial table".into());
    }

    println!("\nUndo round trip: OK");
    Ok(())
}
