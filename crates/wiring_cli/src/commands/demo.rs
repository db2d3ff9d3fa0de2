//! Demo command implementation.

use serde::Serialize;
use tracing::{info, warn};
use wiring_core::{CoreResult, EventRecord, Registry, StatsSnapshot, TableSummary};
use wiring_testkit::fixtures::{scenarios, Carrier, CarrierState, WireQueue};

/// Everything the demo prints.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    /// History entries, oldest first.
    pub events: Vec<EventRecord>,
    /// Table summaries after any undo.
    pub tables: Vec<TableSummary>,
    /// History counters.
    pub stats: StatsSnapshot,
}

/// Runs the demo command.
pub fn run(format: &str, undo: usize) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::new();
    script(&registry)?;

    if undo > 0 {
        info!(count = undo, "undoing recent events");
        registry.history().undo_last(undo)?;
    }

    let report = DemoReport {
        events: registry.history().records(),
        tables: registry.summaries(),
        stats: registry.history().stats().snapshot(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

/// Builds a circuit, moves its carrier off the wire and tries one bad insert.
fn script(registry: &Registry) -> CoreResult<()> {
    let circuit = scenarios::small_circuit(registry)?;

    let queues = registry.get_or_create_table::<WireQueue>();
    let carriers = registry.get_or_create_table::<Carrier>();
    let states = registry.get_or_create_table::<CarrierState>();

    let (drained, carrier_id) = circuit.queue.payload().popped();
    queues.replace([queues.replacement(&circuit.queue, drained)])?;

    if let Some(carrier_id) = carrier_id {
        let state = states.new_row(CarrierState {
            carrier_id,
            state_id: 1,
        })?;
        states.add([state])?;
    }

    carriers.get(circuit.carrier.id());

    if let Err(err) = carriers.add([circuit.carrier.clone()]) {
        warn!(error = %err, "rejected duplicate carrier");
    }

    Ok(())
}

fn print_text_output(report: &DemoReport) {
    println!("History ({} events)", report.events.len());
    println!("================");
    println!();
    for record in &report.events {
        println!("{record}");
    }

    println!();
    println!("Tables");
    println!("================");
    for table in &report.tables {
        println!("{:<14} rows={:<4} next_id={}", table.name, table.rows, table.next_id);
    }

    println!();
    println!(
        "appended={} reads={} undos={} redos={} rejected={} corruptions={}",
        report.stats.appended,
        report.stats.reads,
        report.stats.undos,
        report.stats.redos,
        report.stats.rejected_batches,
        report.stats.corruptions
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_records_one_rejection() {
        let registry = Registry::new();
        script(&registry).unwrap();

        let stats = registry.history().stats();
        assert_eq!(stats.rejected_batches(), 1);
        assert_eq!(stats.reads(), 1);

        let states = registry.get_or_create_table::<CarrierState>();
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn script_undoes_cleanly() {
        let registry = Registry::new();
        script(&registry).unwrap();
        registry.history().undo_all().unwrap();
        assert_eq!(registry.table_count(), 0);
    }
}
