//! Benchmark utilities.

use rand::Rng;
use wiring_core::{Registry, Row, RowId, Table};
use wiring_testkit::fixtures::Carrier;

/// Generate a random carrier payload.
pub fn random_carrier() -> Carrier {
    let mut rng = rand::thread_rng();
    Carrier::new(rng.gen_range(0..1_000), rng.gen())
}

/// Generate carrier rows with consecutive ids starting at `first`.
pub fn generate_rows(table: &Table<Carrier>, first: u64, count: usize) -> Vec<Row<Carrier>> {
    (first..first + count as u64)
        .map(|id| table.row(RowId::new(id), random_carrier()))
        .collect()
}

/// Creates a registry whose carrier table holds `count` rows.
pub fn populated(count: usize) -> (Registry, Table<Carrier>) {
    let registry = Registry::new();
    let table = registry.get_or_create_table::<Carrier>();
    let rows = generate_rows(&table, 0, count);
    table.add(rows).expect("Failed to populate table");
    (registry, table)
}
