//! The table registry.
//!
//! The registry maps payload types to their tables and owns the history
//! every table appends to. Tables are created lazily on first access.

mod event;

pub use event::TableCreatedEvent;

use crate::config::Config;
use crate::history::History;
use crate::row::Payload;
use crate::table::{ErasedTable, Table, TableState};
use crate::types::{LogicalClock, TableKey};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Immutable snapshot of the registry's tables.
pub(crate) type TableMap = Arc<HashMap<TableKey, Arc<dyn ErasedTable>>>;

/// The registry's lock-guarded table map; host of [`TableCreatedEvent`].
pub(crate) struct RegistryState {
    pub(crate) tables: Mutex<TableMap>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            tables: Mutex::new(Arc::new(HashMap::new())),
        }
    }
}

/// Per-table summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    /// Table name.
    pub name: &'static str,
    /// Number of stored rows.
    pub rows: usize,
    /// Next id the table will hand out.
    pub next_id: u64,
}

/// Entry point: owns the history and hands out typed tables.
///
/// Cloning a registry yields another handle to the same tables and history.
///
/// # Example
///
/// ```
/// use wiring_core::{Registry, RowId};
///
/// #[derive(Debug, PartialEq)]
/// struct Tag(&'static str);
///
/// let registry = Registry::new();
/// let tags = registry.get_or_create_table::<Tag>();
/// let row = tags.new_row(Tag("power")).unwrap();
/// tags.add([row.clone()]).unwrap();
///
/// assert_eq!(tags.get(row.id()), Some(row));
/// assert_eq!(tags.get(RowId::new(99)), None);
/// ```
#[derive(Clone)]
pub struct Registry {
    state: Arc<RegistryState>,
    history: Arc<History>,
    clock: Arc<LogicalClock>,
    config: Config,
}

impl Registry {
    /// Creates a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a registry with a fresh history.
    pub fn with_config(config: Config) -> Self {
        let history = Arc::new(History::with_capacity(config.history_capacity));
        Self::with_history(history, config)
    }

    /// Creates a registry appending to an existing history.
    pub fn with_history(history: Arc<History>, config: Config) -> Self {
        Self {
            state: Arc::new(RegistryState::new()),
            history,
            clock: Arc::new(LogicalClock::new()),
            config,
        }
    }

    /// Returns the history.
    #[must_use]
    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the table for payload type `T`, creating it if needed.
    ///
    /// Only the call that creates the table appends an event; later calls
    /// return handles to the same table and record nothing.
    pub fn get_or_create_table<T: Payload>(&self) -> Table<T> {
        let key = TableKey::of::<T>();
        let _admitted = self.history.admit();
        let mut tables = self.state.tables.lock();

        let state = match lookup::<T>(&tables) {
            Some(state) => state,
            None => {
                let state = Arc::new(TableState::<T>::new(self.config.first_row_id));
                let before = Arc::clone(&tables);
                let mut map = HashMap::clone(&before);
                map.insert(key, Arc::clone(&state) as Arc<dyn ErasedTable>);
                let after: TableMap = Arc::new(map);
                *tables = Arc::clone(&after);

                debug!(table = %key, tables = after.len(), "table created");
                self.history.push(Arc::new(TableCreatedEvent::new(
                    Arc::clone(&self.state),
                    key,
                    before,
                    after,
                )));
                state
            }
        };

        Table::new(
            state,
            Arc::clone(&self.history),
            Arc::clone(&self.clock),
            self.config.audit_reads,
        )
    }

    /// Returns the keys of all tables, sorted by name.
    #[must_use]
    pub fn table_keys(&self) -> Vec<TableKey> {
        let mut keys: Vec<TableKey> = self.state.tables.lock().keys().copied().collect();
        keys.sort_by_key(|key| key.name());
        keys
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.state.tables.lock().len()
    }

    /// Returns a summary of every table, sorted by name.
    #[must_use]
    pub fn summaries(&self) -> Vec<TableSummary> {
        let tables = Arc::clone(&self.state.tables.lock());
        let mut summaries: Vec<TableSummary> = tables
            .values()
            .map(|table| TableSummary {
                name: table.key().name(),
                rows: table.row_count(),
                next_id: table.next_id().as_u64(),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.name);
        summaries
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tables", &self.table_keys())
            .field("history", &self.history)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn lookup<T: Payload>(tables: &TableMap) -> Option<Arc<TableState<T>>> {
    let table = tables.get(&TableKey::of::<T>())?;
    Arc::clone(table).into_any().downcast::<TableState<T>>().ok()
}
