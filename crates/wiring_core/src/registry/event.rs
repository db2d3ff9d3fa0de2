//! Event for table creation.

use crate::error::{CoreResult, Phase};
use crate::event::{expect_state, Action, Event, Host};
use crate::registry::{RegistryState, TableMap};
use crate::types::TableKey;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Record of a table being added to the registry.
///
/// Holds the registry's table map before and after the creation. A redo or
/// undo applies only if the registry holds the same keys mapped to the same
/// table objects as the map this event expects.
pub struct TableCreatedEvent {
    host: Arc<RegistryState>,
    key: TableKey,
    before: TableMap,
    after: TableMap,
}

impl TableCreatedEvent {
    pub(crate) fn new(host: Arc<RegistryState>, key: TableKey, before: TableMap, after: TableMap) -> Self {
        Self {
            host,
            key,
            before,
            after,
        }
    }

    /// Returns the key of the created table.
    #[must_use]
    pub fn table_key(&self) -> TableKey {
        self.key
    }

    fn swap(&self, phase: Phase, expected: &TableMap, target: &TableMap) -> CoreResult<()> {
        let mut tables = self.host.tables.lock();
        expect_state(
            phase,
            Action::CreateTable,
            Host::Registry,
            &MapContents(expected),
            &MapContents(&*tables),
            |m: &MapContents<'_>| m.describe(),
        )?;
        *tables = Arc::clone(target);
        debug!(table = %self.key, %phase, tables = tables.len(), "registry restored");
        Ok(())
    }
}

impl Event for TableCreatedEvent {
    fn action(&self) -> Action {
        Action::CreateTable
    }

    fn host(&self) -> Host {
        Host::Registry
    }

    fn redo(&self) -> CoreResult<()> {
        self.swap(Phase::Redo, &self.before, &self.after)
    }

    fn undo(&self) -> CoreResult<()> {
        self.swap(Phase::Undo, &self.after, &self.before)
    }

    fn detail(&self) -> String {
        format!(
            "{}; {} -> {} tables",
            self.key,
            self.before.len(),
            self.after.len()
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for TableCreatedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableCreatedEvent")
            .field("table", &self.key.name())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish_non_exhaustive()
    }
}

// Equal when both maps hold the same keys, each bound to the same table.
struct MapContents<'a>(&'a TableMap);

impl MapContents<'_> {
    fn describe(&self) -> String {
        let mut names: Vec<&str> = self.0.keys().map(TableKey::name).collect();
        names.sort_unstable();
        format!("{} tables {names:?}", names.len())
    }
}

impl PartialEq for MapContents<'_> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.0, other.0)
            || (self.0.len() == other.0.len()
                && self.0.iter().all(|(key, table)| {
                    other.0.get(key).is_some_and(|theirs| Arc::ptr_eq(table, theirs))
                }))
    }
}
