//! Lock-guarded table state shared by table handles and events.

use crate::row::{Payload, Snapshot};
use crate::types::{RowId, TableKey};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The data one table lock protects.
pub(crate) struct TableData<T> {
    /// Current rows.
    pub(crate) rows: Snapshot<T>,
    /// Next id to hand out.
    pub(crate) next_id: u64,
}

/// A table's identity and its lock-guarded data.
///
/// This is the host of every table event. It holds no reference to the
/// history, so events can own it without forming a cycle.
pub(crate) struct TableState<T> {
    pub(crate) key: TableKey,
    pub(crate) data: Mutex<TableData<T>>,
}

impl<T: Payload> TableState<T> {
    pub(crate) fn new(first_row_id: u64) -> Self {
        Self {
            key: TableKey::of::<T>(),
            data: Mutex::new(TableData {
                rows: Snapshot::empty(),
                next_id: first_row_id,
            }),
        }
    }
}

impl<T> fmt::Debug for TableState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.lock();
        f.debug_struct("TableState")
            .field("key", &self.key.name())
            .field("rows", &data.rows.len())
            .field("next_id", &data.next_id)
            .finish()
    }
}

/// Type-erased view of a table, as stored by the registry.
pub(crate) trait ErasedTable: Send + Sync {
    /// Returns the table key.
    fn key(&self) -> TableKey;

    /// Returns the current row count.
    fn row_count(&self) -> usize;

    /// Returns the next id the table will hand out.
    fn next_id(&self) -> RowId;

    /// Converts to `Any` for recovering the typed state.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Payload> ErasedTable for TableState<T> {
    fn key(&self) -> TableKey {
        self.key
    }

    fn row_count(&self) -> usize {
        self.data.lock().rows.len()
    }

    fn next_id(&self) -> RowId {
        RowId::new(self.data.lock().next_id)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
