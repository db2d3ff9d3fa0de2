//! Row types and row maps.

mod map;

pub use map::{RowMap, Snapshot};

use crate::types::{CreationStamp, RowId, TableKey};
use std::fmt;
use std::sync::Arc;

/// Bound for values stored in a table.
///
/// Payloads are immutable values compared structurally; any type that is
/// `PartialEq + Debug + Send + Sync + 'static` qualifies.
pub trait Payload: PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: PartialEq + fmt::Debug + Send + Sync + 'static {}

/// An immutable, identified value stored in a table.
///
/// A row is never changed once built. Updating means building a new row
/// with the same id (see [`Row::with_payload`]) and replacing the stored one.
///
/// Two rows are equal when their ids and payloads are equal. The creation
/// stamp is metadata and does not take part in equality.
pub struct Row<T> {
    table: TableKey,
    id: RowId,
    created_at: CreationStamp,
    payload: Arc<T>,
}

impl<T: Payload> Row<T> {
    /// Creates a row.
    ///
    /// Most callers use [`Table::row`](crate::Table::row) or
    /// [`Table::new_row`](crate::Table::new_row), which stamp the row from the
    /// registry clock.
    pub fn new(id: RowId, created_at: CreationStamp, payload: T) -> Self {
        Self {
            table: TableKey::of::<T>(),
            id,
            created_at,
            payload: Arc::new(payload),
        }
    }
}

impl<T> Row<T> {
    /// Returns the key of the table this row belongs to.
    #[must_use]
    pub fn table(&self) -> TableKey {
        self.table
    }

    /// Returns the row id.
    #[must_use]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Returns the creation stamp.
    #[must_use]
    pub fn created_at(&self) -> CreationStamp {
        self.created_at
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Builds the replacement of this row: same id, new payload and stamp.
    #[must_use]
    pub fn with_payload(&self, payload: T, created_at: CreationStamp) -> Self {
        Self {
            table: self.table,
            id: self.id,
            created_at,
            payload: Arc::new(payload),
        }
    }
}

impl<T> Clone for Row<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            id: self.id,
            created_at: self.created_at,
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<T: PartialEq> PartialEq for Row<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && (Arc::ptr_eq(&self.payload, &other.payload) || self.payload == other.payload)
    }
}

impl<T: Eq> Eq for Row<T> {}

impl<T: fmt::Debug> fmt::Debug for Row<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("table", &self.table.name())
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("payload", &self.payload)
            .finish()
    }
}
