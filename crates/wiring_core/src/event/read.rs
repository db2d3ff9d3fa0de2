//! Audit events for table reads.
//!
//! Reads change nothing, so redo and undo always succeed without touching
//! the table. `verify` checks whether the table would still answer the
//! same way.

use crate::error::CoreResult;
use crate::event::{Action, Event, Host};
use crate::row::{Payload, Row};
use crate::table::TableState;
use crate::types::RowId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Record of a `get` call.
pub struct RowEvent<T> {
    host: Arc<TableState<T>>,
    id: RowId,
    found: Option<Row<T>>,
}

impl<T: Payload> RowEvent<T> {
    pub(crate) fn new(host: Arc<TableState<T>>, id: RowId, found: Option<Row<T>>) -> Self {
        Self { host, id, found }
    }

    /// Returns the id that was looked up.
    #[must_use]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Returns what the lookup found.
    #[must_use]
    pub fn row(&self) -> Option<&Row<T>> {
        self.found.as_ref()
    }

    /// Returns true if the table still yields the same result for the id.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.host.data.lock().rows.get(self.id) == self.found.as_ref()
    }
}

impl<T: Payload> Event for RowEvent<T> {
    fn action(&self) -> Action {
        Action::Get
    }

    fn host(&self) -> Host {
        Host::Table(self.host.key)
    }

    fn redo(&self) -> CoreResult<()> {
        Ok(())
    }

    fn undo(&self) -> CoreResult<()> {
        Ok(())
    }

    fn diff_ids(&self) -> Vec<RowId> {
        vec![self.id]
    }

    fn detail(&self) -> String {
        let outcome = if self.found.is_some() { "found" } else { "missing" };
        format!("{} {outcome}", self.id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Debug for RowEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowEvent")
            .field("table", &self.host.key.name())
            .field("id", &self.id)
            .field("found", &self.found.is_some())
            .finish()
    }
}

/// Record of a `get_many` call.
pub struct RowsEvent<T> {
    host: Arc<TableState<T>>,
    ids: Vec<RowId>,
    found: Vec<Option<Row<T>>>,
}

impl<T: Payload> RowsEvent<T> {
    pub(crate) fn new(host: Arc<TableState<T>>, ids: Vec<RowId>, found: Vec<Option<Row<T>>>) -> Self {
        Self { host, ids, found }
    }

    /// Returns the ids that were looked up, in request order.
    #[must_use]
    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    /// Returns what each lookup found, in request order.
    #[must_use]
    pub fn rows(&self) -> &[Option<Row<T>>] {
        &self.found
    }

    /// Returns true if the table still yields the same result for every id.
    #[must_use]
    pub fn verify(&self) -> bool {
        let data = self.host.data.lock();
        self.ids
            .iter()
            .zip(&self.found)
            .all(|(id, found)| data.rows.get(*id) == found.as_ref())
    }
}

impl<T: Payload> Event for RowsEvent<T> {
    fn action(&self) -> Action {
        Action::GetMany
    }

    fn host(&self) -> Host {
        Host::Table(self.host.key)
    }

    fn redo(&self) -> CoreResult<()> {
        Ok(())
    }

    fn undo(&self) -> CoreResult<()> {
        Ok(())
    }

    fn diff_ids(&self) -> Vec<RowId> {
        self.ids.clone()
    }

    fn detail(&self) -> String {
        let hits = self.found.iter().filter(|row| row.is_some()).count();
        format!("{hits} of {} found", self.ids.len())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Debug for RowsEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowsEvent")
            .field("table", &self.host.key.name())
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}
