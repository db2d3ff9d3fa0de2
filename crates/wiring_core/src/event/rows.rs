//! Events for row-changing table operations.

use crate::error::{CoreResult, Phase};
use crate::event::{expect_state, Action, Event, Host};
use crate::row::{Payload, Row, Snapshot};
use crate::table::TableState;
use crate::types::RowId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Record of an `add`, `add_or_replace`, `remove` or `replace` call.
///
/// Holds the table's full row map from immediately before and after the
/// call, and the rows the call touched.
pub struct ChangeRowsEvent<T> {
    host: Arc<TableState<T>>,
    action: Action,
    before: Snapshot<T>,
    after: Snapshot<T>,
    diff: Vec<Row<T>>,
}

impl<T: Payload> ChangeRowsEvent<T> {
    pub(crate) fn new(
        host: Arc<TableState<T>>,
        action: Action,
        before: Snapshot<T>,
        after: Snapshot<T>,
        diff: Vec<Row<T>>,
    ) -> Self {
        Self {
            host,
            action,
            before,
            after,
            diff,
        }
    }

    /// Returns the rows the call touched.
    ///
    /// For `remove` these are the rows as they were stored; otherwise the
    /// rows that were supplied.
    #[must_use]
    pub fn diff_rows(&self) -> &[Row<T>] {
        &self.diff
    }

    /// Returns the row map before the call.
    #[must_use]
    pub fn before(&self) -> &Snapshot<T> {
        &self.before
    }

    /// Returns the row map after the call.
    #[must_use]
    pub fn after(&self) -> &Snapshot<T> {
        &self.after
    }

    fn swap(&self, phase: Phase, expected: &Snapshot<T>, target: &Snapshot<T>) -> CoreResult<()> {
        let host = Host::Table(self.host.key);
        let mut data = self.host.data.lock();
        expect_state(phase, self.action, host, expected, &data.rows, |s: &Snapshot<T>| {
            s.describe()
        })?;
        data.rows = target.clone();
        debug!(%host, action = %self.action, %phase, rows = data.rows.len(), "rows restored");
        Ok(())
    }
}

impl<T: Payload> Event for ChangeRowsEvent<T> {
    fn action(&self) -> Action {
        self.action
    }

    fn host(&self) -> Host {
        Host::Table(self.host.key)
    }

    fn redo(&self) -> CoreResult<()> {
        self.swap(Phase::Redo, &self.before, &self.after)
    }

    fn undo(&self) -> CoreResult<()> {
        self.swap(Phase::Undo, &self.after, &self.before)
    }

    fn diff_ids(&self) -> Vec<RowId> {
        self.diff.iter().map(Row::id).collect()
    }

    fn detail(&self) -> String {
        format!(
            "{} row(s); {} -> {} rows",
            self.diff.len(),
            self.before.len(),
            self.after.len()
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Debug for ChangeRowsEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRowsEvent")
            .field("table", &self.host.key.name())
            .field("action", &self.action)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("diff", &self.diff.len())
            .finish_non_exhaustive()
    }
}
