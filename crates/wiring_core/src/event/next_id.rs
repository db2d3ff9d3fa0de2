//! Event for id allocation.

use crate::error::{CoreResult, Phase};
use crate::event::{expect_state, Action, Event, Host};
use crate::row::Payload;
use crate::table::TableState;
use crate::types::RowId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Record of a `next_id` call: the counter before and after.
pub struct NextIdEvent<T> {
    host: Arc<TableState<T>>,
    before: u64,
    after: u64,
}

impl<T: Payload> NextIdEvent<T> {
    pub(crate) fn new(host: Arc<TableState<T>>, before: u64, after: u64) -> Self {
        Self {
            host,
            before,
            after,
        }
    }

    /// Returns the id the call handed out.
    #[must_use]
    pub fn allocated(&self) -> RowId {
        RowId::new(self.before)
    }

    fn swap(&self, phase: Phase, expected: u64, target: u64) -> CoreResult<()> {
        let mut data = self.host.data.lock();
        expect_state(
            phase,
            Action::NextId,
            Host::Table(self.host.key),
            &expected,
            &data.next_id,
            |n: &u64| format!("next_id = {n}"),
        )?;
        data.next_id = target;
        Ok(())
    }
}

impl<T: Payload> Event for NextIdEvent<T> {
    fn action(&self) -> Action {
        Action::NextId
    }

    fn host(&self) -> Host {
        Host::Table(self.host.key)
    }

    fn redo(&self) -> CoreResult<()> {
        self.swap(Phase::Redo, self.before, self.after)
    }

    fn undo(&self) -> CoreResult<()> {
        self.swap(Phase::Undo, self.after, self.before)
    }

    fn diff_ids(&self) -> Vec<RowId> {
        vec![self.allocated()]
    }

    fn detail(&self) -> String {
        format!("next_id {} -> {}", self.before, self.after)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Debug for NextIdEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextIdEvent")
            .field("table", &self.host.key.name())
            .field("before", &self.before)
            .field("after", &self.after)
            .finish()
    }
}
