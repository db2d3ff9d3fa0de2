//! Replayable, reversible records of table and registry mutations.
//!
//! Every table operation and every table creation produces exactly one
//! event. An event carries the state of its host before and after the
//! operation:
//!
//! - [`ChangeRowsEvent`] - full row-map snapshots plus the affected rows
//! - [`NextIdEvent`] - old and new id counter
//! - [`RowEvent`] / [`RowsEvent`] - what a read observed (no state change)
//! - [`TableCreatedEvent`](crate::TableCreatedEvent) - registry snapshots
//!
//! `redo` and `undo` are compare-and-set operations: they apply only when
//! the host currently holds exactly the state on the other side of the
//! event, and fail with [`CoreError::HistoryCorruption`] otherwise.

mod next_id;
mod read;
mod rows;

pub use next_id::NextIdEvent;
pub use read::{RowEvent, RowsEvent};
pub use rows::ChangeRowsEvent;

use crate::error::{CoreError, CoreResult, Phase};
use crate::types::{RowId, TableKey};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use tracing::error;

/// What an event did to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// A row id was allocated.
    NextId,
    /// Rows were inserted.
    Add,
    /// Rows were upserted.
    AddOrReplace,
    /// Rows were removed.
    Remove,
    /// Existing rows were overwritten.
    Replace,
    /// One row was read.
    Get,
    /// Several rows were read.
    GetMany,
    /// A table was added to the registry.
    CreateTable,
}

impl Action {
    /// Returns the action label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NextId => "next_id",
            Self::Add => "add",
            Self::AddOrReplace => "add_or_replace",
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Get => "get",
            Self::GetMany => "get_many",
            Self::CreateTable => "create_table",
        }
    }

    /// Returns true for actions that do not change their host.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Get | Self::GetMany)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The object an event mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {
    /// The registry's table map.
    Registry,
    /// One table.
    Table(TableKey),
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => f.write_str("registry"),
            Self::Table(key) => write!(f, "table {key}"),
        }
    }
}

/// A recorded state transition.
pub trait Event: Send + Sync + fmt::Debug {
    /// Returns what the event did.
    fn action(&self) -> Action;

    /// Returns the object the event mutates.
    fn host(&self) -> Host;

    /// Re-applies the event.
    ///
    /// Fails with `HistoryCorruption` unless the host is in the state the
    /// event started from.
    fn redo(&self) -> CoreResult<()>;

    /// Reverses the event.
    ///
    /// Fails with `HistoryCorruption` unless the host is in the state the
    /// event produced.
    fn undo(&self) -> CoreResult<()>;

    /// Returns the ids of the rows the event touched.
    fn diff_ids(&self) -> Vec<RowId> {
        Vec::new()
    }

    /// One-line summary of the transition.
    fn detail(&self) -> String;

    /// Returns `self` for downcasting to the concrete event type.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Event {
    /// Returns the concrete event, if it is an `E`.
    pub fn downcast_ref<E: Event + 'static>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}

/// Serializable audit view of one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Position in the history.
    pub index: usize,
    /// Action label.
    pub action: &'static str,
    /// Host description.
    pub host: String,
    /// Ids of the touched rows.
    pub diff_ids: Vec<u64>,
    /// One-line summary.
    pub detail: String,
}

impl EventRecord {
    /// Builds the record of `event` stored at `index`.
    pub fn new(index: usize, event: &dyn Event) -> Self {
        Self {
            index,
            action: event.action().as_str(),
            host: event.host().to_string(),
            diff_ids: event.diff_ids().into_iter().map(RowId::as_u64).collect(),
            detail: event.detail(),
        }
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<5} {:<15} {:<24} {}",
            self.index, self.action, self.host, self.detail
        )
    }
}

/// Compares the host's actual state against the state an event expects.
pub(crate) fn expect_state<S: PartialEq + ?Sized>(
    phase: Phase,
    action: Action,
    host: Host,
    expected: &S,
    actual: &S,
    describe: impl Fn(&S) -> String,
) -> CoreResult<()> {
    if expected == actual {
        return Ok(());
    }

    let err = CoreError::history_corruption(
        phase,
        action.as_str(),
        host.to_string(),
        describe(expected),
        describe(actual),
    );
    error!(%phase, %action, %host, "{err}");
    Err(err)
}
