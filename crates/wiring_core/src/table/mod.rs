//! Typed tables.
//!
//! A [`Table`] is a cheap handle to one table's lock-guarded state. All
//! handles obtained for the same payload type from the same registry share
//! that state. Every operation appends exactly one event to the registry's
//! history, inside the same critical section as the change itself.

mod state;

pub(crate) use state::{ErasedTable, TableState};

use crate::error::{CoreError, CoreResult};
use crate::event::{Action, ChangeRowsEvent, NextIdEvent, RowEvent, RowsEvent};
use crate::history::History;
use crate::row::{Payload, Row, RowMap, Snapshot};
use crate::types::{LogicalClock, RowId, TableKey};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handle to the table storing rows with payload `T`.
pub struct Table<T> {
    state: Arc<TableState<T>>,
    history: Arc<History>,
    clock: Arc<LogicalClock>,
    audit_reads: bool,
}

impl<T: Payload> Table<T> {
    pub(crate) fn new(
        state: Arc<TableState<T>>,
        history: Arc<History>,
        clock: Arc<LogicalClock>,
        audit_reads: bool,
    ) -> Self {
        Self {
            state,
            history,
            clock,
            audit_reads,
        }
    }

    /// Returns the table key.
    #[must_use]
    pub fn key(&self) -> TableKey {
        self.state.key
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.state.key.name()
    }

    /// Returns the history this table appends to.
    #[must_use]
    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    /// Returns true if both handles refer to the same table.
    #[must_use]
    pub fn same_table(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Allocates a fresh row id.
    ///
    /// Ids are handed out in strictly increasing order and never reused,
    /// even when the rows using them are removed.
    pub fn next_id(&self) -> CoreResult<RowId> {
        let _admitted = self.history.admit();
        let mut data = self.state.data.lock();
        let before = data.next_id;
        let after = before.checked_add(1).ok_or(CoreError::IdSpaceExhausted {
            table: self.name(),
        })?;
        data.next_id = after;
        self.history
            .push(Arc::new(NextIdEvent::new(Arc::clone(&self.state), before, after)));
        Ok(RowId::new(before))
    }

    /// Builds a row with a freshly allocated id.
    ///
    /// The id allocation is recorded; the row is not stored until added.
    pub fn new_row(&self, payload: T) -> CoreResult<Row<T>> {
        let id = self.next_id()?;
        Ok(self.row(id, payload))
    }

    /// Builds a row with an explicit id.
    ///
    /// Explicit ids do not move the id counter.
    #[must_use]
    pub fn row(&self, id: RowId, payload: T) -> Row<T> {
        Row::new(id, self.clock.tick(), payload)
    }

    /// Builds the replacement of `row` carrying `payload`.
    #[must_use]
    pub fn replacement(&self, row: &Row<T>, payload: T) -> Row<T> {
        row.with_payload(payload, self.clock.tick())
    }

    /// Inserts rows.
    ///
    /// Fails without inserting anything if any id is already stored or
    /// occurs twice in the batch.
    pub fn add(&self, rows: impl IntoIterator<Item = Row<T>>) -> CoreResult<()> {
        let rows: Vec<Row<T>> = rows.into_iter().collect();
        let table = self.name();
        self.change(Action::Add, |map| {
            for row in &rows {
                if map.insert(row.clone()).is_some() {
                    return Err(CoreError::row_already_exists(table, row.id()));
                }
            }
            Ok((rows.clone(), ()))
        })
    }

    /// Inserts rows, replacing any stored rows with the same ids.
    pub fn add_or_replace(&self, rows: impl IntoIterator<Item = Row<T>>) -> CoreResult<()> {
        let rows: Vec<Row<T>> = rows.into_iter().collect();
        self.change(Action::AddOrReplace, |map| {
            for row in &rows {
                map.insert(row.clone());
            }
            Ok((rows.clone(), ()))
        })
    }

    /// Removes rows by id and returns them as they were stored.
    ///
    /// Fails without removing anything if any id is absent.
    pub fn remove(&self, ids: impl IntoIterator<Item = RowId>) -> CoreResult<Vec<Row<T>>> {
        let ids: Vec<RowId> = ids.into_iter().collect();
        let table = self.name();
        self.change(Action::Remove, |map| {
            let removed = map
                .remove_all(&ids)
                .map_err(|id| CoreError::row_not_found(table, id))?;
            Ok((removed.clone(), removed))
        })
    }

    /// Removes the stored rows with the ids of `rows`.
    ///
    /// Fails without removing anything if any id is absent.
    pub fn remove_rows<'a>(&self, rows: impl IntoIterator<Item = &'a Row<T>>) -> CoreResult<()> {
        self.remove(rows.into_iter().map(Row::id)).map(drop)
    }

    /// Overwrites stored rows.
    ///
    /// Fails without changing anything if any id is absent.
    pub fn replace(&self, rows: impl IntoIterator<Item = Row<T>>) -> CoreResult<()> {
        let rows: Vec<Row<T>> = rows.into_iter().collect();
        let table = self.name();
        self.change(Action::Replace, |map| {
            for row in &rows {
                if map.insert(row.clone()).is_none() {
                    return Err(CoreError::row_not_found(table, row.id()));
                }
            }
            Ok((rows.clone(), ()))
        })
    }

    /// Looks up one row.
    pub fn get(&self, id: RowId) -> Option<Row<T>> {
        let _admitted = self.history.admit();
        let data = self.state.data.lock();
        let found = data.rows.get(id).cloned();
        if self.audit_reads {
            self.history.push(Arc::new(RowEvent::new(
                Arc::clone(&self.state),
                id,
                found.clone(),
            )));
        }
        found
    }

    /// Looks up several rows, answering in request order.
    pub fn get_many(&self, ids: impl IntoIterator<Item = RowId>) -> Vec<Option<Row<T>>> {
        let ids: Vec<RowId> = ids.into_iter().collect();
        let _admitted = self.history.admit();
        let data = self.state.data.lock();
        let found: Vec<Option<Row<T>>> = ids.iter().map(|id| data.rows.get(*id).cloned()).collect();
        if self.audit_reads {
            self.history.push(Arc::new(RowsEvent::new(
                Arc::clone(&self.state),
                ids,
                found.clone(),
            )));
        }
        found
    }

    /// Returns the number of stored rows. Records nothing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.data.lock().rows.len()
    }

    /// Returns true if no rows are stored. Records nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.data.lock().rows.is_empty()
    }

    /// Returns the current row map. Records nothing.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        self.state.data.lock().rows.clone()
    }

    /// Returns the id the next `next_id` call would hand out. Records nothing.
    #[must_use]
    pub fn peek_next_id(&self) -> RowId {
        RowId::new(self.state.data.lock().next_id)
    }

    // Runs `apply` on a private copy of the rows; commits the copy and
    // appends one event only if it succeeds.
    fn change<R>(
        &self,
        action: Action,
        apply: impl FnOnce(&mut RowMap<T>) -> CoreResult<(Vec<Row<T>>, R)>,
    ) -> CoreResult<R> {
        let _admitted = self.history.admit();
        let mut data = self.state.data.lock();
        let before = data.rows.clone();
        let mut after = before.clone();

        let (diff, output) = match apply(after.make_mut()) {
            Ok(applied) => applied,
            Err(err) => {
                self.history.stats().record_rejected_batch();
                debug!(table = self.name(), %action, error = %err, "batch rejected");
                return Err(err);
            }
        };

        data.rows = after.clone();
        debug!(
            table = self.name(),
            %action,
            diff = diff.len(),
            rows = after.len(),
            "rows changed"
        );
        self.history.push(Arc::new(ChangeRowsEvent::new(
            Arc::clone(&self.state),
            action,
            before,
            after,
            diff,
        )));
        Ok(output)
    }
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            history: Arc::clone(&self.history),
            clock: Arc::clone(&self.clock),
            audit_reads: self.audit_reads,
        }
    }
}

impl<T> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("state", &self.state)
            .field("audit_reads", &self.audit_reads)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::{Config, Registry};
    use std::collections::HashSet;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct Carrier {
        metadata: u64,
        data: u64,
    }

    fn carrier(data: u64) -> Carrier {
        Carrier { metadata: 1, data }
    }

    fn table() -> (Registry, Table<Carrier>) {
        let registry = Registry::new();
        let table = registry.get_or_create_table::<Carrier>();
        (registry, table)
    }

    #[test]
    fn next_id_is_strictly_increasing() {
        let (_registry, table) = table();
        let ids: Vec<RowId> = (0..5).map(|_| table.next_id().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0], RowId::new(0));
        assert_eq!(table.peek_next_id(), RowId::new(5));
    }

    #[test]
    fn first_row_id_comes_from_config() {
        let registry = Registry::with_config(Config::new().first_row_id(1000));
        let table = registry.get_or_create_table::<Carrier>();
        assert_eq!(table.next_id().unwrap(), RowId::new(1000));
    }

    #[test]
    fn next_id_space_exhausted() {
        let registry = Registry::with_config(Config::new().first_row_id(u64::MAX));
        let table = registry.get_or_create_table::<Carrier>();
        let history_len = registry.history().len();

        assert!(matches!(
            table.next_id(),
            Err(CoreError::IdSpaceExhausted { table: "Carrier" })
        ));
        assert_eq!(registry.history().len(), history_len);
    }

    #[test]
    fn concurrent_next_id_is_distinct() {
        let (_registry, table) = table();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || {
                    (0..100)
                        .map(|_| table.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(table.peek_next_id(), RowId::new(800));
    }

    #[test]
    fn add_then_get() {
        let (_registry, table) = table();
        let row = table.new_row(carrier(1)).unwrap();
        table.add([row.clone()]).unwrap();

        assert_eq!(table.get(row.id()), Some(row));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn add_is_atomic_on_duplicate() {
        let (registry, table) = table();
        table.add([table.row(RowId::new(1), carrier(1))]).unwrap();
        let before = table.snapshot();
        let history_len = registry.history().len();

        let err = table
            .add([
                table.row(RowId::new(1), carrier(10)),
                table.row(RowId::new(2), carrier(2)),
            ])
            .unwrap_err();

        assert!(matches!(err, CoreError::RowAlreadyExists { id: RowId(1), .. }));
        assert_eq!(table.snapshot(), before);
        assert_eq!(registry.history().len(), history_len);
        assert_eq!(registry.history().stats().rejected_batches(), 1);
        assert_eq!(table.get(RowId::new(2)), None);
    }

    #[test]
    fn add_rejects_duplicate_inside_batch() {
        let (_registry, table) = table();
        let err = table
            .add([
                table.row(RowId::new(3), carrier(1)),
                table.row(RowId::new(3), carrier(2)),
            ])
            .unwrap_err();

        assert!(matches!(err, CoreError::RowAlreadyExists { id: RowId(3), .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn explicit_ids_do_not_move_counter() {
        let (_registry, table) = table();
        table.add([table.row(RowId::new(1001), carrier(1))]).unwrap();
        assert_eq!(table.peek_next_id(), RowId::new(0));
    }

    #[test]
    fn add_or_replace_upserts() {
        let (_registry, table) = table();
        let first = table.row(RowId::new(1), carrier(1));
        table.add([first.clone()]).unwrap();

        let updated = table.replacement(&first, carrier(100));
        let fresh = table.row(RowId::new(2), carrier(2));
        table.add_or_replace([updated.clone(), fresh.clone()]).unwrap();

        assert_eq!(table.get(RowId::new(1)), Some(updated));
        assert_eq!(table.get(RowId::new(2)), Some(fresh));
        assert_eq!(table.snapshot().ids(), &[RowId::new(1), RowId::new(2)]);
    }

    #[test]
    fn remove_returns_stored_rows() {
        let (_registry, table) = table();
        let rows = vec![
            table.row(RowId::new(1), carrier(1)),
            table.row(RowId::new(2), carrier(2)),
        ];
        table.add(rows.clone()).unwrap();

        let removed = table.remove([RowId::new(2)]).unwrap();
        assert_eq!(removed, vec![rows[1].clone()]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_is_atomic_on_missing() {
        let (_registry, table) = table();
        let err = table.remove([RowId::new(7)]).unwrap_err();
        assert!(matches!(err, CoreError::RowNotFound { id: RowId(7), .. }));
        assert!(table.is_empty());

        table.add([table.row(RowId::new(1), carrier(1))]).unwrap();
        assert!(table.remove([RowId::new(1), RowId::new(7)]).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_rows_by_value() {
        let (registry, table) = table();
        let row = table.row(RowId::new(4), carrier(4));
        table.add([row.clone()]).unwrap();
        table.remove_rows([&row]).unwrap();

        assert!(table.is_empty());
        let event = registry.history().last().unwrap();
        let change = event.downcast_ref::<ChangeRowsEvent<Carrier>>().unwrap();
        assert_eq!(change.action(), Action::Remove);
        assert_eq!(change.diff_rows(), &[row]);

        assert!(matches!(
            table.remove_rows([&table.row(RowId::new(4), carrier(4))]),
            Err(CoreError::RowNotFound { .. })
        ));
    }

    #[test]
    fn replace_requires_existing_rows() {
        let (_registry, table) = table();
        let row = table.row(RowId::new(1), carrier(1));
        table.add([row.clone()]).unwrap();

        let err = table
            .replace([
                table.replacement(&row, carrier(5)),
                table.row(RowId::new(9), carrier(9)),
            ])
            .unwrap_err();
        assert!(matches!(err, CoreError::RowNotFound { id: RowId(9), .. }));
        assert_eq!(table.get(RowId::new(1)), Some(row.clone()));

        table.replace([table.replacement(&row, carrier(5))]).unwrap();
        assert_eq!(table.get(RowId::new(1)).unwrap().payload(), &carrier(5));
    }

    #[test]
    fn emptied_table_stays_usable() {
        let (registry, table) = table();
        let row = table.new_row(carrier(1)).unwrap();
        table.add([row.clone()]).unwrap();
        table.remove([row.id()]).unwrap();
        assert!(table.is_empty());

        let again = table.new_row(carrier(2)).unwrap();
        assert!(again.id() > row.id());
        table.add([again]).unwrap();
        assert_eq!(registry.table_count(), 1);
    }

    #[test]
    fn get_many_answers_in_order() {
        let (registry, table) = table();
        let row = table.row(RowId::new(2), carrier(2));
        table.add([row.clone()]).unwrap();

        let found = table.get_many([RowId::new(5), RowId::new(2)]);
        assert_eq!(found, vec![None, Some(row)]);

        let event = registry.history().last().unwrap();
        let read = event.downcast_ref::<RowsEvent<Carrier>>().unwrap();
        assert_eq!(read.ids(), &[RowId::new(5), RowId::new(2)]);
        assert!(read.verify());
    }

    #[test]
    fn reads_are_audited() {
        let (registry, table) = table();
        let before = registry.history().len();
        assert_eq!(table.get(RowId::new(1)), None);
        assert_eq!(registry.history().len(), before + 1);
        assert_eq!(registry.history().stats().reads(), 1);

        let event = registry.history().last().unwrap();
        let read = event.downcast_ref::<RowEvent<Carrier>>().unwrap();
        assert!(read.verify());
        assert!(event.undo().is_ok());
        assert!(event.redo().is_ok());

        table.add([table.row(RowId::new(1), carrier(1))]).unwrap();
        assert!(!read.verify());
    }

    #[test]
    fn unaudited_reads_record_nothing() {
        let registry = Registry::with_config(Config::new().audit_reads(false));
        let table = registry.get_or_create_table::<Carrier>();
        let before = registry.history().len();

        table.get(RowId::new(1));
        table.get_many([RowId::new(1), RowId::new(2)]);
        assert_eq!(registry.history().len(), before);
    }

    #[test]
    fn introspection_records_nothing() {
        let (registry, table) = table();
        let before = registry.history().len();
        let _ = (table.len(), table.is_empty(), table.snapshot(), table.peek_next_id());
        assert_eq!(registry.history().len(), before);
    }

    #[test]
    fn every_mutation_appends_one_event() {
        let (registry, table) = table();
        let history = registry.history();
        let start = history.len();

        let row = table.new_row(carrier(1)).unwrap();
        table.add([row.clone()]).unwrap();
        table.replace([table.replacement(&row, carrier(2))]).unwrap();
        table.add_or_replace([table.row(RowId::new(8), carrier(8))]).unwrap();
        table.remove([RowId::new(8)]).unwrap();

        let actions: Vec<Action> = history.events()[start..]
            .iter()
            .map(|e| e.action())
            .collect();
        assert_eq!(
            actions,
            vec![
                Action::NextId,
                Action::Add,
                Action::Replace,
                Action::AddOrReplace,
                Action::Remove
            ]
        );
    }

    #[test]
    fn undo_restores_rows_and_counter() {
        let (registry, table) = table();
        let history = registry.history();
        let start = history.len();
        let empty = table.snapshot();

        let row = table.new_row(carrier(1)).unwrap();
        table.add([row.clone()]).unwrap();
        table.replace([table.replacement(&row, carrier(3))]).unwrap();
        let populated = table.snapshot();

        history.undo_last(history.len() - start).unwrap();
        assert_eq!(table.snapshot(), empty);
        assert_eq!(table.peek_next_id(), RowId::new(0));

        history.redo_from(start).unwrap();
        assert_eq!(table.snapshot(), populated);
        assert_eq!(table.peek_next_id(), RowId::new(1));
    }

    #[test]
    fn undo_out_of_order_is_corruption() {
        let (registry, table) = table();
        let history = registry.history();

        table.add([table.row(RowId::new(1), carrier(1))]).unwrap();
        let add = history.len() - 1;
        table.add([table.row(RowId::new(2), carrier(2))]).unwrap();

        let err = history.undo_at(add).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn redo_of_applied_add_is_corruption() {
        let (registry, table) = table();
        let history = registry.history();

        table.add([table.row(RowId::new(1), carrier(1))]).unwrap();
        let add = history.len() - 1;
        let applied = table.snapshot();

        let err = history.redo_at(add).unwrap_err();
        match err {
            CoreError::HistoryCorruption { phase, action, .. } => {
                assert_eq!(phase, crate::Phase::Redo);
                assert_eq!(action, "add");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.snapshot(), applied);
        assert_eq!(history.stats().corruptions(), 1);
    }

    #[test]
    fn redo_from_live_next_id_halts_immediately() {
        let (registry, table) = table();
        let history = registry.history();

        table.next_id().unwrap();
        let allocation = history.len() - 1;

        let err = history.redo_from(allocation).unwrap_err();
        assert!(err.is_corruption());
        match err {
            CoreError::ReplayHalted { index, applied, source } => {
                assert_eq!(index, allocation);
                assert_eq!(applied, 0);
                assert!(matches!(
                    *source,
                    CoreError::HistoryCorruption {
                        phase: crate::Phase::Redo,
                        action: "next_id",
                        ..
                    }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.peek_next_id(), RowId::new(1));
    }

    #[test]
    fn undo_next_id_after_later_allocation_is_corruption() {
        let (registry, table) = table();
        let history = registry.history();

        table.next_id().unwrap();
        let first = history.len() - 1;
        table.next_id().unwrap();

        let err = history.undo_at(first).unwrap_err();
        assert!(matches!(
            err,
            CoreError::HistoryCorruption {
                phase: crate::Phase::Undo,
                action: "next_id",
                ..
            }
        ));
        assert_eq!(table.peek_next_id(), RowId::new(2));

        history.undo_last(2).unwrap();
        assert_eq!(table.peek_next_id(), RowId::new(0));
    }

    #[test]
    fn handles_share_state() {
        let (registry, table) = table();
        let other = registry.get_or_create_table::<Carrier>();
        assert!(table.same_table(&other));

        table.add([table.row(RowId::new(1), carrier(1))]).unwrap();
        assert_eq!(other.len(), 1);
    }
}
