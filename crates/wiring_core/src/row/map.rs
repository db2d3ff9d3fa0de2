//! Insertion-ordered row maps and their copy-on-write snapshots.

use crate::row::Row;
use crate::types::RowId;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Rows of one table keyed by id, iterated in insertion order.
///
/// Replacing a row keeps its position; removing and re-adding moves it to
/// the end.
pub struct RowMap<T> {
    order: Vec<RowId>,
    rows: HashMap<RowId, Row<T>>,
}

impl<T> RowMap<T> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the map holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the row stored under `id`.
    #[must_use]
    pub fn get(&self, id: RowId) -> Option<&Row<T>> {
        self.rows.get(&id)
    }

    /// Returns true if a row is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: RowId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Iterates over the rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Row<T>> + '_ {
        self.order.iter().filter_map(move |id| self.rows.get(id))
    }

    /// Returns the ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[RowId] {
        &self.order
    }

    /// Stores `row` under its own id, returning the row it displaced.
    pub(crate) fn insert(&mut self, row: Row<T>) -> Option<Row<T>> {
        let id = row.id();
        let previous = self.rows.insert(id, row);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    /// Removes the rows stored under `ids`, in the order given.
    ///
    /// Stops at the first id with no stored row and returns it. The map is
    /// left partially updated in that case; callers work on a copy.
    pub(crate) fn remove_all(&mut self, ids: &[RowId]) -> Result<Vec<Row<T>>, RowId> {
        let mut removed = Vec::with_capacity(ids.len());
        let mut missing = None;
        for id in ids {
            match self.rows.remove(id) {
                Some(row) => removed.push(row),
                None => {
                    missing = Some(*id);
                    break;
                }
            }
        }
        let rows = &self.rows;
        self.order.retain(|id| rows.contains_key(id));
        match missing {
            Some(id) => Err(id),
            None => Ok(removed),
        }
    }

    /// Short description for diagnostics: the row count and leading ids.
    #[must_use]
    pub fn describe(&self) -> String {
        const SHOWN: usize = 8;
        let mut ids: Vec<String> = self.order.iter().take(SHOWN).map(|id| id.0.to_string()).collect();
        if self.order.len() > SHOWN {
            ids.push("..".to_string());
        }
        format!("{} rows [{}]", self.order.len(), ids.join(", "))
    }
}

impl<T> Default for RowMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RowMap<T> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            rows: self.rows.clone(),
        }
    }
}

/// Map equality: same ids with equal rows, independent of order.
impl<T: PartialEq> PartialEq for RowMap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .rows
                .iter()
                .all(|(id, row)| other.rows.get(id).is_some_and(|theirs| theirs == row))
    }
}

impl<T: fmt::Debug> fmt::Debug for RowMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|row| (row.id(), row.payload())))
            .finish()
    }
}

/// An immutable, shareable copy of a table's row map.
///
/// Snapshots are cheap to take: they share the map with the table until the
/// table next mutates, at which point the table copies it.
pub struct Snapshot<T>(Arc<RowMap<T>>);

impl<T> Snapshot<T> {
    /// Creates a snapshot of an empty map.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::new(RowMap::new()))
    }

    /// Returns true if both snapshots share the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns a mutable map, copying it first if other snapshots share it.
    pub(crate) fn make_mut(&mut self) -> &mut RowMap<T> {
        Arc::make_mut(&mut self.0)
    }
}

impl<T> From<RowMap<T>> for Snapshot<T> {
    fn from(map: RowMap<T>) -> Self {
        Self(Arc::new(map))
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = RowMap<T>;

    fn deref(&self) -> &RowMap<T> {
        &self.0
    }
}

impl<T: PartialEq> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CreationStamp;

    fn row(id: u64, value: &'static str) -> Row<&'static str> {
        Row::new(RowId::new(id), CreationStamp::new(id), value)
    }

    #[test]
    fn preserves_insertion_order() {
        let mut map = RowMap::new();
        map.insert(row(5, "a"));
        map.insert(row(1, "b"));
        map.insert(row(3, "c"));

        let ids: Vec<u64> = map.iter().map(|r| r.id().as_u64()).collect();
        assert_eq!(ids, vec![5, 1, 3]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut map = RowMap::new();
        map.insert(row(1, "a"));
        map.insert(row(2, "b"));

        let previous = map.insert(row(1, "z"));
        assert_eq!(previous.map(|r| *r.payload()), Some("a"));
        assert_eq!(map.ids(), &[RowId::new(1), RowId::new(2)]);
        assert_eq!(map.get(RowId::new(1)).map(|r| *r.payload()), Some("z"));
    }

    #[test]
    fn remove_drops_from_order() {
        let mut map = RowMap::new();
        map.insert(row(1, "a"));
        map.insert(row(2, "b"));

        assert!(map.remove_all(&[RowId::new(1)]).is_ok());
        assert!(map.remove_all(&[RowId::new(1)]).is_err());
        assert_eq!(map.ids(), &[RowId::new(2)]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_all_keeps_survivor_order() {
        let mut map = RowMap::new();
        for id in 1..=5 {
            map.insert(row(id, "x"));
        }

        let removed = map.remove_all(&[RowId::new(4), RowId::new(2)]).unwrap();
        let removed: Vec<u64> = removed.iter().map(|r| r.id().as_u64()).collect();
        assert_eq!(removed, vec![4, 2]);
        assert_eq!(map.ids(), &[RowId::new(1), RowId::new(3), RowId::new(5)]);

        assert_eq!(map.remove_all(&[RowId::new(1), RowId::new(1)]), Err(RowId::new(1)));
        assert_eq!(map.ids(), &[RowId::new(3), RowId::new(5)]);
    }

    #[test]
    fn equality_ignores_order() {
        let mut a = RowMap::new();
        a.insert(row(1, "a"));
        a.insert(row(2, "b"));

        let mut b = RowMap::new();
        b.insert(row(2, "b"));
        b.insert(row(1, "a"));

        assert_eq!(a, b);

        b.insert(row(2, "x"));
        assert_ne!(a, b);
    }

    #[test]
    fn snapshot_is_copy_on_write() {
        let mut live: Snapshot<&'static str> = Snapshot::empty();
        live.make_mut().insert(row(1, "a"));

        let frozen = live.clone();
        assert!(frozen.ptr_eq(&live));

        live.make_mut().insert(row(2, "b"));
        assert!(!frozen.ptr_eq(&live));
        assert_eq!(frozen.len(), 1);
        assert_eq!(live.len(), 2);
    }

    #[test]
    fn describe_truncates() {
        let mut map = RowMap::new();
        for id in 0..10 {
            map.insert(row(id, "x"));
        }
        assert_eq!(map.describe(), "10 rows [0, 1, 2, 3, 4, 5, 6, 7, ..]");
    }
}
