//! Core type definitions for the wiring core.

use serde::Serialize;
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a row within one table.
///
/// Row IDs handed out by a table are monotonically increasing and never
/// reused, even after the row is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowId(pub u64);

impl RowId {
    /// Creates a new row ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row:{}", self.0)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Logical creation stamp of a row.
///
/// Stamps are drawn from a [`LogicalClock`] and only order creation events;
/// they carry no wall-clock meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CreationStamp(pub u64);

impl CreationStamp {
    /// Creates a new stamp.
    #[must_use]
    pub const fn new(stamp: u64) -> Self {
        Self(stamp)
    }

    /// Returns the raw stamp value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CreationStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t:{}", self.0)
    }
}

/// Source of creation stamps shared by every table of a registry.
#[derive(Debug, Default)]
pub struct LogicalClock {
    next: AtomicU64,
}

impl LogicalClock {
    /// Creates a clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh stamp, strictly greater than every earlier one.
    pub fn tick(&self) -> CreationStamp {
        CreationStamp(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns the stamp the next tick will produce.
    #[must_use]
    pub fn peek(&self) -> CreationStamp {
        CreationStamp(self.next.load(Ordering::SeqCst))
    }
}

/// Identity of a table: the payload type it stores.
///
/// Equality and hashing use the type id only; the name is kept for
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TableKey {
    type_id: TypeId,
    name: &'static str,
}

impl TableKey {
    /// Returns the key of the table storing payloads of type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(type_name::<T>()),
        }
    }

    /// Returns the payload type id.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the table name (the unqualified payload type name).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TableKey {}

impl Hash for TableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// "a::b::Carrier" -> "Carrier", "a::Wrapper<b::C>" -> "Wrapper<b::C>"
fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Carrier;
    struct Metadata;

    #[test]
    fn row_id_ordering() {
        let r1 = RowId::new(1);
        let r2 = RowId::new(2);
        assert!(r1 < r2);
        assert_eq!(format!("{r2}"), "row:2");
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = LogicalClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(a < b);
        assert_eq!(clock.peek().as_u64(), b.as_u64() + 1);
    }

    #[test]
    fn table_key_identity() {
        assert_eq!(TableKey::of::<Carrier>(), TableKey::of::<Carrier>());
        assert_ne!(TableKey::of::<Carrier>(), TableKey::of::<Metadata>());
        assert_eq!(TableKey::of::<Carrier>().name(), "Carrier");
    }

    #[test]
    fn short_names() {
        assert_eq!(short_type_name("a::b::Carrier"), "Carrier");
        assert_eq!(short_type_name("u64"), "u64");
        assert_eq!(short_type_name("a::Wrapper<b::C>"), "Wrapper<b::C>");
    }
}
