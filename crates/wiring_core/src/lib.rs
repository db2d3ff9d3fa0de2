//! # Wiring Core
//!
//! Typed in-memory tables with a reversible, append-only mutation history.
//!
//! This crate provides:
//! - A [`Registry`] of tables, one per payload type, created on first use
//! - [`Table`] handles with monotonic id allocation and all-or-nothing
//!   batch mutations
//! - A shared [`History`] recording one [`Event`] per operation, any of
//!   which can later be undone or redone
//!
//! ## Replay Guarantees
//!
//! - Every event holds the complete state of its host before and after
//! - `redo`/`undo` apply only if the host is in the matching state and
//!   fail with [`CoreError::HistoryCorruption`] otherwise
//! - Bulk traversals of the history never interleave with new events
//!
//! ## Example
//!
//! ```rust
//! use wiring_core::Registry;
//!
//! #[derive(Debug, PartialEq)]
//! struct Carrier {
//!     metadata: u64,
//!     data: u64,
//! }
//!
//! let registry = Registry::new();
//! let carriers = registry.get_or_create_table::<Carrier>();
//!
//! let row = carriers.new_row(Carrier { metadata: 1, data: 1 }).unwrap();
//! carriers.add([row.clone()]).unwrap();
//! assert_eq!(carriers.len(), 1);
//!
//! // Undo the add and the id allocation.
//! let history = registry.history();
//! history.undo_last(2).unwrap();
//! assert!(carriers.is_empty());
//! assert_eq!(carriers.peek_next_id(), row.id());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod event;
mod history;
mod registry;
mod row;
mod stats;
mod table;
mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult, ErrorKind, Phase};
pub use event::{
    Action, ChangeRowsEvent, Event, EventRecord, Host, NextIdEvent, RowEvent, RowsEvent,
};
pub use history::History;
pub use registry::{Registry, TableCreatedEvent, TableSummary};
pub use row::{Payload, Row, RowMap, Snapshot};
pub use stats::{HistoryStats, StatsSnapshot};
pub use table::Table;
pub use types::{CreationStamp, LogicalClock, RowId, TableKey};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
