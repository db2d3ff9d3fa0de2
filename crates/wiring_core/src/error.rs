//! Error types for the wiring core.
//!
//! Errors fall into two tiers:
//! - usage errors (`RowAlreadyExists`, `RowNotFound`, ...) are returned to the
//!   caller and always leave the table exactly as it was before the call;
//! - `HistoryCorruption` means a redo/undo found the host in a state other
//!   than the one the event recorded. The causal ordering of the history can
//!   no longer be trusted and the unit of work must be abandoned.

use crate::types::RowId;
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Which tier of the error taxonomy an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Recoverable caller mistake; no state was changed.
    Usage,
    /// Invariant violation detected while replaying or reversing history.
    Corruption,
}

/// Direction of a history traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Re-applying an event.
    Redo,
    /// Reversing an event.
    Undo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redo => f.write_str("redo"),
            Self::Undo => f.write_str("undo"),
        }
    }
}

/// Errors that can occur in wiring core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A row with this id is already stored in the table.
    #[error("cannot add row {id} to table {table}: row already exists")]
    RowAlreadyExists {
        /// Name of the table.
        table: &'static str,
        /// The duplicate row id.
        id: RowId,
    },

    /// No row with this id is stored in the table.
    #[error("no such row {id} in table {table}")]
    RowNotFound {
        /// Name of the table.
        table: &'static str,
        /// The missing row id.
        id: RowId,
    },

    /// The table has handed out every representable id.
    #[error("row id space exhausted for table {table}")]
    IdSpaceExhausted {
        /// Name of the table.
        table: &'static str,
    },

    /// A history index outside of the recorded range.
    #[error("history index {index} out of range (len {len})")]
    EventOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of recorded events.
        len: usize,
    },

    /// More events requested than the history holds.
    #[error("cannot step over {count} events: history holds {len}")]
    CountOutOfRange {
        /// The requested number of events.
        count: usize,
        /// Number of recorded events.
        len: usize,
    },

    /// The host's state does not match the state the event expects.
    #[error("history corruption during {phase} of {action} on {host}: expected {expected}, found {actual}")]
    HistoryCorruption {
        /// Whether the event was being redone or undone.
        phase: Phase,
        /// Action label of the event.
        action: &'static str,
        /// Description of the event host.
        host: String,
        /// Expected host state.
        expected: String,
        /// Actual host state.
        actual: String,
    },

    /// A bulk history traversal stopped at the first failing event.
    #[error("history traversal halted at event {index} after {applied} events: {source}")]
    ReplayHalted {
        /// Index of the event that failed.
        index: usize,
        /// Number of events applied before the failure.
        applied: usize,
        /// The failure.
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates a row already exists error.
    pub fn row_already_exists(table: &'static str, id: RowId) -> Self {
        Self::RowAlreadyExists { table, id }
    }

    /// Creates a row not found error.
    pub fn row_not_found(table: &'static str, id: RowId) -> Self {
        Self::RowNotFound { table, id }
    }

    /// Creates a history corruption error.
    pub fn history_corruption(
        phase: Phase,
        action: &'static str,
        host: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::HistoryCorruption {
            phase,
            action,
            host: host.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an out of range error.
    pub fn event_out_of_range(index: usize, len: usize) -> Self {
        Self::EventOutOfRange { index, len }
    }

    /// Creates a count out of range error.
    pub fn count_out_of_range(count: usize, len: usize) -> Self {
        Self::CountOutOfRange { count, len }
    }

    /// Wraps the failure of a bulk traversal.
    pub fn replay_halted(index: usize, applied: usize, source: CoreError) -> Self {
        Self::ReplayHalted {
            index,
            applied,
            source: Box::new(source),
        }
    }

    /// Returns the tier this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HistoryCorruption { .. } => ErrorKind::Corruption,
            Self::ReplayHalted { source, .. } => source.kind(),
            Self::RowAlreadyExists { .. }
            | Self::RowNotFound { .. }
            | Self::IdSpaceExhausted { .. }
            | Self::EventOutOfRange { .. }
            | Self::CountOutOfRange { .. } => ErrorKind::Usage,
        }
    }

    /// Returns true if the history can no longer be trusted.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        self.kind() == ErrorKind::Corruption
    }
}
