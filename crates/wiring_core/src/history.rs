//! The shared, append-only event log.
//!
//! ## Locking
//!
//! The history owns two locks:
//!
//! - the *gate*, an `RwLock<()>`. Every table or registry operation holds
//!   it shared for the whole of "mutate + snapshot + append". Bulk
//!   traversals (`undo_last`, `redo_from`, ...) hold it exclusively, so no
//!   event can be appended while they run and no mutation is half done.
//! - the *log*, a `Mutex<Vec<..>>`. It is a leaf lock: nothing else is
//!   acquired while it is held.
//!
//! Acquisition order across the crate is gate -> registry -> table -> log.

use crate::config::Config;
use crate::error::{CoreError, CoreResult, Phase};
use crate::event::{Event, EventRecord};
use crate::stats::HistoryStats;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, trace};

/// The ordered record of every event a registry and its tables produced.
pub struct History {
    gate: RwLock<()>,
    log: Mutex<Vec<Arc<dyn Event>>>,
    stats: HistoryStats,
}

impl History {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::with_capacity(Config::default().history_capacity)
    }

    /// Creates an empty history with room for `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            gate: RwLock::new(()),
            log: Mutex::new(Vec::with_capacity(capacity)),
            stats: HistoryStats::new(),
        }
    }

    /// Admits one mutating operation; held until its event is appended.
    pub(crate) fn admit(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read()
    }

    /// Appends an event; the caller must hold an admission guard.
    pub(crate) fn push(&self, event: Arc<dyn Event>) -> usize {
        self.stats.record_append(event.action().is_read());
        let mut log = self.log.lock();
        let index = log.len();
        trace!(index, action = %event.action(), host = %event.host(), "event appended");
        log.push(event);
        index
    }

    /// Appends an event to the end of the history and returns its index.
    pub fn append(&self, event: Arc<dyn Event>) -> usize {
        let _admitted = self.admit();
        self.push(event)
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Returns the event at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<dyn Event>> {
        self.log.lock().get(index).cloned()
    }

    /// Returns the most recent event.
    pub fn last(&self) -> Option<Arc<dyn Event>> {
        self.log.lock().last().cloned()
    }

    /// Returns every recorded event, oldest first.
    pub fn events(&self) -> Vec<Arc<dyn Event>> {
        self.log.lock().clone()
    }

    /// Returns the audit records of every event, oldest first.
    pub fn records(&self) -> Vec<EventRecord> {
        self.events()
            .iter()
            .enumerate()
            .map(|(index, event)| EventRecord::new(index, event.as_ref()))
            .collect()
    }

    /// Returns the history counters.
    pub fn stats(&self) -> &HistoryStats {
        &self.stats
    }

    /// Undoes the event at `index`.
    pub fn undo_at(&self, index: usize) -> CoreResult<()> {
        let _quiesced = self.gate.write();
        let event = self.event_at(index)?;
        self.step(index, event.as_ref(), Phase::Undo)
    }

    /// Redoes the event at `index`.
    pub fn redo_at(&self, index: usize) -> CoreResult<()> {
        let _quiesced = self.gate.write();
        let event = self.event_at(index)?;
        self.step(index, event.as_ref(), Phase::Redo)
    }

    /// Undoes the last `count` events, newest first.
    ///
    /// Stops at the first failure and returns it wrapped in
    /// [`CoreError::ReplayHalted`]; events undone before the failure stay
    /// undone.
    pub fn undo_last(&self, count: usize) -> CoreResult<()> {
        let _quiesced = self.gate.write();
        let events = self.log.lock().clone();
        if count > events.len() {
            return Err(CoreError::count_out_of_range(count, events.len()));
        }

        let start = events.len() - count;
        info!(count, start, "undoing history tail");
        for (applied, index) in (start..events.len()).rev().enumerate() {
            self.step(index, events[index].as_ref(), Phase::Undo)
                .map_err(|err| CoreError::replay_halted(index, applied, err))?;
        }
        Ok(())
    }

    /// Redoes every event from `index` to the end, oldest first.
    ///
    /// Stops at the first failure like [`History::undo_last`].
    pub fn redo_from(&self, index: usize) -> CoreResult<()> {
        let _quiesced = self.gate.write();
        let events = self.log.lock().clone();
        if index > events.len() {
            return Err(CoreError::event_out_of_range(index, events.len()));
        }

        info!(from = index, count = events.len() - index, "redoing history");
        for (applied, position) in (index..events.len()).enumerate() {
            self.step(position, events[position].as_ref(), Phase::Redo)
                .map_err(|err| CoreError::replay_halted(position, applied, err))?;
        }
        Ok(())
    }

    /// Undoes every recorded event, newest first.
    pub fn undo_all(&self) -> CoreResult<()> {
        let _quiesced = self.gate.write();
        let events = self.log.lock().clone();
        info!(count = events.len(), "undoing entire history");
        for (applied, index) in (0..events.len()).rev().enumerate() {
            self.step(index, events[index].as_ref(), Phase::Undo)
                .map_err(|err| CoreError::replay_halted(index, applied, err))?;
        }
        Ok(())
    }

    fn event_at(&self, index: usize) -> CoreResult<Arc<dyn Event>> {
        let log = self.log.lock();
        log.get(index)
            .cloned()
            .ok_or_else(|| CoreError::event_out_of_range(index, log.len()))
    }

    fn step(&self, index: usize, event: &dyn Event, phase: Phase) -> CoreResult<()> {
        let result = match phase {
            Phase::Undo => event.undo(),
            Phase::Redo => event.redo(),
        };
        match &result {
            Ok(()) => match phase {
                Phase::Undo => self.stats.record_undo(),
                Phase::Redo => self.stats.record_redo(),
            },
            Err(err) => {
                if err.is_corruption() {
                    self.stats.record_corruption();
                }
                error!(index, %phase, action = %event.action(), "history step failed");
            }
        }
        result
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("len", &self.len())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
