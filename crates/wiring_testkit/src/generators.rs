//! Property-based test generators using proptest.
//!
//! Provides strategies for random table operation sequences over a small
//! id space, so that batches regularly collide with stored rows and fail.

use crate::fixtures::Carrier;
use proptest::prelude::*;
use wiring_core::{CoreError, CoreResult, RowId, Table};

/// Largest explicit id used by generated operations.
pub const MAX_GENERATED_ID: u64 = 8;

/// A table operation on [`Carrier`] rows.
#[derive(Debug, Clone)]
pub enum TableOperation {
    /// Allocate an id.
    NextId,
    /// Insert rows with these ids.
    Add {
        /// Row ids
        ids: Vec<u64>,
        /// Payload discriminator
        version: u64,
    },
    /// Upsert rows with these ids.
    AddOrReplace {
        /// Row ids
        ids: Vec<u64>,
        /// Payload discriminator
        version: u64,
    },
    /// Remove rows by id.
    Remove {
        /// Row ids
        ids: Vec<u64>,
    },
    /// Overwrite rows with these ids.
    Replace {
        /// Row ids
        ids: Vec<u64>,
        /// Payload discriminator
        version: u64,
    },
    /// Read one row.
    Get {
        /// Row id
        id: u64,
    },
    /// Read several rows.
    GetMany {
        /// Row ids
        ids: Vec<u64>,
    },
}

impl TableOperation {
    /// Applies the operation to `table`.
    ///
    /// Usage errors are returned; the caller decides whether they matter.
    pub fn apply(&self, table: &Table<Carrier>) -> CoreResult<()> {
        let rows = |ids: &[u64], version: u64| {
            ids.iter()
                .map(|id| table.row(RowId::new(*id), Carrier::new(version, *id)))
                .collect::<Vec<_>>()
        };
        match self {
            Self::NextId => table.next_id().map(drop),
            Self::Add { ids, version } => table.add(rows(ids, *version)),
            Self::AddOrReplace { ids, version } => table.add_or_replace(rows(ids, *version)),
            Self::Remove { ids } => table.remove(ids.iter().copied().map(RowId::new)).map(drop),
            Self::Replace { ids, version } => table.replace(rows(ids, *version)),
            Self::Get { id } => {
                table.get(RowId::new(*id));
                Ok(())
            }
            Self::GetMany { ids } => {
                table.get_many(ids.iter().copied().map(RowId::new));
                Ok(())
            }
        }
    }

    /// Returns true if the operation can fail with a usage error.
    #[must_use]
    pub fn can_fail(&self) -> bool {
        matches!(
            self,
            Self::Add { .. } | Self::Remove { .. } | Self::Replace { .. }
        )
    }
}

/// Strategy for generating row ids in the shared id space.
pub fn row_id_strategy() -> impl Strategy<Value = u64> {
    0..=MAX_GENERATED_ID
}

/// Strategy for generating id batches.
pub fn id_batch_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(row_id_strategy(), 1..4)
}

/// Strategy for generating table operations.
pub fn table_operation_strategy() -> impl Strategy<Value = TableOperation> {
    prop_oneof![
        1 => Just(TableOperation::NextId),
        3 => (id_batch_strategy(), 0..4u64)
            .prop_map(|(ids, version)| TableOperation::Add { ids, version }),
        2 => (id_batch_strategy(), 0..4u64)
            .prop_map(|(ids, version)| TableOperation::AddOrReplace { ids, version }),
        2 => id_batch_strategy().prop_map(|ids| TableOperation::Remove { ids }),
        2 => (id_batch_strategy(), 0..4u64)
            .prop_map(|(ids, version)| TableOperation::Replace { ids, version }),
        1 => row_id_strategy().prop_map(|id| TableOperation::Get { id }),
        1 => id_batch_strategy().prop_map(|ids| TableOperation::GetMany { ids }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<TableOperation>> {
    prop::collection::vec(table_operation_strategy(), min_ops..max_ops)
}

/// Applies every operation, tolerating usage errors only.
///
/// Returns the number of operations that were rejected.
pub fn apply_all(table: &Table<Carrier>, operations: &[TableOperation]) -> CoreResult<usize> {
    let mut rejected = 0;
    for operation in operations {
        match operation.apply(table) {
            Ok(()) => {}
            Err(CoreError::RowAlreadyExists { .. } | CoreError::RowNotFound { .. }) => rejected += 1,
            Err(err) => return Err(err),
        }
    }
    Ok(rejected)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
