//! Test fixtures: wiring payload types and registry helpers.
//!
//! The payloads mirror a small circuit schema. Cross-row references are
//! plain ids; nothing checks them.

use serde::Serialize;
use wiring_core::{Config, Registry};

/// A value moving along a wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Carrier {
    /// Id of the carrier's metadata row.
    pub metadata_id: u64,
    /// Id of the carried data row.
    pub data_id: u64,
}

impl Carrier {
    /// Creates a carrier.
    pub fn new(metadata_id: u64, data_id: u64) -> Self {
        Self {
            metadata_id,
            data_id,
        }
    }
}

/// A name/value label attached to metadata.
///
/// A tag without a value is a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Tag value.
    pub value: Option<String>,
}

impl Tag {
    /// Creates a flag tag.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Creates a valued tag.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Name and tags of another row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Id of the enclosing namespace row.
    pub namespace_id: u64,
    /// Name within the namespace.
    pub name: String,
    /// Tags, in insertion order.
    pub tags: Vec<Tag>,
}

impl Metadata {
    /// Creates untagged metadata.
    pub fn new(namespace_id: u64, name: impl Into<String>) -> Self {
        Self {
            namespace_id,
            name: name.into(),
            tags: Vec::new(),
        }
    }

    /// Returns a copy with `tag` added, replacing any tag of the same name.
    #[must_use]
    pub fn tagged(&self, tag: Tag) -> Self {
        let mut tags: Vec<Tag> = self
            .tags
            .iter()
            .filter(|existing| existing.name != tag.name)
            .cloned()
            .collect();
        tags.push(tag);
        Self {
            namespace_id: self.namespace_id,
            name: self.name.clone(),
            tags,
        }
    }
}

/// A named scope for metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    /// Namespace name.
    pub name: String,
    /// Id of the namespace's own metadata row.
    pub metadata_id: u64,
}

/// A typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Data {
    /// Id of the value's type row.
    pub type_id: u64,
    /// The value.
    pub value: serde_json::Value,
}

/// A value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Type {
    /// Id of the type's metadata row.
    pub metadata_id: u64,
    /// Name of the instance type.
    pub instance: String,
}

/// Links a carrier to a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarrierState {
    /// Id of the carrier row.
    pub carrier_id: u64,
    /// Id of the state row.
    pub state_id: u64,
}

/// A connection between chip legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wire {
    /// Id of the wire's metadata row.
    pub metadata_id: u64,
    /// Id of the bundle the wire belongs to.
    pub wire_bundle_id: u64,
    /// Id of the chip leg the wire is attached to.
    pub chip_leg_id: u64,
    /// Id of the queue of carriers on the wire.
    pub wire_queue_id: u64,
}

/// Ordered carriers waiting on a wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireQueue {
    /// Id of the queue's metadata row.
    pub metadata_id: u64,
    /// Carrier ids, oldest first.
    pub carrier_ids: Vec<u64>,
}

impl WireQueue {
    /// Creates an empty queue.
    pub fn new(metadata_id: u64) -> Self {
        Self {
            metadata_id,
            carrier_ids: Vec::new(),
        }
    }

    /// Returns a copy with `carrier_ids` appended.
    #[must_use]
    pub fn pushed(&self, carrier_ids: &[u64]) -> Self {
        let mut ids = self.carrier_ids.clone();
        ids.extend_from_slice(carrier_ids);
        Self {
            metadata_id: self.metadata_id,
            carrier_ids: ids,
        }
    }

    /// Returns a copy without its oldest carrier, and that carrier's id.
    #[must_use]
    pub fn popped(&self) -> (Self, Option<u64>) {
        let mut ids = self.carrier_ids.clone();
        let first = if ids.is_empty() {
            None
        } else {
            Some(ids.remove(0))
        };
        let queue = Self {
            metadata_id: self.metadata_id,
            carrier_ids: ids,
        };
        (queue, first)
    }
}

/// Runs a test against a fresh registry with the default configuration.
pub fn with_registry<F, R>(f: F) -> R
where
    F: FnOnce(&Registry) -> R,
{
    let registry = Registry::new();
    f(&registry)
}

/// Runs a test against a fresh registry that does not record reads.
pub fn with_quiet_registry<F, R>(f: F) -> R
where
    F: FnOnce(&Registry) -> R,
{
    let registry = Registry::with_config(Config::new().audit_reads(false));
    f(&registry)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use wiring_core::{CoreResult, Row, RowId};

    /// Rows created by [`small_circuit`].
    #[derive(Debug, Clone)]
    pub struct SmallCircuit {
        /// The root namespace.
        pub namespace: Row<Namespace>,
        /// Metadata rows: namespace, carrier type, wire.
        pub metadata: Vec<Row<Metadata>>,
        /// The carrier's value type.
        pub data_type: Row<Type>,
        /// The carried value.
        pub data: Row<Data>,
        /// The carrier.
        pub carrier: Row<Carrier>,
        /// The wire's queue, holding the carrier.
        pub queue: Row<WireQueue>,
        /// The wire.
        pub wire: Row<Wire>,
    }

    /// Populates `registry` with one carrier queued on one wire.
    pub fn small_circuit(registry: &Registry) -> CoreResult<SmallCircuit> {
        let namespaces = registry.get_or_create_table::<Namespace>();
        let metadata = registry.get_or_create_table::<Metadata>();
        let types = registry.get_or_create_table::<Type>();
        let data = registry.get_or_create_table::<Data>();
        let carriers = registry.get_or_create_table::<Carrier>();
        let queues = registry.get_or_create_table::<WireQueue>();
        let wires = registry.get_or_create_table::<Wire>();

        let root_meta = metadata.new_row(Metadata::new(0, "root"))?;
        let namespace = namespaces.new_row(Namespace {
            name: "root".to_string(),
            metadata_id: root_meta.id().as_u64(),
        })?;
        let ns = namespace.id().as_u64();
        let type_meta = metadata.new_row(Metadata::new(ns, "int").tagged(Tag::flag("primitive")))?;
        let wire_meta = metadata.new_row(
            Metadata::new(ns, "w1").tagged(Tag::with_value("colour", "red")),
        )?;
        let data_type = types.new_row(Type {
            metadata_id: type_meta.id().as_u64(),
            instance: "i64".to_string(),
        })?;
        let value = data.new_row(Data {
            type_id: data_type.id().as_u64(),
            value: serde_json::json!(42),
        })?;
        let carrier = carriers.new_row(Carrier::new(type_meta.id().as_u64(), value.id().as_u64()))?;
        let queue = queues.new_row(
            WireQueue::new(wire_meta.id().as_u64()).pushed(&[carrier.id().as_u64()]),
        )?;
        let wire = wires.new_row(Wire {
            metadata_id: wire_meta.id().as_u64(),
            wire_bundle_id: 0,
            chip_leg_id: 0,
            wire_queue_id: queue.id().as_u64(),
        })?;

        let meta_rows = vec![root_meta, type_meta, wire_meta];
        metadata.add(meta_rows.clone())?;
        namespaces.add([namespace.clone()])?;
        types.add([data_type.clone()])?;
        data.add([value.clone()])?;
        carriers.add([carrier.clone()])?;
        queues.add([queue.clone()])?;
        wires.add([wire.clone()])?;

        Ok(SmallCircuit {
            namespace,
            metadata: meta_rows,
            data_type,
            data: value,
            carrier,
            queue,
            wire,
        })
    }

    /// Adds `count` carriers with consecutive explicit ids starting at `first`.
    pub fn carriers(registry: &Registry, first: u64, count: u64) -> CoreResult<Vec<Row<Carrier>>> {
        let table = registry.get_or_create_table::<Carrier>();
        let rows: Vec<Row<Carrier>> = (first..first + count)
            .map(|id| table.row(RowId::new(id), Carrier::new(1, id)))
            .collect();
        table.add(rows.clone())?;
        Ok(rows)
    }
}
