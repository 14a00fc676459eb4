use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use crate::errors::MappingError;

use super::{Aggregate, Record, RecordSchema, StorageRecord};

/// Conversion table for one aggregate type.
pub struct MappingEntry<A: Aggregate> {
    schema: &'static RecordSchema,
    to_record: fn(&A) -> Record,
    from_record: fn(&Record) -> Result<A, MappingError>,
}

impl<A: Aggregate> MappingEntry<A> {
    fn of<R: StorageRecord<Aggregate = A>>() -> Self {
        Self {
            schema: R::schema(),
            to_record: R::to_record,
            from_record: R::from_record,
        }
    }

    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    pub fn to_record(&self, aggregate: &A) -> Record {
        (self.to_record)(aggregate)
    }

    pub fn from_record(&self, record: &Record) -> Result<A, MappingError> {
        (self.from_record)(record)
    }
}

struct Slot {
    aggregate: &'static str,
    schema: &'static RecordSchema,
    entry: Arc<dyn Any + Send + Sync>,
}

/// Collects mapping entries during startup.
///
/// Nothing reads from a builder; repositories only see the frozen
/// [`MappingRegistry`] returned by [`build`](Self::build).
#[derive(Default)]
pub struct MappingRegistryBuilder {
    slots: HashMap<TypeId, Slot>,
}

impl MappingRegistryBuilder {
    /// Register the storage record for one aggregate type.
    ///
    /// # Panics
    ///
    /// Registering a second record for the same aggregate, or two aggregates
    /// onto the same table, is a wiring bug and aborts startup.
    #[track_caller]
    pub fn register<R: StorageRecord>(mut self) -> Self {
        let aggregate = <R::Aggregate as Aggregate>::NAME;
        let schema = R::schema();
        let type_id = TypeId::of::<R::Aggregate>();

        if let Some(existing) = self.slots.get(&type_id) {
            panic!(
                "storage mapping for {aggregate} registered twice (already mapped to table `{}`)",
                existing.schema.table
            );
        }
        if let Some(clash) = self.slots.values().find(|s| s.schema.table == schema.table) {
            panic!(
                "table `{}` is already mapped to {}; cannot also map {aggregate}",
                schema.table, clash.aggregate
            );
        }
        if !schema.declares(schema.key) {
            panic!(
                "storage record for {aggregate} names key `{}` which is not a declared field",
                schema.key
            );
        }

        tracing::debug!(aggregate, table = schema.table, "registered storage mapping");
        self.slots.insert(
            type_id,
            Slot {
                aggregate,
                schema,
                entry: Arc::new(MappingEntry::<R::Aggregate>::of::<R>()),
            },
        );
        self
    }

    pub fn build(self) -> MappingRegistry {
        MappingRegistry { slots: self.slots }
    }
}

/// Process-wide, read-only table of aggregate ⇄ record mappings.
pub struct MappingRegistry {
    slots: HashMap<TypeId, Slot>,
}

impl MappingRegistry {
    pub fn builder() -> MappingRegistryBuilder {
        MappingRegistryBuilder::default()
    }

    pub fn contains<A: Aggregate>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<A>())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &'static RecordSchema> + '_ {
        self.slots.values().map(|s| s.schema)
    }

    /// Name of the aggregate stored in `table`.
    pub fn aggregate_for_table(&self, table: &str) -> Option<&'static str> {
        self.slots
            .values()
            .find(|s| s.schema.table == table)
            .map(|s| s.aggregate)
    }

    pub fn entry<A: Aggregate>(&self) -> Result<Arc<MappingEntry<A>>, MappingError> {
        self.slots
            .get(&TypeId::of::<A>())
            .and_then(|slot| Arc::clone(&slot.entry).downcast::<MappingEntry<A>>().ok())
            .ok_or(MappingError::NoMappingEntry { aggregate: A::NAME })
    }

    pub fn to_record<A: Aggregate>(&self, aggregate: &A) -> Result<Record, MappingError> {
        Ok(self.entry::<A>()?.to_record(aggregate))
    }

    pub fn from_record<A: Aggregate>(&self, record: &Record) -> Result<A, MappingError> {
        self.entry::<A>()?.from_record(record)
    }
}

impl fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .slots
            .values()
            .map(|s| (s.aggregate, s.schema.table))
            .collect();
        names.sort_unstable();
        f.debug_struct("MappingRegistry")
            .field("entries", &names)
            .finish()
    }
}
