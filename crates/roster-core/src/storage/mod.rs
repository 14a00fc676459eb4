//! Storage port.
//!
//! A [`SessionFactory`] opens transactional [`StorageSession`]s. Sessions
//! speak records only; they never see aggregates.

pub mod memory;

use async_trait::async_trait;

use crate::{
    errors::StorageError,
    mapping::{Primitive, Record, RecordSchema},
};

pub use memory::{MemorySession, MemoryStore, Snapshot};

/// Expected value of one field at write time (optimistic locking).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Precondition {
    pub field: &'static str,
    pub value: Primitive,
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn StorageSession>, StorageError>;
}

/// One transaction against the backing store.
///
/// Writes stay invisible to other sessions until [`commit`](Self::commit).
/// Dropping a session without committing discards its writes.
#[async_trait]
pub trait StorageSession: Send {
    /// Stage a new row. The key is read from `schema.key`.
    async fn insert(
        &mut self,
        schema: &'static RecordSchema,
        record: Record,
    ) -> Result<(), StorageError>;

    async fn fetch(
        &mut self,
        schema: &'static RecordSchema,
        key: &Primitive,
    ) -> Result<Option<Record>, StorageError>;

    /// Replace an existing row, optionally only if `expect` still holds.
    async fn update(
        &mut self,
        schema: &'static RecordSchema,
        record: Record,
        expect: Option<Precondition>,
    ) -> Result<(), StorageError>;

    async fn remove(
        &mut self,
        schema: &'static RecordSchema,
        key: &Primitive,
    ) -> Result<(), StorageError>;

    async fn commit(&mut self) -> Result<(), StorageError>;

    async fn rollback(&mut self) -> Result<(), StorageError>;

    /// Release the session. Every later call fails with [`StorageError::Closed`].
    async fn close(&mut self) -> Result<(), StorageError>;
}
