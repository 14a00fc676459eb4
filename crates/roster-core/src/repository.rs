//! Generic per-aggregate repository bound to one Unit of Work scope.

use std::{marker::PhantomData, sync::Arc};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    errors::{MappingError, RepositoryError},
    mapping::{Aggregate, Field, MappingEntry, Primitive},
    storage::{Precondition, StorageSession},
    unit_of_work::Scope,
};

/// The storage session shared by every repository of one scope.
///
/// Emptied when the scope exits.
pub(crate) type SessionCell = Mutex<Option<Box<dyn StorageSession>>>;

pub(crate) struct RepositoryCore<A: Aggregate> {
    session: Arc<SessionCell>,
    entry: Arc<MappingEntry<A>>,
}

impl<A: Aggregate> RepositoryCore<A> {
    pub(crate) fn new(session: Arc<SessionCell>, entry: Arc<MappingEntry<A>>) -> Self {
        Self { session, entry }
    }
}

fn live(slot: &mut Option<Box<dyn StorageSession>>) -> &mut (dyn StorageSession + 'static) {
    match slot {
        Some(session) => &mut **session,
        None => panic!("repository used after its unit of work scope exited"),
    }
}

/// Add, load, update and delete aggregates of type `A`.
///
/// Obtained from [`Scope::repository`]; every call goes through the scope's
/// single storage session, so writes land or vanish together.
pub struct Repository<'s, A: Aggregate> {
    core: Arc<RepositoryCore<A>>,
    _scope: PhantomData<&'s Scope>,
}

impl<'s, A: Aggregate> Repository<'s, A> {
    pub(crate) fn new(core: Arc<RepositoryCore<A>>) -> Self {
        Self {
            core,
            _scope: PhantomData,
        }
    }

    /// True when both handles are the scope's cached instance.
    pub fn shares_instance_with(&self, other: &Repository<'_, A>) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// Stage a new aggregate and return it as storage will hand it back.
    pub async fn add(&self, aggregate: &A) -> Result<A, RepositoryError> {
        let entry = &self.core.entry;
        let record = entry.to_record(aggregate);

        let mut slot = self.core.session.lock().await;
        live(&mut slot)
            .insert(entry.schema(), record.clone())
            .await
            .map_err(|err| RepositoryError::from_storage(A::NAME, err))?;

        tracing::debug!(aggregate = A::NAME, id = %aggregate.id(), "staged insert");
        Ok(entry.from_record(&record)?)
    }

    pub async fn get_by_id(&self, id: &A::Id) -> Result<A, RepositoryError> {
        let entry = &self.core.entry;
        let key = id.to_primitive();

        let mut slot = self.core.session.lock().await;
        let found = live(&mut slot)
            .fetch(entry.schema(), &key)
            .await
            .map_err(|err| RepositoryError::from_storage(A::NAME, err))?;

        match found {
            Some(record) => Ok(entry.from_record(&record)?),
            None => Err(RepositoryError::NotFound {
                aggregate: A::NAME,
                key: id.to_string(),
            }),
        }
    }

    /// Replace the stored aggregate.
    ///
    /// With a version field the write only succeeds if storage still holds
    /// the version carried by `aggregate`, and the stored version is bumped.
    /// A declared `updated_at` field is stamped with the current time.
    pub async fn update(&self, aggregate: &A) -> Result<A, RepositoryError> {
        let entry = &self.core.entry;
        let schema = entry.schema();
        let mut record = entry.to_record(aggregate);

        let expect = match schema.version {
            Some(field) => {
                let current = match record.value(field) {
                    Primitive::Integer(n) => n,
                    other => {
                        return Err(MappingError::MalformedPrimitive {
                            aggregate: A::NAME,
                            field,
                            reason: format!("version must be an integer, found {}", other.kind()),
                        }
                        .into())
                    }
                };
                record.set(field, Primitive::Integer(current + 1));
                Some(Precondition {
                    field,
                    value: Primitive::Integer(current),
                })
            }
            None => None,
        };
        if let Some(field) = schema.updated_at {
            record.set(field, Primitive::Timestamp(Utc::now()));
        }

        let mut slot = self.core.session.lock().await;
        live(&mut slot)
            .update(schema, record.clone(), expect)
            .await
            .map_err(|err| RepositoryError::from_storage(A::NAME, err))?;

        tracing::debug!(aggregate = A::NAME, id = %aggregate.id(), "staged update");
        Ok(entry.from_record(&record)?)
    }

    /// Remove the aggregate. Deleting something that is not stored is `NotFound`.
    pub async fn delete(&self, aggregate: &A) -> Result<(), RepositoryError> {
        let key = aggregate.id().to_primitive();

        let mut slot = self.core.session.lock().await;
        live(&mut slot)
            .remove(self.core.entry.schema(), &key)
            .await
            .map_err(|err| RepositoryError::from_storage(A::NAME, err))?;

        tracing::debug!(aggregate = A::NAME, id = %aggregate.id(), "staged delete");
        Ok(())
    }
}
