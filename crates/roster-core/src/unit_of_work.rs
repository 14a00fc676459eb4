//! Transaction scopes.
//!
//! A [`UnitOfWork`] runs one closure against one storage session and decides
//! the outcome itself: `Ok` commits, anything else (an `Err`, a panic, or the
//! future being dropped) rolls back. Callers never commit by hand.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use tokio::sync::Mutex as AsyncMutex;

use crate::{
    errors::{RepositoryError, StorageError},
    mapping::{Aggregate, MappingRegistry},
    repository::{Repository, RepositoryCore, SessionCell},
    storage::{SessionFactory, StorageSession},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Inactive,
    Active,
    Committed,
    RolledBack,
}

/// Future returned by the closure given to [`UnitOfWork::run`].
pub type ScopeFuture<'s, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 's>>;

/// Hands out a fresh [`UnitOfWork`] per operation.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    sessions: Arc<dyn SessionFactory>,
    registry: Arc<MappingRegistry>,
}

impl UnitOfWorkFactory {
    pub fn new(sessions: Arc<dyn SessionFactory>, registry: Arc<MappingRegistry>) -> Self {
        Self { sessions, registry }
    }

    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork {
            sessions: Arc::clone(&self.sessions),
            registry: Arc::clone(&self.registry),
            phase: Phase::Inactive,
        }
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }
}

pub struct UnitOfWork {
    sessions: Arc<dyn SessionFactory>,
    registry: Arc<MappingRegistry>,
    phase: Phase,
}

impl UnitOfWork {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run `work` inside a new scope and settle the transaction.
    ///
    /// A failure to open the session leaves the unit of work `Inactive`.
    /// A failed commit is reported through `E` and ends `RolledBack`.
    pub async fn run<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s Scope) -> ScopeFuture<'s, T, E> + Send,
        T: Send,
        E: From<RepositoryError> + Send,
    {
        self.phase = Phase::Inactive;
        let session = self
            .sessions
            .open()
            .await
            .map_err(|err| E::from(RepositoryError::from(err)))?;

        let mut guard = PhaseGuard::enter(&mut self.phase);
        let scope = Scope::new(session, Arc::clone(&self.registry));
        let outcome = work(&scope).await;
        let mut session = scope.exit().await;

        match outcome {
            Ok(value) => match session.commit().await {
                Ok(()) => {
                    // Durable from here on, even if closing is cancelled.
                    guard.settle(Phase::Committed);
                    close(&mut *session).await;
                    Ok(value)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "commit failed; rolling back");
                    discard(&mut *session).await;
                    close(&mut *session).await;
                    guard.settle(Phase::RolledBack);
                    Err(E::from(commit_failure(&self.registry, err)))
                }
            },
            Err(err) => {
                discard(&mut *session).await;
                close(&mut *session).await;
                guard.settle(Phase::RolledBack);
                Err(err)
            }
        }
    }
}

/// Commit-time failures only know the table; name the aggregate stored there.
fn commit_failure(registry: &MappingRegistry, err: StorageError) -> RepositoryError {
    let aggregate = match &err {
        StorageError::UniqueViolation { table, .. }
        | StorageError::MissingRow { table, .. }
        | StorageError::StaleWrite { table, .. } => registry.aggregate_for_table(table),
        StorageError::Closed | StorageError::Backend(_) => None,
    };
    match aggregate {
        Some(aggregate) => RepositoryError::from_storage(aggregate, err),
        None => RepositoryError::from(err),
    }
}

async fn discard(session: &mut dyn StorageSession) {
    if let Err(err) = session.rollback().await {
        tracing::warn!(error = %err, "rollback failed");
    }
}

async fn close(session: &mut dyn StorageSession) {
    if let Err(err) = session.close().await {
        tracing::warn!(error = %err, "closing storage session failed");
    }
}

/// Marks the unit of work `Active` and falls back to `RolledBack` if the
/// scope is abandoned before settling (panic or cancellation).
struct PhaseGuard<'a> {
    phase: &'a mut Phase,
}

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a mut Phase) -> Self {
        *phase = Phase::Active;
        Self { phase }
    }

    fn settle(&mut self, outcome: Phase) {
        *self.phase = outcome;
        tracing::debug!(phase = ?outcome, "unit of work settled");
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if *self.phase == Phase::Active {
            *self.phase = Phase::RolledBack;
            tracing::warn!("unit of work abandoned; uncommitted writes discarded");
        }
    }
}

/// The inside of one unit of work. Hands out repositories that share its session.
pub struct Scope {
    session: Arc<SessionCell>,
    registry: Arc<MappingRegistry>,
    repositories: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Scope {
    fn new(session: Box<dyn StorageSession>, registry: Arc<MappingRegistry>) -> Self {
        Self {
            session: Arc::new(AsyncMutex::new(Some(session))),
            registry,
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// The scope's repository for `A`, created on first use.
    ///
    /// # Panics
    ///
    /// If no storage record is registered for `A`.
    #[track_caller]
    pub fn repository<A: Aggregate>(&self) -> Repository<'_, A> {
        let mut cache = self
            .repositories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let cached = cache
            .get(&TypeId::of::<A>())
            .and_then(|any| Arc::clone(any).downcast::<RepositoryCore<A>>().ok());
        if let Some(core) = cached {
            return Repository::new(core);
        }

        let entry = match self.registry.entry::<A>() {
            Ok(entry) => entry,
            Err(err) => panic!("cannot build a repository: {err}"),
        };
        let core = Arc::new(RepositoryCore::new(Arc::clone(&self.session), entry));
        cache.insert(TypeId::of::<A>(), core.clone());
        Repository::new(core)
    }

    /// Take the session back; later repository calls panic.
    async fn exit(self) -> Box<dyn StorageSession> {
        let taken = self.session.lock().await.take();
        match taken {
            Some(session) => session,
            None => unreachable!("scope session taken twice"),
        }
    }
}
