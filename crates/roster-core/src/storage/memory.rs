use std::{
    collections::BTreeMap,
    future::Future,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    errors::StorageError,
    mapping::{Primitive, Record, RecordSchema},
};

use super::{Precondition, SessionFactory, StorageSession};

/// Committed contents of a store: table name → key → record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SnapshotRepr", from = "SnapshotRepr")]
pub struct Snapshot {
    tables: BTreeMap<String, BTreeMap<Primitive, Record>>,
}

impl Snapshot {
    pub fn row(&self, table: &str, key: &Primitive) -> Option<&Record> {
        self.tables.get(table).and_then(|rows| rows.get(key))
    }

    pub fn table_len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty)
    }

    fn apply(&mut self, change: &Change) -> Result<(), StorageError> {
        match change {
            Change::Insert { schema, record } => {
                let key = record.value(schema.key);
                let rows = self.tables.entry(schema.table.to_string()).or_default();
                if rows.contains_key(&key) {
                    return Err(StorageError::UniqueViolation {
                        table: schema.table,
                        field: schema.key,
                    });
                }
                check_unique(schema, rows, &key, record)?;
                rows.insert(key, record.clone());
            }
            Change::Update {
                schema,
                record,
                expect,
            } => {
                let key = record.value(schema.key);
                let rows = self.tables.entry(schema.table.to_string()).or_default();
                let Some(current) = rows.get(&key) else {
                    return Err(missing(schema, &key));
                };
                if let Some(expect) = expect {
                    if current.value(expect.field) != expect.value {
                        return Err(StorageError::StaleWrite {
                            table: schema.table,
                            key: key.to_string(),
                        });
                    }
                }
                check_unique(schema, rows, &key, record)?;
                rows.insert(key, record.clone());
            }
            Change::Remove { schema, key } => {
                let removed = self
                    .tables
                    .get_mut(schema.table)
                    .and_then(|rows| rows.remove(key));
                if removed.is_none() {
                    return Err(missing(schema, key));
                }
            }
        }
        Ok(())
    }
}

fn missing(schema: &RecordSchema, key: &Primitive) -> StorageError {
    StorageError::MissingRow {
        table: schema.table,
        key: key.to_string(),
    }
}

/// Null values never collide.
fn check_unique(
    schema: &'static RecordSchema,
    rows: &BTreeMap<Primitive, Record>,
    key: &Primitive,
    record: &Record,
) -> Result<(), StorageError> {
    for field in schema.unique_fields() {
        let value = record.value(field);
        if value.is_null() {
            continue;
        }
        let taken = rows
            .iter()
            .any(|(other, row)| other != key && row.value(field) == value);
        if taken {
            return Err(StorageError::UniqueViolation {
                table: schema.table,
                field,
            });
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct Row {
    key: Primitive,
    record: Record,
}

/// JSON objects only allow string keys, so rows are stored as a list.
#[derive(Serialize, Deserialize)]
struct SnapshotRepr {
    tables: BTreeMap<String, Vec<Row>>,
}

impl From<Snapshot> for SnapshotRepr {
    fn from(snapshot: Snapshot) -> Self {
        let tables = snapshot
            .tables
            .into_iter()
            .map(|(table, rows)| {
                let rows = rows
                    .into_iter()
                    .map(|(key, record)| Row { key, record })
                    .collect();
                (table, rows)
            })
            .collect();
        Self { tables }
    }
}

impl From<SnapshotRepr> for Snapshot {
    fn from(repr: SnapshotRepr) -> Self {
        let tables = repr
            .tables
            .into_iter()
            .map(|(table, rows)| {
                let rows = rows.into_iter().map(|row| (row.key, row.record)).collect();
                (table, rows)
            })
            .collect();
        Self { tables }
    }
}

enum Change {
    Insert {
        schema: &'static RecordSchema,
        record: Record,
    },
    Update {
        schema: &'static RecordSchema,
        record: Record,
        expect: Option<Precondition>,
    },
    Remove {
        schema: &'static RecordSchema,
        key: Primitive,
    },
}

/// Process-local store. Clones share the same committed state.
///
/// The committed snapshot is shared copy-on-write: opening a session costs a
/// pointer copy, and the first staged write clones it. Commits take turns on
/// `gate`, so persisting never happens under the state lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    committed: Arc<RwLock<Arc<Snapshot>>>,
    gate: Arc<AsyncMutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            committed: Arc::new(RwLock::new(Arc::new(snapshot))),
            gate: Arc::default(),
        }
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> Result<Snapshot, StorageError> {
        Ok(Snapshot::clone(&*latest(&self.committed)?))
    }

    pub fn session(&self) -> Result<MemorySession, StorageError> {
        let base = latest(&self.committed)?;
        Ok(MemorySession {
            committed: Arc::clone(&self.committed),
            gate: Arc::clone(&self.gate),
            working: Arc::clone(&base),
            base,
            staged: Vec::new(),
            closed: false,
        })
    }
}

#[async_trait]
impl SessionFactory for MemoryStore {
    async fn open(&self) -> Result<Box<dyn StorageSession>, StorageError> {
        Ok(Box::new(self.session()?))
    }
}

fn latest(committed: &RwLock<Arc<Snapshot>>) -> Result<Arc<Snapshot>, StorageError> {
    let guard = committed.read().map_err(|_| poisoned())?;
    Ok(Arc::clone(&guard))
}

fn poisoned() -> StorageError {
    StorageError::Backend("memory store lock poisoned".to_string())
}

/// A session over a private working copy.
///
/// Every write is validated against the working copy and staged. Commit
/// replays the staged writes on the latest committed state, so a concurrent
/// session that committed first can still make this commit fail.
pub struct MemorySession {
    committed: Arc<RwLock<Arc<Snapshot>>>,
    gate: Arc<AsyncMutex<()>>,
    /// Committed state this session last synchronised with.
    base: Arc<Snapshot>,
    /// `base` plus the staged writes.
    working: Arc<Snapshot>,
    staged: Vec<Change>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    fn stage(&mut self, change: Change) -> Result<(), StorageError> {
        self.ensure_open()?;
        Arc::make_mut(&mut self.working).apply(&change)?;
        self.staged.push(change);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    /// Commit, awaiting `persist` on the new state before it becomes visible.
    ///
    /// Commits that staged nothing skip `persist`. If `persist` fails nothing
    /// is published and the staged writes are kept.
    pub async fn commit_with<F, Fut>(&mut self, persist: F) -> Result<(), StorageError>
    where
        F: FnOnce(Arc<Snapshot>) -> Fut + Send,
        Fut: Future<Output = Result<(), StorageError>> + Send,
    {
        self.ensure_open()?;
        if self.staged.is_empty() {
            return Ok(());
        }

        let gate = Arc::clone(&self.gate);
        let _turn = gate.lock().await;

        let current = latest(&self.committed)?;
        let next = if Arc::ptr_eq(&current, &self.base) {
            Arc::clone(&self.working)
        } else {
            let mut next = Snapshot::clone(&current);
            for change in &self.staged {
                next.apply(change)?;
            }
            Arc::new(next)
        };

        persist(Arc::clone(&next)).await?;
        *self.committed.write().map_err(|_| poisoned())? = Arc::clone(&next);

        tracing::debug!(writes = self.staged.len(), "memory session committed");
        self.staged.clear();
        self.base = Arc::clone(&next);
        self.working = next;
        Ok(())
    }

    pub fn discard(&mut self) -> Result<(), StorageError> {
        self.ensure_open()?;
        if !self.staged.is_empty() {
            tracing::debug!(writes = self.staged.len(), "memory session discarded writes");
        }
        self.staged.clear();
        self.base = latest(&self.committed)?;
        self.working = Arc::clone(&self.base);
        Ok(())
    }

    pub fn shut(&mut self) {
        self.closed = true;
        self.staged.clear();
        self.base = Arc::default();
        self.working = Arc::default();
    }
}

#[async_trait]
impl StorageSession for MemorySession {
    async fn insert(
        &mut self,
        schema: &'static RecordSchema,
        record: Record,
    ) -> Result<(), StorageError> {
        self.stage(Change::Insert { schema, record })
    }

    async fn fetch(
        &mut self,
        schema: &'static RecordSchema,
        key: &Primitive,
    ) -> Result<Option<Record>, StorageError> {
        self.ensure_open()?;
        Ok(self.working.row(schema.table, key).cloned())
    }

    async fn update(
        &mut self,
        schema: &'static RecordSchema,
        record: Record,
        expect: Option<Precondition>,
    ) -> Result<(), StorageError> {
        self.stage(Change::Update {
            schema,
            record,
            expect,
        })
    }

    async fn remove(
        &mut self,
        schema: &'static RecordSchema,
        key: &Primitive,
    ) -> Result<(), StorageError> {
        self.stage(Change::Remove {
            schema,
            key: key.clone(),
        })
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        self.commit_with(|_| async { Ok(()) }).await
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        self.discard()
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.shut();
        Ok(())
    }
}
