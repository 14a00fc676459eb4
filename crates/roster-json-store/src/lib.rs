//! File-backed storage adapter.
//!
//! Keeps the committed state in a [`MemoryStore`] and rewrites one JSON
//! snapshot file on every commit that changed something. The file is
//! replaced atomically (write to a sibling temp file, then rename), so a
//! crash mid-commit leaves the previous snapshot intact.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use async_trait::async_trait;
use roster_core::{
    errors::StorageError,
    mapping::{Primitive, Record, RecordSchema},
    storage::{MemorySession, MemoryStore, Precondition, SessionFactory, Snapshot, StorageSession},
};

#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Load the snapshot at `path`, or start empty if the file does not exist.
    pub async fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<Snapshot>(&raw)
                .with_context(|| format!("parse snapshot {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no snapshot yet; starting empty");
                Snapshot::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read snapshot {}", path.display()));
            }
        };

        tracing::info!(
            path = %path.display(),
            tables = snapshot.tables().count(),
            "opened json store"
        );
        Ok(Self {
            path: Arc::new(path),
            inner: MemoryStore::from_snapshot(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> Result<Snapshot, StorageError> {
        self.inner.snapshot()
    }
}

#[async_trait]
impl SessionFactory for JsonFileStore {
    async fn open(&self) -> Result<Box<dyn StorageSession>, StorageError> {
        Ok(Box::new(JsonSession {
            path: Arc::clone(&self.path),
            inner: self.inner.session()?,
        }))
    }
}

struct JsonSession {
    path: Arc<PathBuf>,
    inner: MemorySession,
}

#[async_trait]
impl StorageSession for JsonSession {
    async fn insert(
        &mut self,
        schema: &'static RecordSchema,
        record: Record,
    ) -> Result<(), StorageError> {
        self.inner.insert(schema, record).await
    }

    async fn fetch(
        &mut self,
        schema: &'static RecordSchema,
        key: &Primitive,
    ) -> Result<Option<Record>, StorageError> {
        self.inner.fetch(schema, key).await
    }

    async fn update(
        &mut self,
        schema: &'static RecordSchema,
        record: Record,
        expect: Option<Precondition>,
    ) -> Result<(), StorageError> {
        self.inner.update(schema, record, expect).await
    }

    async fn remove(
        &mut self,
        schema: &'static RecordSchema,
        key: &Primitive,
    ) -> Result<(), StorageError> {
        self.inner.remove(schema, key).await
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        let path = Arc::clone(&self.path);
        self.inner
            .commit_with(move |snapshot| async move {
                tokio::task::spawn_blocking(move || persist(&path, &snapshot))
                    .await
                    .map_err(|e| StorageError::Backend(format!("snapshot writer failed: {e}")))?
                    .map_err(|e| StorageError::Backend(format!("{e:#}")))
            })
            .await
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        self.inner.rollback().await
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.inner.close().await
    }
}

fn persist(path: &Path, snapshot: &Snapshot) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    let json = serde_json::to_vec_pretty(snapshot).context("serialize snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;

    tracing::debug!(path = %path.display(), "snapshot written");
    Ok(())
}
