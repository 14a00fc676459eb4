use std::sync::Arc;

use roster_core::{
    config::{Config, StorageKind},
    records,
    storage::{MemoryStore, SessionFactory},
    unit_of_work::UnitOfWorkFactory,
    usecases,
};
use roster_json_store::JsonFileStore;
use tokio::io::BufReader;

mod console;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    roster_core::logging::init("roster", cfg.log_json)?;

    let sessions: Arc<dyn SessionFactory> = match cfg.storage {
        StorageKind::Memory => Arc::new(MemoryStore::new()),
        StorageKind::Json => Arc::new(JsonFileStore::load(&cfg.data_file).await?),
    };

    let uow = UnitOfWorkFactory::new(sessions, Arc::new(records::mapping_registry()));
    let dispatcher = usecases::dispatcher(uow);

    tracing::info!(storage = ?cfg.storage, handlers = dispatcher.len(), "roster ready");

    console::run(
        &dispatcher,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
