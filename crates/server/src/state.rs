use crate::config::ServerConfig;
use crate::error::ServerResult;
use catalog::CatalogStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// The one catalog handle for the process
    pub catalog: Arc<CatalogStore>,
}

impl ServerState {
    /// Open the catalog, drop entries whose files are gone and persist the
    /// pruned state before serving.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let catalog = CatalogStore::open(config.library.clone())?;

        let report = catalog.validate();
        if !report.is_clean() {
            tracing::info!(
                removed_books = report.removed_books.len(),
                orphaned_files = report.orphaned_files.len(),
                orphaned_progress = report.orphaned_progress.len(),
                cleared_covers = report.cleared_covers.len(),
                "startup_validation_pruned"
            );
            catalog.persist()?;
        }

        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
        })
    }
}
