use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::progress_service::ProgressService;
use crate::services::settings_service::SettingsService;
use crate::services::snapshot_store::SqliteSnapshotStore;

pub const DATABASE_FILE: &str = "numberland-progress.sqlite";
pub const LOG_DIR: &str = "logs";

pub type SqliteProgressService = ProgressService<SqliteSnapshotStore>;

/// Long-lived services sharing one database.
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    progress_service: Arc<SqliteProgressService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> Self {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let progress_service = Arc::new(ProgressService::new(
            SqliteSnapshotStore::new(db_pool.clone()),
            Arc::clone(&settings_service),
        ));

        Self {
            db_pool,
            settings_service,
            progress_service,
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.db_pool
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn progress(&self) -> Arc<SqliteProgressService> {
        Arc::clone(&self.progress_service)
    }
}

/// Sets up logging and the database under `data_dir` and wires the services.
pub fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    std::fs::create_dir_all(data_dir)?;
    crate::utils::logger::init_logging(&data_dir.join(LOG_DIR))?;

    let pool = DbPool::new(data_dir.join(DATABASE_FILE))?;
    let state = AppState::new(pool);
    info!(target: "app::progress", data_dir = %data_dir.display(), "progress services ready");

    Ok(state)
}
