pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use error::{AppError, AppResult};
pub use models::activity::{ActivityKind, Category, PeriodType, QuizType};
pub use models::progress::{ItemProgress, Snapshot};
pub use services::progress_service::ProgressService;
pub use services::snapshot_store::{InMemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
pub use state::{bootstrap, AppState};
