pub mod settings_repository;
pub mod snapshot_repository;
