pub mod aggregator;
pub mod progress_service;
pub mod progress_tracker;
pub mod progress_updater;
pub mod recommendation;
pub mod report_service;
pub mod scoring;
pub mod settings_service;
pub mod snapshot_store;
pub mod weakness_analyzer;
