pub mod activity;
pub mod analysis;
pub mod input;
pub mod progress;
pub mod report;
pub mod settings;
