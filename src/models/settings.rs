use serde::{Deserialize, Serialize};

/// Tunables for analysis windows and plan sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub analysis_window_days: u32,
    pub statistics_window_days: u32,
    pub plan_duration: u32,
    pub top_weak_items: u32,
    pub max_focus_items: u32,
    /// IANA zone name used to decide the learner's "today".
    pub timezone: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdateInput {
    pub analysis_window_days: Option<u32>,
    pub statistics_window_days: Option<u32>,
    pub plan_duration: Option<u32>,
    pub top_weak_items: Option<u32>,
    pub max_focus_items: Option<u32>,
    pub timezone: Option<String>,
}
