use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::{ActivityKind, Category, PeriodType};
use crate::models::analysis::FocusItem;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChildStatistics {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub analysis_period_days: u32,
    pub total_days_active: u32,
    pub total_activities_attempted: u32,
    pub total_activities_completed: u32,
    /// Seconds.
    pub total_time_spent: f64,
    pub overall_success_rate: f64,
}

impl ChildStatistics {
    pub fn average_session_time(&self) -> f64 {
        if self.total_days_active == 0 {
            return 0.0;
        }
        self.total_time_spent / f64::from(self.total_days_active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProgressSummary {
    pub category: Category,
    pub total_items: u32,
    pub items_attempted: u32,
    pub items_completed: u32,
    pub completion_rate: f64,
    pub success_rate: f64,
    pub time_spent: f64,
    pub weak_items: Vec<String>,
    pub strong_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPerformanceSummary {
    pub activity_type: ActivityKind,
    pub total_attempts: u32,
    pub success_rate: f64,
    pub average_time: f64,
    pub needs_improvement: bool,
    pub weak_categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParentProgressReport {
    pub child_user_id: String,
    pub report_date: DateTime<Utc>,
    pub report_period: PeriodType,
    pub total_activities: u32,
    pub total_time_spent: f64,
    pub overall_success_rate: f64,
    pub category_progress: BTreeMap<Category, CategoryProgressSummary>,
    pub activity_performance: BTreeMap<ActivityKind, ActivityPerformanceSummary>,
    pub top_priority_items: Vec<FocusItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCompletion {
    pub category: Category,
    pub total_items: u32,
    pub attempted_items: u32,
    pub completed_items: u32,
    pub completion_percentage: f64,
    pub attempt_percentage: f64,
    pub completed_items_list: Vec<String>,
    pub attempted_items_list: Vec<String>,
    pub not_attempted_items_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub category_completions: BTreeMap<Category, CategoryCompletion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStatus {
    pub is_attempted: bool,
    pub is_completed: bool,
    pub success_rate: f64,
    pub attempts: u32,
    pub total_time: f64,
    /// "achieved/total", tracing only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetailView {
    pub item_name: String,
    pub is_attempted: bool,
    pub is_completed: bool,
    pub overall_score: f64,
    pub total_attempts: u32,
    pub total_time_spent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub activity_status: BTreeMap<ActivityKind, ActivityStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetailView {
    pub category: Category,
    pub expected_items: Vec<String>,
    pub item_details: Vec<ItemDetailView>,
}
