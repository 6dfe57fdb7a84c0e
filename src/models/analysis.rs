use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::{ActivityKind, Category};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeakItem {
    pub category: Category,
    pub item_name: String,
    pub overall_score: f64,
    pub weakest_activity: ActivityKind,
    pub completed: bool,
    pub total_attempts: u32,
    pub total_time_spent: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityWeakness {
    pub activity_type: ActivityKind,
    pub average_success_rate: f64,
    pub total_attempts: u32,
    pub total_failures: u32,
    pub average_time: f64,
}

/// Ranked weak items per category plus ranked weak activities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeaknessAnalysis {
    pub weak_items: BTreeMap<Category, Vec<WeakItem>>,
    pub weakest_activities: Vec<ActivityWeakness>,
}

impl WeaknessAnalysis {
    /// An analysis with an empty list for every category.
    pub fn empty() -> Self {
        Self {
            weak_items: Category::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
            weakest_activities: Vec::new(),
        }
    }

    pub fn items_for(&self, category: Category) -> &[WeakItem] {
        self.weak_items
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_weak_items(&self) -> impl Iterator<Item = &WeakItem> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.items_for(category).iter())
    }

    pub fn is_empty(&self) -> bool {
        self.weak_items.values().all(Vec::is_empty) && self.weakest_activities.is_empty()
    }
}

impl Default for WeaknessAnalysis {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusItem {
    pub category: Category,
    pub item_name: String,
    pub score: f64,
    pub weakest_activity: ActivityKind,
    pub priority: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusActivity {
    pub category: Category,
    pub item_name: String,
    pub activity_type: ActivityKind,
    pub target_score: u32,
    pub estimated_minutes: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyFocus {
    pub day: u32,
    pub date: NaiveDate,
    pub focus_items: Vec<FocusActivity>,
    pub estimated_duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusedLearningPlan {
    pub generated_at: DateTime<Utc>,
    pub plan_duration: u32,
    pub daily_focus_items: Vec<DailyFocus>,
}

impl FocusedLearningPlan {
    pub fn total_items(&self) -> usize {
        self.daily_focus_items
            .iter()
            .map(|day| day.focus_items.len())
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecommendationFocus {
    Activity { activity: ActivityKind },
    Completion { category: Category },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecommendation {
    pub focus: RecommendationFocus,
    pub reason: String,
    pub suggested_items: Vec<String>,
    pub priority: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemPerformance {
    pub item_name: String,
    pub total_attempts: u32,
    pub total_success: u32,
    pub total_time: f64,
}

impl ItemPerformance {
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        f64::from(self.total_success) / f64::from(self.total_attempts) * 100.0
    }

    pub fn average_time(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.total_time / f64::from(self.total_attempts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityWeaknessDetails {
    pub activity_type: ActivityKind,
    pub weak_items_by_category: BTreeMap<Category, Vec<ItemPerformance>>,
    pub overall_success_rate: f64,
    pub total_attempts: u32,
    pub top_weak_items: Vec<String>,
}
