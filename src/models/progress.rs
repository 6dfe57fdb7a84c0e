use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::{Category, PeriodType, QuizType};

/// Running counters for one quiz sub-type of one item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub count: u32,
    pub fail_count: u32,
    pub total_time: f64,
    pub total_fail_time: f64,
    pub time_out_count: u32,
}

impl ActivityStats {
    pub fn success_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        f64::from(self.count.saturating_sub(self.fail_count)) / f64::from(self.count) * 100.0
    }

    pub fn average_time(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_time / f64::from(self.count)
    }

    pub fn successes(&self) -> u32 {
        self.count.saturating_sub(self.fail_count)
    }
}

/// Aggregate progress of one item (e.g. Numbers/"3") within a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemProgress {
    pub item_name: String,
    pub completed: bool,

    pub tracing_count: u32,
    pub tracing_complete_count: u32,
    pub tracing_total_time: f64,
    pub total_stars: u32,
    pub total_stars_achieved: u32,

    pub quiz_count: u32,
    pub quiz_total_time: f64,
    pub quiz_fail_count: u32,
    pub quiz_time_out_count: u32,

    #[serde(default)]
    pub object_recognition: ActivityStats,
    #[serde(default)]
    pub listening: ActivityStats,
    #[serde(default)]
    pub text_to_figure: ActivityStats,
    #[serde(default)]
    pub figure_to_text: ActivityStats,
    #[serde(default)]
    pub counting: ActivityStats,
    #[serde(default)]
    pub bubble_pop: ActivityStats,
}

impl ItemProgress {
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            ..Self::default()
        }
    }

    pub fn quiz_stats(&self, quiz_type: QuizType) -> &ActivityStats {
        match quiz_type {
            QuizType::ObjectRecognition => &self.object_recognition,
            QuizType::Listening => &self.listening,
            QuizType::TextToFigure => &self.text_to_figure,
            QuizType::FigureToText => &self.figure_to_text,
            QuizType::Counting => &self.counting,
            QuizType::BubblePop => &self.bubble_pop,
        }
    }

    pub fn quiz_stats_mut(&mut self, quiz_type: QuizType) -> &mut ActivityStats {
        match quiz_type {
            QuizType::ObjectRecognition => &mut self.object_recognition,
            QuizType::Listening => &mut self.listening,
            QuizType::TextToFigure => &mut self.text_to_figure,
            QuizType::FigureToText => &mut self.figure_to_text,
            QuizType::Counting => &mut self.counting,
            QuizType::BubblePop => &mut self.bubble_pop,
        }
    }
}

pub type CategoryItems = BTreeMap<String, ItemProgress>;

/// One time-bucketed progress record for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub period_start: NaiveDate,
    pub period_type: PeriodType,
    #[serde(default)]
    pub categories: BTreeMap<Category, CategoryItems>,
    pub last_updated: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub version: i64,
}

impl Snapshot {
    pub fn new(
        user_id: impl Into<String>,
        period_type: PeriodType,
        period_start: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let categories = Category::ALL
            .into_iter()
            .map(|category| (category, CategoryItems::new()))
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            created_at: now,
            period_start,
            period_type,
            categories,
            last_updated: now,
            version: 0,
        }
    }

    pub fn items(&self, category: Category) -> Option<&CategoryItems> {
        self.categories.get(&category)
    }

    pub fn item(&self, category: Category, item_name: &str) -> Option<&ItemProgress> {
        self.categories
            .get(&category)
            .and_then(|items| items.get(item_name))
    }

    /// Get-or-create the entry for an item.
    pub fn item_entry(&mut self, category: Category, item_name: &str) -> &mut ItemProgress {
        self.categories
            .entry(category)
            .or_default()
            .entry(item_name.to_string())
            .or_insert_with(|| ItemProgress::new(item_name))
    }

    /// Every item in category order, then item-name order.
    pub fn iter_items(&self) -> impl Iterator<Item = (Category, &ItemProgress)> {
        self.categories
            .iter()
            .flat_map(|(category, items)| items.values().map(move |item| (*category, item)))
    }

    pub fn item_count(&self) -> usize {
        self.categories.values().map(|items| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
    }
}
