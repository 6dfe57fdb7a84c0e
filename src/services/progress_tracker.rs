//! Per-category completion views against the expected-item catalogue.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::activity::{ActivityKind, Category};
use crate::models::progress::{CategoryItems, ItemProgress, Snapshot};
use crate::models::report::{
    ActivityStatus, CategoryCompletion, CategoryDetailView, CompletionSummary, ItemDetailView,
};
use crate::services::scoring;
use crate::services::weakness_analyzer::ActivityTotals;

fn items_of(snapshot: Option<&Snapshot>, category: Category) -> Option<&CategoryItems> {
    snapshot.and_then(|snapshot| snapshot.items(category))
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub fn category_completion(snapshot: Option<&Snapshot>, category: Category) -> CategoryCompletion {
    let expected = category.expected_items();
    let items = items_of(snapshot, category);

    let attempted_items_list: Vec<String> = items
        .map(|items| items.keys().cloned().collect())
        .unwrap_or_default();
    let completed_items_list: Vec<String> = items
        .map(|items| {
            items
                .values()
                .filter(|item| item.completed)
                .map(|item| item.item_name.clone())
                .collect()
        })
        .unwrap_or_default();
    let not_attempted_items_list: Vec<String> = expected
        .iter()
        .filter(|name| !items.is_some_and(|items| items.contains_key(name.as_str())))
        .cloned()
        .collect();

    CategoryCompletion {
        category,
        total_items: expected.len() as u32,
        attempted_items: attempted_items_list.len() as u32,
        completed_items: completed_items_list.len() as u32,
        completion_percentage: percentage(completed_items_list.len(), expected.len()),
        attempt_percentage: percentage(attempted_items_list.len(), expected.len()),
        completed_items_list,
        attempted_items_list,
        not_attempted_items_list,
    }
}

/// Completion against the catalogue for every category. A missing snapshot
/// reports everything as not attempted.
pub fn completion_summary(
    user_id: &str,
    snapshot: Option<&Snapshot>,
    now: DateTime<Utc>,
) -> CompletionSummary {
    CompletionSummary {
        user_id: user_id.to_string(),
        generated_at: now,
        category_completions: Category::ALL
            .into_iter()
            .map(|category| (category, category_completion(snapshot, category)))
            .collect(),
    }
}

pub fn activity_status(item: &ItemProgress, activity: ActivityKind) -> ActivityStatus {
    let totals = ActivityTotals::of(item, activity);
    ActivityStatus {
        is_attempted: totals.attempts > 0,
        is_completed: totals.successes > 0,
        success_rate: totals.success_rate(),
        attempts: totals.attempts,
        total_time: totals.time,
        stars: (activity == ActivityKind::Tracing)
            .then(|| format!("{}/{}", item.total_stars_achieved, item.total_stars)),
    }
}

fn item_detail(snapshot: &Snapshot, item: &ItemProgress) -> ItemDetailView {
    ItemDetailView {
        item_name: item.item_name.clone(),
        is_attempted: true,
        is_completed: item.completed,
        overall_score: scoring::overall_score(item),
        total_attempts: scoring::total_attempts(item),
        total_time_spent: scoring::total_time_spent(item),
        last_updated: Some(snapshot.last_updated),
        activity_status: ActivityKind::ALL
            .into_iter()
            .map(|activity| (activity, activity_status(item, activity)))
            .collect(),
    }
}

fn untouched_detail(item_name: &str) -> ItemDetailView {
    ItemDetailView {
        item_name: item_name.to_string(),
        is_attempted: false,
        is_completed: false,
        overall_score: 0.0,
        total_attempts: 0,
        total_time_spent: 0.0,
        last_updated: None,
        activity_status: ActivityKind::ALL
            .into_iter()
            .map(|activity| (activity, ActivityStatus::default()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// One row per expected item of the category, in catalogue order.
pub fn category_details(snapshot: Option<&Snapshot>, category: Category) -> CategoryDetailView {
    let expected_items = category.expected_items();

    let item_details = expected_items
        .iter()
        .map(|name| match snapshot {
            Some(snapshot) => match snapshot.item(category, name) {
                Some(item) => item_detail(snapshot, item),
                None => untouched_detail(name),
            },
            None => untouched_detail(name),
        })
        .collect();

    CategoryDetailView {
        category,
        expected_items,
        item_details,
    }
}
