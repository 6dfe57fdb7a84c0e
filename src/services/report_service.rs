//! Structured statistics and parent reports. Rendering is left to callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::activity::{ActivityKind, Category};
use crate::models::analysis::WeaknessAnalysis;
use crate::models::progress::{CategoryItems, ItemProgress, Snapshot};
use crate::models::report::{
    ActivityPerformanceSummary, CategoryProgressSummary, ChildStatistics, ParentProgressReport,
};
use crate::services::recommendation::prioritized_focus_items;
use crate::services::scoring;
use crate::services::weakness_analyzer::ActivityTotals;

pub const WEAK_REPORT_SCORE: f64 = 70.0;
pub const STRONG_REPORT_SCORE: f64 = 90.0;
pub const NEEDS_IMPROVEMENT_RATE: f64 = 70.0;
pub const WEAK_CATEGORY_RATE: f64 = 60.0;

/// Successful tracing plus passed quiz attempts.
fn successful_attempts(item: &ItemProgress) -> u32 {
    item.tracing_complete_count + item.quiz_count.saturating_sub(item.quiz_fail_count)
}

/// Totals over a window of snapshots. Completions count completed items as
/// well as every successful attempt; the rate is capped at 100.
pub fn child_statistics(
    user_id: &str,
    snapshots: &[Snapshot],
    window_days: u32,
    now: DateTime<Utc>,
) -> ChildStatistics {
    let mut stats = ChildStatistics {
        user_id: user_id.to_string(),
        generated_at: now,
        analysis_period_days: window_days,
        total_days_active: snapshots.len() as u32,
        total_activities_attempted: 0,
        total_activities_completed: 0,
        total_time_spent: 0.0,
        overall_success_rate: 0.0,
    };

    for snapshot in snapshots {
        for (_, item) in snapshot.iter_items() {
            stats.total_activities_attempted += scoring::total_attempts(item);
            stats.total_time_spent += scoring::total_time_spent(item);
            if item.completed {
                stats.total_activities_completed += 1;
            }
            stats.total_activities_completed += successful_attempts(item);
        }
    }

    if stats.total_activities_attempted > 0 {
        let rate = f64::from(stats.total_activities_completed)
            / f64::from(stats.total_activities_attempted)
            * 100.0;
        stats.overall_success_rate = rate.min(100.0);
    }

    stats
}

fn category_summary(category: Category, items: &CategoryItems) -> CategoryProgressSummary {
    let total_items = category.expected_item_count() as u32;
    let items_completed = items.values().filter(|item| item.completed).count() as u32;

    let mut weak_items = Vec::new();
    let mut strong_items = Vec::new();
    let mut score_sum = 0.0;
    let mut scored = 0u32;
    let mut time_spent = 0.0;

    for (name, item) in items {
        time_spent += scoring::total_time_spent(item);
        if !scoring::is_attempted(item) {
            continue;
        }

        let score = scoring::overall_score(item);
        score_sum += score;
        scored += 1;

        if score < WEAK_REPORT_SCORE {
            weak_items.push(name.clone());
        } else if score >= STRONG_REPORT_SCORE {
            strong_items.push(name.clone());
        }
    }

    CategoryProgressSummary {
        category,
        total_items,
        items_attempted: items.len() as u32,
        items_completed,
        completion_rate: f64::from(items_completed) / f64::from(total_items) * 100.0,
        success_rate: if scored > 0 {
            score_sum / f64::from(scored)
        } else {
            0.0
        },
        time_spent,
        weak_items,
        strong_items,
    }
}

fn activity_performance(snapshot: &Snapshot, activity: ActivityKind) -> Option<ActivityPerformanceSummary> {
    let mut totals = ActivityTotals::default();
    let mut weak_categories = Vec::new();

    for category in Category::ALL {
        let Some(items) = snapshot.items(category) else {
            continue;
        };
        let mut category_totals = ActivityTotals::default();
        for item in items.values() {
            category_totals.add(&ActivityTotals::of(item, activity));
        }
        if category_totals.attempts > 0 && category_totals.success_rate() < WEAK_CATEGORY_RATE {
            weak_categories.push(category);
        }
        totals.add(&category_totals);
    }

    (totals.attempts > 0).then(|| ActivityPerformanceSummary {
        activity_type: activity,
        total_attempts: totals.attempts,
        success_rate: totals.success_rate(),
        average_time: totals.average_time(),
        needs_improvement: totals.success_rate() < NEEDS_IMPROVEMENT_RATE,
        weak_categories,
    })
}

/// Parent-facing summary of one snapshot. Categories and activities with no
/// recorded attempts are left out.
pub fn parent_report(
    snapshot: &Snapshot,
    analysis: &WeaknessAnalysis,
    max_focus_items: usize,
    now: DateTime<Utc>,
) -> ParentProgressReport {
    let mut total_activities = 0;
    let mut total_success = 0;
    let mut total_time_spent = 0.0;
    for (_, item) in snapshot.iter_items() {
        total_activities += scoring::total_attempts(item);
        total_success += successful_attempts(item);
        total_time_spent += scoring::total_time_spent(item);
    }

    let category_progress: BTreeMap<Category, CategoryProgressSummary> = Category::ALL
        .into_iter()
        .filter_map(|category| {
            snapshot
                .items(category)
                .filter(|items| !items.is_empty())
                .map(|items| (category, category_summary(category, items)))
        })
        .collect();

    let activity_performance = ActivityKind::ALL
        .into_iter()
        .filter_map(|activity| {
            activity_performance(snapshot, activity).map(|summary| (activity, summary))
        })
        .collect();

    ParentProgressReport {
        child_user_id: snapshot.user_id.clone(),
        report_date: now,
        report_period: snapshot.period_type,
        total_activities,
        total_time_spent,
        overall_success_rate: if total_activities > 0 {
            f64::from(total_success) / f64::from(total_activities) * 100.0
        } else {
            0.0
        },
        category_progress,
        activity_performance,
        top_priority_items: prioritized_focus_items(analysis, max_focus_items),
    }
}
