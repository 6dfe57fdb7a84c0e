//! Merges per-snapshot weakness analyses over a multi-day window.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::activity::{ActivityKind, Category};
use crate::models::analysis::{ActivityWeakness, WeakItem, WeaknessAnalysis};
use crate::models::progress::Snapshot;
use crate::services::weakness_analyzer::{
    analyze_weaknesses, by_rate_then_failures, by_score_then_completion,
};

#[derive(Default)]
struct ItemObservations {
    scores: Vec<f64>,
    completion_rates: Vec<f64>,
    total_time: f64,
    latest: Option<WeakItem>,
}

#[derive(Default)]
struct ActivityObservations {
    rates: Vec<f64>,
    times: Vec<f64>,
    failures: u32,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Analyzes a window of snapshots: nothing yields an empty analysis, a single
/// snapshot is analyzed directly, several are aggregated.
pub fn analyze_window(snapshots: &[Snapshot], top_n: usize) -> WeaknessAnalysis {
    match snapshots {
        [] => WeaknessAnalysis::empty(),
        [single] => analyze_weaknesses(single, top_n),
        _ => aggregate(snapshots, top_n),
    }
}

/// Averages weak-item scores and weak-activity rates per key across the
/// snapshots. `total_attempts` on the result counts contributing snapshots;
/// the weakest activity and completion flag come from the most recent one.
pub fn aggregate(snapshots: &[Snapshot], top_n: usize) -> WeaknessAnalysis {
    let mut ordered: Vec<&Snapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|snapshot| snapshot.period_start);

    let mut items: BTreeMap<(Category, String), ItemObservations> = BTreeMap::new();
    let mut activities: BTreeMap<ActivityKind, ActivityObservations> = BTreeMap::new();

    for snapshot in ordered {
        let analysis = analyze_weaknesses(snapshot, top_n);

        for weak in analysis.all_weak_items() {
            let entry = items
                .entry((weak.category, weak.item_name.clone()))
                .or_default();
            entry.scores.push(weak.overall_score);
            entry.completion_rates.push(weak.completion_rate);
            entry.total_time += weak.total_time_spent;
            entry.latest = Some(weak.clone());
        }

        for weakness in &analysis.weakest_activities {
            let entry = activities.entry(weakness.activity_type).or_default();
            entry.rates.push(weakness.average_success_rate);
            entry.times.push(weakness.average_time);
            entry.failures += weakness.total_failures;
        }
    }

    let mut result = WeaknessAnalysis::empty();

    for ((category, item_name), observed) in items {
        let Some(latest) = observed.latest else {
            continue;
        };
        let merged = WeakItem {
            category,
            item_name,
            overall_score: mean(&observed.scores),
            weakest_activity: latest.weakest_activity,
            completed: latest.completed,
            total_attempts: observed.scores.len() as u32,
            total_time_spent: observed.total_time,
            completion_rate: mean(&observed.completion_rates),
        };
        result.weak_items.entry(category).or_default().push(merged);
    }

    for list in result.weak_items.values_mut() {
        list.sort_by(by_score_then_completion);
    }

    let mut merged_activities: Vec<ActivityWeakness> = activities
        .into_iter()
        .map(|(activity_type, observed)| ActivityWeakness {
            activity_type,
            average_success_rate: mean(&observed.rates),
            total_attempts: observed.rates.len() as u32,
            total_failures: observed.failures,
            average_time: mean(&observed.times),
        })
        .collect();
    merged_activities.sort_by(by_rate_then_failures);
    result.weakest_activities = merged_activities;

    debug!(
        target: "app::analysis",
        snapshots = snapshots.len(),
        weak_items = result.all_weak_items().count(),
        weak_activities = result.weakest_activities.len(),
        "window aggregated"
    );

    result
}
