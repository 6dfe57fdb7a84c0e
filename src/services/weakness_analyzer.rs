//! Ranks weak items and weak activities within snapshots.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::models::activity::{ActivityKind, Category};
use crate::models::analysis::{
    ActivityWeakness, ActivityWeaknessDetails, ItemPerformance, WeakItem, WeaknessAnalysis,
};
use crate::models::progress::{ItemProgress, Snapshot};
use crate::services::scoring;

/// Items scoring below this are weak even when completed.
pub const WEAK_ITEM_SCORE: f64 = 70.0;
/// Activity-detail items below this rate are listed as weak.
pub const WEAK_DETAIL_RATE: f64 = 70.0;
/// Activity-detail items below this rate are called out as top weak items.
pub const TOP_WEAK_DETAIL_RATE: f64 = 50.0;
pub const MAX_WEAK_ACTIVITIES: usize = 5;

/// Raw counters of one activity label on one item.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityTotals {
    pub attempts: u32,
    pub successes: u32,
    pub failures: u32,
    pub time: f64,
}

impl ActivityTotals {
    pub fn of(item: &ItemProgress, activity: ActivityKind) -> Self {
        match activity.quiz_type() {
            None => Self {
                attempts: item.tracing_count,
                successes: item.tracing_complete_count,
                failures: item
                    .tracing_count
                    .saturating_sub(item.tracing_complete_count),
                time: item.tracing_total_time,
            },
            Some(quiz_type) => {
                let stats = item.quiz_stats(quiz_type);
                Self {
                    attempts: stats.count,
                    successes: stats.successes(),
                    failures: stats.fail_count,
                    time: stats.total_time,
                }
            }
        }
    }

    pub fn add(&mut self, other: &ActivityTotals) {
        self.attempts += other.attempts;
        self.successes += other.successes;
        self.failures += other.failures;
        self.time += other.time;
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        f64::from(self.successes) / f64::from(self.attempts) * 100.0
    }

    pub fn average_time(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.time / f64::from(self.attempts)
    }
}

pub fn is_weak(item: &ItemProgress) -> bool {
    !item.completed || scoring::overall_score(item) < WEAK_ITEM_SCORE
}

pub fn weak_item(category: Category, item: &ItemProgress) -> WeakItem {
    WeakItem {
        category,
        item_name: item.item_name.clone(),
        overall_score: scoring::overall_score(item),
        weakest_activity: scoring::weakest_activity(item),
        completed: item.completed,
        total_attempts: scoring::total_attempts(item),
        total_time_spent: scoring::total_time_spent(item),
        completion_rate: scoring::completion_rate(item),
    }
}

pub(crate) fn by_score_then_completion(a: &WeakItem, b: &WeakItem) -> Ordering {
    a.overall_score
        .total_cmp(&b.overall_score)
        .then_with(|| a.completion_rate.total_cmp(&b.completion_rate))
}

pub(crate) fn by_rate_then_failures(a: &ActivityWeakness, b: &ActivityWeakness) -> Ordering {
    a.average_success_rate
        .total_cmp(&b.average_success_rate)
        .then_with(|| b.total_failures.cmp(&a.total_failures))
}

/// Weak items per category (at most `top_n` each) and the five weakest
/// activities of one snapshot.
pub fn analyze_weaknesses(snapshot: &Snapshot, top_n: usize) -> WeaknessAnalysis {
    let mut analysis = WeaknessAnalysis::empty();

    for category in Category::ALL {
        let Some(items) = snapshot.items(category) else {
            continue;
        };

        let mut weak: Vec<WeakItem> = items
            .values()
            .filter(|item| is_weak(item))
            .map(|item| weak_item(category, item))
            .collect();
        weak.sort_by(by_score_then_completion);
        weak.truncate(top_n);

        analysis.weak_items.insert(category, weak);
    }

    analysis.weakest_activities = weakest_activities(snapshot);

    debug!(
        target: "app::analysis",
        user_id = %snapshot.user_id,
        period_start = %snapshot.period_start,
        weak_items = analysis.all_weak_items().count(),
        weak_activities = analysis.weakest_activities.len(),
        "snapshot analyzed"
    );

    analysis
}

/// Attempted activity labels, weakest first, ties going to the label with
/// more failures.
pub fn weakest_activities(snapshot: &Snapshot) -> Vec<ActivityWeakness> {
    let mut ranked: Vec<ActivityWeakness> = ActivityKind::ALL
        .into_iter()
        .filter_map(|activity| {
            let totals = activity_totals(snapshot, activity);
            (totals.attempts > 0).then(|| ActivityWeakness {
                activity_type: activity,
                average_success_rate: totals.success_rate(),
                total_attempts: totals.attempts,
                total_failures: totals.failures,
                average_time: totals.average_time(),
            })
        })
        .collect();

    ranked.sort_by(by_rate_then_failures);
    ranked.truncate(MAX_WEAK_ACTIVITIES);
    ranked
}

/// Sum of one activity label's counters over every item of a snapshot.
pub fn activity_totals(snapshot: &Snapshot, activity: ActivityKind) -> ActivityTotals {
    let mut totals = ActivityTotals::default();
    for (_, item) in snapshot.iter_items() {
        totals.add(&ActivityTotals::of(item, activity));
    }
    totals
}

/// Per-activity breakdown of weak items across several snapshots.
pub fn activity_weakness_details(
    snapshots: &[Snapshot],
) -> BTreeMap<ActivityKind, ActivityWeaknessDetails> {
    ActivityKind::ALL
        .into_iter()
        .map(|activity| (activity, details_for_activity(snapshots, activity)))
        .collect()
}

fn details_for_activity(snapshots: &[Snapshot], activity: ActivityKind) -> ActivityWeaknessDetails {
    let mut weak_items_by_category = BTreeMap::new();

    for category in Category::ALL {
        let mut performances: BTreeMap<&str, ItemPerformance> = BTreeMap::new();

        for snapshot in snapshots {
            let Some(items) = snapshot.items(category) else {
                continue;
            };
            for (name, item) in items {
                let totals = ActivityTotals::of(item, activity);
                if totals.attempts == 0 {
                    continue;
                }
                let entry = performances
                    .entry(name.as_str())
                    .or_insert_with(|| ItemPerformance {
                        item_name: name.clone(),
                        ..ItemPerformance::default()
                    });
                entry.total_attempts += totals.attempts;
                entry.total_success += totals.successes;
                entry.total_time += totals.time;
            }
        }

        let mut weak: Vec<ItemPerformance> = performances
            .into_values()
            .filter(|performance| performance.success_rate() < WEAK_DETAIL_RATE)
            .collect();
        weak.sort_by(|a, b| a.success_rate().total_cmp(&b.success_rate()));

        if !weak.is_empty() {
            weak_items_by_category.insert(category, weak);
        }
    }

    let mut total_attempts = 0;
    let mut total_success = 0;
    let mut top_weak_items = Vec::new();
    for (category, items) in &weak_items_by_category {
        for item in items {
            total_attempts += item.total_attempts;
            total_success += item.total_success;
            if item.success_rate() < TOP_WEAK_DETAIL_RATE {
                top_weak_items.push(format!("{category}:{}", item.item_name));
            }
        }
    }

    let overall_success_rate = if total_attempts > 0 {
        f64::from(total_success) / f64::from(total_attempts) * 100.0
    } else {
        0.0
    };

    ActivityWeaknessDetails {
        activity_type: activity,
        weak_items_by_category,
        overall_success_rate,
        total_attempts,
        top_weak_items,
    }
}
