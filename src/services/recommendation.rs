//! Turns a weakness analysis into focus items, learning plans and
//! activity recommendations.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::models::activity::Category;
use crate::models::analysis::{
    ActivityRecommendation, DailyFocus, FocusActivity, FocusItem, FocusedLearningPlan,
    RecommendationFocus, WeakItem, WeaknessAnalysis,
};
use crate::models::progress::Snapshot;
use crate::services::scoring;

pub const UNDER_PRACTICED_ATTEMPTS: u32 = 3;
pub const UNDER_PRACTICED_BONUS: f64 = 20.0;
pub const INCOMPLETE_BONUS: f64 = 10.0;

pub const ITEMS_PER_DAY: usize = 3;
pub const MINUTES_PER_ITEM: u32 = 5;
pub const TARGET_SCORE: u32 = 80;

pub const RECOMMENDED_ACTIVITIES: usize = 3;
pub const MAX_SUGGESTED_ITEMS: usize = 5;
pub const LOW_COMPLETION_RATE: f64 = 30.0;
pub const URGENT_ACTIVITY_RATE: f64 = 50.0;

pub fn priority(item: &WeakItem) -> f64 {
    let mut priority = 100.0 - item.overall_score;
    if item.total_attempts < UNDER_PRACTICED_ATTEMPTS {
        priority += UNDER_PRACTICED_BONUS;
    }
    if !item.completed {
        priority += INCOMPLETE_BONUS;
    }
    priority
}

/// All weak items, highest priority first. Equal priorities keep category
/// order, then their rank within the category.
pub fn prioritized_focus_items(analysis: &WeaknessAnalysis, max_items: usize) -> Vec<FocusItem> {
    let mut items: Vec<FocusItem> = analysis
        .all_weak_items()
        .map(|item| FocusItem {
            category: item.category,
            item_name: item.item_name.clone(),
            score: item.overall_score,
            weakest_activity: item.weakest_activity,
            priority: priority(item),
        })
        .collect();

    items.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    items.truncate(max_items);
    items
}

/// Spreads the top `plan_duration * 3` focus items over `plan_duration`
/// days, three per day starting at `start_date`. Days past the end of the
/// list stay empty.
pub fn generate_learning_plan(
    analysis: &WeaknessAnalysis,
    plan_duration: u32,
    start_date: NaiveDate,
    now: DateTime<Utc>,
) -> FocusedLearningPlan {
    let days = plan_duration as usize;
    let focus_items = prioritized_focus_items(analysis, days * ITEMS_PER_DAY);
    let mut buckets = focus_items.chunks(ITEMS_PER_DAY);

    let daily_focus_items: Vec<DailyFocus> = (0..plan_duration)
        .map(|day| {
            let focus_items: Vec<FocusActivity> = buckets
                .next()
                .unwrap_or(&[])
                .iter()
                .map(|item| FocusActivity {
                    category: item.category,
                    item_name: item.item_name.clone(),
                    activity_type: item.weakest_activity,
                    target_score: TARGET_SCORE,
                    estimated_minutes: MINUTES_PER_ITEM,
                    reason: format!("Current score: {:.0}%", item.score),
                })
                .collect();

            DailyFocus {
                day: day + 1,
                date: start_date + Duration::days(i64::from(day)),
                estimated_duration: MINUTES_PER_ITEM * focus_items.len() as u32,
                focus_items,
            }
        })
        .collect();

    let plan = FocusedLearningPlan {
        generated_at: now,
        plan_duration,
        daily_focus_items,
    };

    debug!(
        target: "app::analysis",
        plan_duration,
        items = plan.total_items(),
        "learning plan generated"
    );

    plan
}

/// Recommendations for the three weakest activities, then for categories
/// the child has started but barely completed. Urgent ones come first.
pub fn generate_recommendations(
    snapshot: &Snapshot,
    analysis: &WeaknessAnalysis,
) -> Vec<ActivityRecommendation> {
    let mut recommendations = Vec::new();

    for weakness in analysis.weakest_activities.iter().take(RECOMMENDED_ACTIVITIES) {
        let suggested_items = snapshot
            .iter_items()
            .filter(|(_, item)| scoring::weakest_activity(item) == weakness.activity_type)
            .map(|(category, item)| format!("{category}: {}", item.item_name))
            .take(MAX_SUGGESTED_ITEMS)
            .collect();

        recommendations.push(ActivityRecommendation {
            focus: RecommendationFocus::Activity {
                activity: weakness.activity_type,
            },
            reason: format!("Success rate is only {:.0}%", weakness.average_success_rate),
            suggested_items,
            priority: if weakness.average_success_rate < URGENT_ACTIVITY_RATE {
                1
            } else {
                2
            },
        });
    }

    for category in Category::ALL {
        let Some(items) = snapshot.items(category) else {
            continue;
        };
        if items.is_empty() {
            continue;
        }

        let completed = items.values().filter(|item| item.completed).count();
        let rate = completed as f64 / category.expected_item_count() as f64 * 100.0;
        if rate >= LOW_COMPLETION_RATE {
            continue;
        }

        recommendations.push(ActivityRecommendation {
            focus: RecommendationFocus::Completion { category },
            reason: format!("Only {rate:.0}% of {category} completed"),
            suggested_items: items
                .values()
                .filter(|item| !item.completed)
                .map(|item| item.item_name.clone())
                .take(MAX_SUGGESTED_ITEMS)
                .collect(),
            priority: 1,
        });
    }

    recommendations.sort_by_key(|recommendation| recommendation.priority);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::{ActivityKind, PeriodType};
    use crate::models::analysis::ActivityWeakness;
    use crate::models::progress::ActivityStats;

    fn weak(category: Category, name: &str, score: f64, attempts: u32, completed: bool) -> WeakItem {
        WeakItem {
            category,
            item_name: name.to_string(),
            overall_score: score,
            weakest_activity: ActivityKind::Tracing,
            completed,
            total_attempts: attempts,
            total_time_spent: 0.0,
            completion_rate: 0.0,
        }
    }

    fn analysis_with(items: Vec<WeakItem>) -> WeaknessAnalysis {
        let mut analysis = WeaknessAnalysis::empty();
        for item in items {
            analysis.weak_items.entry(item.category).or_default().push(item);
        }
        analysis
    }

    #[test]
    fn priority_adds_bonuses() {
        assert_eq!(priority(&weak(Category::Numbers, "1", 80.0, 1, false)), 50.0);
        assert_eq!(priority(&weak(Category::Numbers, "2", 50.0, 10, true)), 50.0);
        assert_eq!(priority(&weak(Category::Numbers, "3", 40.0, 3, false)), 70.0);
    }

    #[test]
    fn equal_priorities_keep_flattened_order() {
        let analysis = analysis_with(vec![
            weak(Category::Numbers, "A-item", 80.0, 1, false),
            weak(Category::Shapes, "B-item", 50.0, 10, true),
        ]);

        for _ in 0..5 {
            let items = prioritized_focus_items(&analysis, 10);
            let names: Vec<&str> = items.iter().map(|i| i.item_name.as_str()).collect();
            assert_eq!(names, vec!["A-item", "B-item"]);
        }
    }

    #[test]
    fn focus_items_sorted_descending_and_truncated() {
        let analysis = analysis_with(vec![
            weak(Category::Numbers, "1", 60.0, 5, true),
            weak(Category::Colors, "Red", 10.0, 5, true),
            weak(Category::Shapes, "Star", 30.0, 5, true),
        ]);
        let items = prioritized_focus_items(&analysis, 2);
        let names: Vec<&str> = items.iter().map(|i| i.item_name.as_str()).collect();
        assert_eq!(names, vec!["Red", "Star"]);
        assert_eq!(items[0].priority, 90.0);
    }

    #[test]
    fn learning_plan_fills_three_per_day() {
        let items = (0..7)
            .map(|n| weak(Category::Numbers, &n.to_string(), f64::from(n) * 10.0, 5, true))
            .collect();
        let analysis = analysis_with(items);
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let plan = generate_learning_plan(&analysis, 3, start, Utc::now());
        assert_eq!(plan.plan_duration, 3);
        assert_eq!(plan.daily_focus_items.len(), 3);
        assert_eq!(plan.total_items(), 7);

        let first = &plan.daily_focus_items[0];
        assert_eq!(first.day, 1);
        assert_eq!(first.date, start);
        assert_eq!(first.estimated_duration, 15);
        assert_eq!(first.focus_items[0].item_name, "0");
        assert_eq!(first.focus_items[0].target_score, 80);
        assert_eq!(first.focus_items[1].reason, "Current score: 10%");

        let last = &plan.daily_focus_items[2];
        assert_eq!(last.date, start + Duration::days(2));
        assert_eq!(last.focus_items.len(), 1);
        assert_eq!(last.estimated_duration, 5);
    }

    #[test]
    fn learning_plan_keeps_empty_days() {
        let analysis = analysis_with(vec![weak(Category::Colors, "Blue", 20.0, 1, false)]);
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let plan = generate_learning_plan(&analysis, 7, start, Utc::now());

        assert_eq!(plan.daily_focus_items.len(), 7);
        assert_eq!(plan.total_items(), 1);
        assert!(plan.daily_focus_items[6].focus_items.is_empty());
        assert_eq!(plan.daily_focus_items[6].estimated_duration, 0);
    }

    #[test]
    fn recommendations_cover_weak_activities_and_low_completion() {
        let now = Utc::now();
        let mut snapshot = Snapshot::new("child-1", PeriodType::Daily, now.date_naive(), now);
        snapshot.item_entry(Category::Numbers, "4").counting = ActivityStats {
            count: 4,
            fail_count: 3,
            ..ActivityStats::default()
        };
        let shapes = snapshot.item_entry(Category::Shapes, "Circle");
        shapes.listening = ActivityStats {
            count: 5,
            fail_count: 2,
            ..ActivityStats::default()
        };
        shapes.completed = true;

        let mut analysis = WeaknessAnalysis::empty();
        analysis.weakest_activities = vec![
            ActivityWeakness {
                activity_type: ActivityKind::Listening,
                average_success_rate: 60.0,
                total_attempts: 5,
                total_failures: 2,
                average_time: 0.0,
            },
            ActivityWeakness {
                activity_type: ActivityKind::Counting,
                average_success_rate: 25.0,
                total_attempts: 4,
                total_failures: 3,
                average_time: 0.0,
            },
        ];

        let recommendations = generate_recommendations(&snapshot, &analysis);
        assert_eq!(recommendations.len(), 4);

        assert_eq!(
            recommendations[0].focus,
            RecommendationFocus::Activity {
                activity: ActivityKind::Counting
            }
        );
        assert_eq!(recommendations[0].suggested_items, vec!["Numbers: 4".to_string()]);
        assert_eq!(recommendations[0].reason, "Success rate is only 25%");

        assert_eq!(
            recommendations[1].focus,
            RecommendationFocus::Completion {
                category: Category::Numbers
            }
        );
        assert_eq!(recommendations[1].suggested_items, vec!["4".to_string()]);
        assert_eq!(recommendations[1].reason, "Only 0% of Numbers completed");

        assert_eq!(
            recommendations[2].focus,
            RecommendationFocus::Completion {
                category: Category::Shapes
            }
        );
        assert!(recommendations[2].suggested_items.is_empty());

        assert_eq!(recommendations[3].priority, 2);
        assert_eq!(
            recommendations[3].suggested_items,
            vec!["Shapes: Circle".to_string()]
        );
    }
}
