// Multi-day analysis, plans and reports over a SQLite store.

use chrono::{Duration, Utc};
use numberland_progress_lib::db::DbPool;
use numberland_progress_lib::models::activity::{ActivityKind, Category, PeriodType};
use numberland_progress_lib::models::analysis::RecommendationFocus;
use numberland_progress_lib::models::input::TracingEvent;
use numberland_progress_lib::services::progress_updater;
use numberland_progress_lib::state::{AppState, SqliteProgressService};
use numberland_progress_lib::SnapshotStore;
use tempfile::{tempdir, TempDir};

const USER: &str = "child-1";

fn setup() -> (AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");
    (AppState::new(pool), dir)
}

/// An unfinished tracing attempt on a day `days_ago` before today.
fn seed(progress: &SqliteProgressService, days_ago: i64, label: &str, stars: i32) {
    let day = progress.today().expect("today") - Duration::days(days_ago);
    let mut snapshot = progress
        .store()
        .get_or_create(USER, PeriodType::Daily, day)
        .expect("snapshot");
    progress_updater::apply_tracing(
        &mut snapshot,
        &TracingEvent::new(Category::Numbers, label, false, stars, 4.0),
        Utc::now(),
    )
    .expect("apply");
    progress.store().put(&snapshot).expect("put");
}

/// "8" scores 1/3 stars two days ago and 2/3 today; "9" is older than the
/// analysis window.
fn seeded() -> (AppState, TempDir) {
    let (state, dir) = setup();
    let progress = state.progress();
    seed(&progress, 8, "9", 0);
    seed(&progress, 2, "8", 1);
    progress
        .record_tracing(USER, &TracingEvent::new(Category::Numbers, "8", false, 2, 4.0))
        .expect("today");
    (state, dir)
}

#[test]
fn window_scores_are_averaged() {
    let (state, _dir) = seeded();
    let analysis = state.progress().weakness_analysis(USER).expect("analysis");

    let numbers = analysis.items_for(Category::Numbers);
    assert_eq!(numbers.len(), 1);
    let eight = &numbers[0];
    assert_eq!(eight.item_name, "8");
    assert!((eight.overall_score - 50.0).abs() < 1e-9);
    assert_eq!(eight.total_attempts, 2);
    assert_eq!(eight.weakest_activity, ActivityKind::Tracing);
    assert!(!eight.completed);

    assert_eq!(analysis.weakest_activities.len(), 1);
    let tracing = &analysis.weakest_activities[0];
    assert_eq!(tracing.activity_type, ActivityKind::Tracing);
    assert_eq!(tracing.average_success_rate, 0.0);
    assert_eq!(tracing.total_failures, 2);
}

#[test]
fn plan_spreads_focus_items_over_days() {
    let (state, _dir) = seeded();
    let progress = state.progress();

    let focus = progress.focus_items(USER).expect("focus");
    assert_eq!(focus.len(), 1);
    // 100 - 50, +20 under-practiced, +10 incomplete
    assert!((focus[0].priority - 80.0).abs() < 1e-9);

    let plan = progress.learning_plan(USER).expect("plan");
    assert_eq!(plan.plan_duration, 7);
    assert_eq!(plan.daily_focus_items.len(), 7);
    assert_eq!(plan.total_items(), 1);

    let first = &plan.daily_focus_items[0];
    assert_eq!(first.day, 1);
    assert_eq!(first.date, progress.today().expect("today"));
    assert_eq!(first.estimated_duration, 5);
    assert_eq!(first.focus_items[0].item_name, "8");
    assert_eq!(first.focus_items[0].target_score, 80);
    assert_eq!(first.focus_items[0].reason, "Current score: 50%");
    assert_eq!(plan.daily_focus_items[6].estimated_duration, 0);
}

#[test]
fn recommendations_cover_activities_then_completion() {
    let (state, _dir) = seeded();
    let recommendations = state.progress().recommendations(USER).expect("recommendations");

    assert_eq!(recommendations.len(), 2);
    assert_eq!(
        recommendations[0].focus,
        RecommendationFocus::Activity {
            activity: ActivityKind::Tracing
        }
    );
    assert_eq!(recommendations[0].reason, "Success rate is only 0%");
    assert_eq!(recommendations[0].suggested_items, vec!["Numbers: 8".to_string()]);

    assert_eq!(
        recommendations[1].focus,
        RecommendationFocus::Completion {
            category: Category::Numbers
        }
    );
    assert_eq!(recommendations[1].reason, "Only 0% of Numbers completed");
    assert!(recommendations.iter().all(|r| r.priority == 1));
}

#[test]
fn activity_details_ignore_days_outside_window() {
    let (state, _dir) = seeded();
    let details = state
        .progress()
        .activity_weakness_details(USER)
        .expect("details");

    let tracing = &details[&ActivityKind::Tracing];
    assert_eq!(tracing.total_attempts, 2);
    assert_eq!(tracing.top_weak_items, vec!["Numbers:8".to_string()]);
    assert_eq!(tracing.weak_items_by_category[&Category::Numbers].len(), 1);

    let counting = &details[&ActivityKind::Counting];
    assert_eq!(counting.total_attempts, 0);
    assert!(counting.weak_items_by_category.is_empty());
}

#[test]
fn statistics_use_the_longer_window() {
    let (state, _dir) = seeded();
    let stats = state.progress().statistics(USER).expect("statistics");

    assert_eq!(stats.analysis_period_days, 30);
    assert_eq!(stats.total_days_active, 3);
    assert_eq!(stats.total_activities_attempted, 3);
    assert_eq!(stats.total_activities_completed, 0);
    assert_eq!(stats.overall_success_rate, 0.0);
    assert!((stats.average_session_time() - 4.0).abs() < 1e-9);
}

#[test]
fn parent_report_describes_latest_day() {
    let (state, _dir) = seeded();
    let report = state.progress().parent_report(USER).expect("report");

    assert_eq!(report.child_user_id, USER);
    assert_eq!(report.report_period, PeriodType::Daily);
    assert_eq!(report.total_activities, 1);
    assert_eq!(report.category_progress.len(), 1);

    let numbers = &report.category_progress[&Category::Numbers];
    assert_eq!(numbers.items_attempted, 1);
    assert_eq!(numbers.weak_items, vec!["8".to_string()]);

    let tracing = &report.activity_performance[&ActivityKind::Tracing];
    assert!(tracing.needs_improvement);
    assert_eq!(tracing.weak_categories, vec![Category::Numbers]);
    assert_eq!(report.activity_performance.len(), 1);

    assert_eq!(report.top_priority_items[0].item_name, "8");
}

#[test]
fn settings_changes_reach_analysis() {
    let (state, _dir) = seeded();
    state
        .settings()
        .update(numberland_progress_lib::models::settings::SettingsUpdateInput {
            analysis_window_days: Some(1),
            plan_duration: Some(3),
            ..Default::default()
        })
        .expect("update");

    let progress = state.progress();
    let analysis = progress.weakness_analysis(USER).expect("analysis");
    let eight = &analysis.items_for(Category::Numbers)[0];
    // only today remains in the window
    assert!((eight.overall_score - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(eight.total_attempts, 1);

    assert_eq!(progress.learning_plan(USER).expect("plan").daily_focus_items.len(), 3);
}
