// Ingestion through the SQLite-backed façade.

use numberland_progress_lib::db::DbPool;
use numberland_progress_lib::models::activity::{ActivityKind, Category, PeriodType, QuizType};
use numberland_progress_lib::models::input::{BatchActivityInput, QuizDetail, QuizEvent, TracingEvent};
use numberland_progress_lib::services::scoring;
use numberland_progress_lib::state::AppState;
use numberland_progress_lib::SnapshotStore;
use tempfile::{tempdir, TempDir};

fn setup() -> (AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");
    (AppState::new(pool), dir)
}

#[test]
fn events_accumulate_in_todays_snapshot() {
    let (state, _dir) = setup();
    let progress = state.progress();

    progress
        .record_tracing(
            "child-1",
            &TracingEvent::new(Category::Numbers, "3", true, 3, 12.0),
        )
        .expect("tracing");
    let saved = progress
        .record_quiz(
            "child-1",
            &QuizEvent::new(
                Category::Numbers,
                "3",
                vec![
                    QuizDetail::new(QuizType::Counting, 2, 3, false, 5.0, 90),
                    QuizDetail::new(QuizType::BubblePop, 0, 3, false, 7.0, 60),
                ],
            ),
        )
        .expect("quiz");

    assert_eq!(saved.version, 2);
    assert_eq!(saved.period_start, progress.today().expect("today"));

    let stored = progress
        .latest_snapshot("child-1")
        .expect("latest")
        .expect("snapshot exists");
    assert_eq!(stored.version, 2);

    let item = stored.item(Category::Numbers, "3").expect("item");
    assert!(item.completed);
    assert_eq!(item.tracing_count, 1);
    assert_eq!(item.tracing_complete_count, 1);
    assert_eq!(item.total_stars_achieved, 3);
    assert_eq!(item.quiz_count, 2);
    assert_eq!(item.quiz_fail_count, 1);
    assert_eq!(item.counting.count, 1);
    assert_eq!(item.bubble_pop.fail_count, 1);
    assert_eq!(item.bubble_pop.total_fail_time, 7.0);

    // tracing 100, quiz 50, counting 100, bubble pop 0
    assert!((scoring::overall_score(item) - 62.5).abs() < 1e-9);
    assert_eq!(scoring::weakest_activity(item), ActivityKind::BubblePop);
    assert_eq!(scoring::total_time_spent(item), 24.0);
}

#[test]
fn labels_are_trimmed_into_one_item() {
    let (state, _dir) = setup();
    let progress = state.progress();

    for label in ["Red", " Red "] {
        progress
            .record_tracing(
                "child-1",
                &TracingEvent::new(Category::Colors, label, false, 1, 2.0),
            )
            .expect("tracing");
    }

    let stored = progress
        .latest_snapshot("child-1")
        .expect("latest")
        .expect("snapshot");
    assert_eq!(stored.item_count(), 1);
    assert_eq!(
        stored.item(Category::Colors, "Red").expect("item").tracing_count,
        2
    );
}

#[test]
fn batch_is_applied_in_one_write() {
    let (state, _dir) = setup();
    let progress = state.progress();

    let batch = BatchActivityInput {
        user_id: "child-1".to_string(),
        tracing_activities: vec![
            TracingEvent::new(Category::CapitalAlphabet, "A", true, 2, 9.0),
            TracingEvent::new(Category::SmallAlphabet, "b", false, 0, 4.0),
        ],
        quiz_activities: vec![QuizEvent::new(
            Category::Shapes,
            "Star",
            vec![QuizDetail::new(QuizType::ObjectRecognition, 3, 3, false, 3.0, 100)],
        )],
    };

    let saved = progress.record_batch(&batch).expect("batch");
    assert_eq!(saved.version, 1);
    assert_eq!(saved.item_count(), 3);

    let star = saved.item(Category::Shapes, "Star").expect("star");
    assert!(star.completed);
    assert_eq!(star.object_recognition.count, 1);
}

#[test]
fn rejected_batch_leaves_no_trace() {
    let (state, _dir) = setup();
    let progress = state.progress();

    let batch = BatchActivityInput {
        user_id: "child-1".to_string(),
        tracing_activities: vec![TracingEvent::new(Category::Numbers, "1", true, 3, 5.0)],
        quiz_activities: vec![QuizEvent::new(
            Category::Numbers,
            "1",
            vec![
                QuizDetail::new(QuizType::Listening, 3, 3, false, 2.0, 80),
                QuizDetail::new(QuizType::Listening, 3, 3, false, 2.0, 120),
            ],
        )],
    };

    let err = progress.record_batch(&batch).expect_err("invalid score");
    assert_eq!(
        err.validation_field(),
        Some("quizActivities[0].quizDetails[1].score")
    );
    assert!(progress.latest_snapshot("child-1").expect("latest").is_none());
}

#[test]
fn users_are_isolated_and_deletable() {
    let (state, _dir) = setup();
    let progress = state.progress();
    let event = TracingEvent::new(Category::Numbers, "5", true, 3, 4.0);

    progress.record_tracing("child-1", &event).expect("child-1");
    progress.record_tracing("child-2", &event).expect("child-2");

    assert_eq!(progress.delete_user("child-1").expect("delete"), 1);
    assert!(progress.latest_snapshot("child-1").expect("latest").is_none());
    assert!(progress
        .store()
        .find(
            "child-2",
            PeriodType::Daily,
            progress.today().expect("today")
        )
        .expect("find")
        .is_some());
}

#[test]
fn completion_views_follow_the_catalogue() {
    let (state, _dir) = setup();
    let progress = state.progress();

    progress
        .record_tracing(
            "child-1",
            &TracingEvent::new(Category::Numbers, "1", true, 3, 4.0),
        )
        .expect("one");
    progress
        .record_tracing(
            "child-1",
            &TracingEvent::new(Category::Numbers, "2", false, 1, 4.0),
        )
        .expect("two");

    let summary = progress.completion_summary("child-1").expect("summary");
    let numbers = &summary.category_completions[&Category::Numbers];
    assert_eq!(numbers.total_items, 10);
    assert_eq!(numbers.attempted_items, 2);
    assert_eq!(numbers.completed_items, 1);
    assert!((numbers.completion_percentage - 10.0).abs() < 1e-9);
    assert_eq!(numbers.not_attempted_items_list.len(), 8);
    assert_eq!(summary.category_completions[&Category::Colors].attempted_items, 0);

    let details = progress
        .category_details("child-1", Category::Numbers)
        .expect("details");
    assert_eq!(details.item_details.len(), 10);
    let one = &details.item_details[0];
    assert_eq!(one.item_name, "1");
    assert!(one.is_completed);
    assert_eq!(
        one.activity_status[&ActivityKind::Tracing].stars.as_deref(),
        Some("3/3")
    );
    assert!(!details.item_details[9].is_attempted);
}
