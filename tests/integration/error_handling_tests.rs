// Error handling and edge case tests

use chrono::Utc;
use numberland_progress_lib::db::DbPool;
use numberland_progress_lib::models::activity::{Category, PeriodType, QuizType};
use numberland_progress_lib::models::input::{QuizDetail, QuizEvent, TracingEvent};
use numberland_progress_lib::models::settings::SettingsUpdateInput;
use numberland_progress_lib::services::settings_service::SettingsService;
use numberland_progress_lib::state::AppState;
use numberland_progress_lib::{AppError, SnapshotStore};
use tempfile::{tempdir, TempDir};

fn setup() -> (DbPool, AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");
    let state = AppState::new(pool.clone());
    (pool, state, dir)
}

fn quiz(details: Vec<QuizDetail>) -> QuizEvent {
    QuizEvent::new(Category::Shapes, "Circle", details)
}

#[test]
fn tracing_validation_names_the_field() {
    let (_pool, state, _dir) = setup();
    let progress = state.progress();

    let cases = [
        (
            TracingEvent::new(Category::Numbers, "1", true, 4, 1.0),
            "starsAchieved",
        ),
        (
            TracingEvent::new(Category::Numbers, "1", true, -1, 1.0),
            "starsAchieved",
        ),
        (
            TracingEvent::new(Category::Numbers, "1", true, 0, 1.0).with_max_stars(0),
            "maxStars",
        ),
        (
            TracingEvent::new(Category::Numbers, "1", true, 1, -2.0),
            "totalTime",
        ),
        (
            TracingEvent::new(Category::Numbers, "1", true, 1, f64::NAN),
            "totalTime",
        ),
        (
            TracingEvent::new(Category::Numbers, "   ", true, 1, 1.0),
            "itemLabel",
        ),
    ];

    for (event, field) in cases {
        let err = progress.record_tracing("child-1", &event).expect_err(field);
        assert_eq!(err.validation_field(), Some(field), "{event:?}");
    }
    assert!(progress.latest_snapshot("child-1").expect("latest").is_none());
}

#[test]
fn quiz_validation_is_indexed() {
    let (_pool, state, _dir) = setup();
    let progress = state.progress();

    let err = progress
        .record_quiz("child-1", &quiz(Vec::new()))
        .expect_err("no details");
    assert_eq!(err.validation_field(), Some("quizDetails"));

    let ok = QuizDetail::new(QuizType::FigureToText, 3, 3, false, 2.0, 70);
    let cases = [
        (QuizDetail::new(QuizType::FigureToText, 4, 3, false, 2.0, 70), "quizDetails[1].livesRemaining"),
        (QuizDetail::new(QuizType::FigureToText, 0, 0, false, 2.0, 70), "quizDetails[1].totalLives"),
        (QuizDetail::new(QuizType::FigureToText, 1, 3, false, -1.0, 70), "quizDetails[1].timeTaken"),
        (QuizDetail::new(QuizType::FigureToText, 1, 3, false, 1.0, -5), "quizDetails[1].score"),
        (
            QuizDetail {
                time_given: Some(0.0),
                ..ok.clone()
            },
            "quizDetails[1].timeGiven",
        ),
    ];

    for (bad, field) in cases {
        let err = progress
            .record_quiz("child-1", &quiz(vec![ok.clone(), bad]))
            .expect_err(field);
        assert_eq!(err.validation_field(), Some(field));
    }
    assert!(progress.latest_snapshot("child-1").expect("latest").is_none());
}

#[test]
fn stale_sqlite_write_is_a_conflict() {
    let (_pool, state, _dir) = setup();
    let progress = state.progress();
    let store = progress.store();
    let day = progress.today().expect("today");

    let mut first = store
        .get_or_create("child-1", PeriodType::Daily, day)
        .expect("fresh");
    let mut second = first.clone();

    first.item_entry(Category::Colors, "Red").tracing_count = 1;
    store.put(&first).expect("first writer wins");

    second.item_entry(Category::Colors, "Blue").tracing_count = 1;
    let err = store.put(&second).expect_err("second writer loses");
    assert!(err.is_conflict());

    let stored = store
        .find("child-1", PeriodType::Daily, day)
        .expect("find")
        .expect("stored");
    assert_eq!(stored.version, 1);
    assert!(stored.item(Category::Colors, "Blue").is_none());

    // a writer that reloads gets through
    let mut reloaded = stored;
    reloaded.item_entry(Category::Colors, "Blue").tracing_count = 1;
    reloaded.touch(Utc::now());
    assert_eq!(store.put(&reloaded).expect("reloaded").version, 2);
}

#[test]
fn report_without_progress_is_not_found() {
    let (_pool, state, _dir) = setup();
    let err = state.progress().parent_report("nobody").expect_err("no data");
    assert!(matches!(err, AppError::NotFound));

    let summary = state.progress().completion_summary("nobody").expect("summary");
    assert!(summary
        .category_completions
        .values()
        .all(|completion| completion.attempted_items == 0));
}

#[test]
fn invalid_settings_are_rejected_without_side_effects() {
    let (_pool, state, _dir) = setup();
    let settings = state.settings();

    let err = settings
        .update(SettingsUpdateInput {
            plan_duration: Some(5),
            timezone: Some("Mars/Olympus".to_string()),
            ..Default::default()
        })
        .expect_err("unknown zone");
    assert_eq!(err.validation_field(), Some("timezone"));

    for input in [
        SettingsUpdateInput {
            analysis_window_days: Some(0),
            ..Default::default()
        },
        SettingsUpdateInput {
            plan_duration: Some(32),
            ..Default::default()
        },
        SettingsUpdateInput {
            max_focus_items: Some(101),
            ..Default::default()
        },
    ] {
        assert!(matches!(
            settings.update(input),
            Err(AppError::Validation { .. })
        ));
    }

    assert_eq!(settings.get().expect("settings").plan_duration, 7);
}

#[test]
fn corrupt_stored_settings_fall_back_to_defaults() {
    let (pool, _state, _dir) = setup();
    pool.with_connection(|conn| {
        conn.execute(
            "INSERT INTO app_settings (key, value, updated_at) VALUES ('plan_duration', 'soon', ?1), ('timezone', 'Nowhere/City', ?1)",
            [Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
    .expect("seed settings");

    let settings = SettingsService::new(pool).get().expect("settings");
    assert_eq!(settings.plan_duration, 7);
    assert_eq!(settings.timezone, "UTC");
}
