//! Applies tracing and quiz events to a snapshot.
//!
//! Every event is validated in full before the snapshot is touched, so a
//! rejected event leaves the snapshot exactly as it was.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::activity::Category;
use crate::models::input::{
    BatchActivityInput, QuizEvent, TracingEvent, MAX_STARS_CEILING, QUIZ_COMPLETION_SCORE,
};
use crate::models::progress::{ItemProgress, Snapshot};

fn field(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn ensure_label(prefix: &str, label: &str) -> AppResult<()> {
    if label.trim().is_empty() {
        return Err(AppError::validation(
            field(prefix, "itemLabel"),
            "item label cannot be empty",
        ));
    }
    Ok(())
}

fn ensure_duration(name: String, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(
            name,
            "time must be a finite, non-negative number of seconds",
        ));
    }
    Ok(())
}

pub fn validate_tracing(event: &TracingEvent) -> AppResult<()> {
    validate_tracing_at("", event)
}

fn validate_tracing_at(prefix: &str, event: &TracingEvent) -> AppResult<()> {
    ensure_label(prefix, &event.item_label)?;

    if event.max_stars <= 0 || event.max_stars > MAX_STARS_CEILING {
        return Err(AppError::validation(
            field(prefix, "maxStars"),
            format!("max stars must be between 1 and {MAX_STARS_CEILING}"),
        ));
    }
    if event.stars_achieved < 0 {
        return Err(AppError::validation(
            field(prefix, "starsAchieved"),
            "stars achieved cannot be negative",
        ));
    }
    if event.stars_achieved > event.max_stars {
        return Err(AppError::validation(
            field(prefix, "starsAchieved"),
            format!(
                "stars achieved ({}) cannot exceed max stars ({})",
                event.stars_achieved, event.max_stars
            ),
        ));
    }

    ensure_duration(field(prefix, "totalTime"), event.total_time)
}

pub fn validate_quiz(event: &QuizEvent) -> AppResult<()> {
    validate_quiz_at("", event)
}

fn validate_quiz_at(prefix: &str, event: &QuizEvent) -> AppResult<()> {
    ensure_label(prefix, &event.item_label)?;

    if event.quiz_details.is_empty() {
        return Err(AppError::validation(
            field(prefix, "quizDetails"),
            "at least one quiz detail is required",
        ));
    }

    for (index, detail) in event.quiz_details.iter().enumerate() {
        let at = |name: &str| field(prefix, &format!("quizDetails[{index}].{name}"));

        if detail.total_lives <= 0 {
            return Err(AppError::validation(
                at("totalLives"),
                "total lives must be greater than zero",
            ));
        }
        if detail.lives_remaining < 0 || detail.lives_remaining > detail.total_lives {
            return Err(AppError::validation(
                at("livesRemaining"),
                format!(
                    "lives remaining must be between 0 and {}",
                    detail.total_lives
                ),
            ));
        }
        ensure_duration(at("timeTaken"), detail.time_taken)?;
        if let Some(given) = detail.time_given {
            if !given.is_finite() || given <= 0.0 {
                return Err(AppError::validation(
                    at("timeGiven"),
                    "time given must be greater than zero",
                ));
            }
        }
        if !(0..=100).contains(&detail.score) {
            return Err(AppError::validation(
                at("score"),
                "score must be between 0 and 100",
            ));
        }
    }

    Ok(())
}

pub fn validate_batch(batch: &BatchActivityInput) -> AppResult<()> {
    if batch.user_id.trim().is_empty() {
        return Err(AppError::validation("userId", "user id cannot be empty"));
    }
    for (index, event) in batch.tracing_activities.iter().enumerate() {
        validate_tracing_at(&format!("tracingActivities[{index}]"), event)?;
    }
    for (index, event) in batch.quiz_activities.iter().enumerate() {
        validate_quiz_at(&format!("quizActivities[{index}]"), event)?;
    }
    Ok(())
}

pub fn apply_tracing(
    snapshot: &mut Snapshot,
    event: &TracingEvent,
    now: DateTime<Utc>,
) -> AppResult<()> {
    validate_tracing(event)?;
    record_tracing("", snapshot, event, now)
}

pub fn apply_quiz(snapshot: &mut Snapshot, event: &QuizEvent, now: DateTime<Utc>) -> AppResult<()> {
    validate_quiz(event)?;
    record_quiz("", snapshot, event, now)
}

/// Applies a whole batch, tracing events first. Nothing is applied unless the
/// entire batch validates and fits the item counters.
pub fn apply_batch(
    snapshot: &mut Snapshot,
    batch: &BatchActivityInput,
    now: DateTime<Utc>,
) -> AppResult<()> {
    validate_batch(batch)?;

    let mut working = snapshot.clone();
    for (index, event) in batch.tracing_activities.iter().enumerate() {
        record_tracing(&format!("tracingActivities[{index}]"), &mut working, event, now)?;
    }
    for (index, event) in batch.quiz_activities.iter().enumerate() {
        record_quiz(&format!("quizActivities[{index}]"), &mut working, event, now)?;
    }
    *snapshot = working;
    Ok(())
}

fn add(counter: u32, amount: u32, name: impl FnOnce() -> String) -> AppResult<u32> {
    counter.checked_add(amount).ok_or_else(|| {
        AppError::validation(name(), "recorded total would exceed the supported range")
    })
}

fn current_item(snapshot: &Snapshot, category: Category, label: &str) -> ItemProgress {
    snapshot
        .item(category, label)
        .cloned()
        .unwrap_or_else(|| ItemProgress::new(label))
}

// Validated input only; the casts below are on values in 0..=MAX_STARS_CEILING.
// The item is updated on a copy and written back only once every counter fits.
fn record_tracing(
    prefix: &str,
    snapshot: &mut Snapshot,
    event: &TracingEvent,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let label = event.item_label.trim();
    let mut item = current_item(snapshot, event.category, label);

    item.tracing_count = add(item.tracing_count, 1, || field(prefix, "itemLabel"))?;
    if event.completed {
        item.tracing_complete_count =
            add(item.tracing_complete_count, 1, || field(prefix, "completed"))?;
        item.completed = true;
    }
    item.tracing_total_time += event.total_time;
    item.total_stars = add(item.total_stars, event.max_stars as u32, || {
        field(prefix, "maxStars")
    })?;
    item.total_stars_achieved = add(
        item.total_stars_achieved,
        event.stars_achieved as u32,
        || field(prefix, "starsAchieved"),
    )?;

    *snapshot.item_entry(event.category, label) = item;

    debug!(
        target: "app::progress",
        user_id = %snapshot.user_id,
        category = %event.category,
        item = %label,
        completed = event.completed,
        "tracing applied"
    );
    snapshot.touch(now);
    Ok(())
}

fn record_quiz(
    prefix: &str,
    snapshot: &mut Snapshot,
    event: &QuizEvent,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let label = event.item_label.trim();
    let mut item = current_item(snapshot, event.category, label);

    for (index, detail) in event.quiz_details.iter().enumerate() {
        let at = || field(prefix, &format!("quizDetails[{index}]"));
        let failed = detail.is_failed();

        let stats = item.quiz_stats_mut(detail.quiz_type);
        stats.count = add(stats.count, 1, at)?;
        stats.total_time += detail.time_taken;
        if failed {
            stats.fail_count = add(stats.fail_count, 1, at)?;
            stats.total_fail_time += detail.time_taken;
        }
        if detail.timed_out {
            stats.time_out_count = add(stats.time_out_count, 1, at)?;
        }

        item.quiz_count = add(item.quiz_count, 1, at)?;
        item.quiz_total_time += detail.time_taken;
        if failed {
            item.quiz_fail_count = add(item.quiz_fail_count, 1, at)?;
        }
        if detail.timed_out {
            item.quiz_time_out_count = add(item.quiz_time_out_count, 1, at)?;
        }
    }

    // Judged per batch; a weaker later batch never clears the flag.
    if event.all_scores_reach(QUIZ_COMPLETION_SCORE) {
        item.completed = true;
    }

    *snapshot.item_entry(event.category, label) = item;

    debug!(
        target: "app::progress",
        user_id = %snapshot.user_id,
        category = %event.category,
        item = %label,
        details = event.quiz_details.len(),
        "quiz applied"
    );
    snapshot.touch(now);
    Ok(())
}
