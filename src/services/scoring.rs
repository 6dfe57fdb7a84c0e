//! Per-item score functions. Every other service scores items through here.

use crate::models::activity::{ActivityKind, QuizType};
use crate::models::progress::ItemProgress;

/// Rate reported for an activity the child never tried.
pub const UNTRIED_ACTIVITY_RATE: f64 = 100.0;

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    f64::from(numerator) / f64::from(denominator) * 100.0
}

/// Stars earned out of stars available, if any tracing was scored.
pub fn tracing_star_rate(item: &ItemProgress) -> Option<f64> {
    (item.total_stars > 0).then(|| ratio(item.total_stars_achieved, item.total_stars))
}

pub fn tracing_completion_rate(item: &ItemProgress) -> f64 {
    ratio(item.tracing_complete_count, item.tracing_count)
}

pub fn quiz_pass_rate(item: &ItemProgress) -> f64 {
    ratio(item.quiz_count.saturating_sub(item.quiz_fail_count), item.quiz_count)
}

/// Unweighted mean of every component with at least one attempt: tracing
/// stars, generic quiz pass rate and the six quiz sub-type rates.
pub fn overall_score(item: &ItemProgress) -> f64 {
    let mut components = Vec::with_capacity(8);

    if let Some(rate) = tracing_star_rate(item) {
        components.push(rate);
    }
    if item.quiz_count > 0 {
        components.push(quiz_pass_rate(item));
    }
    for quiz_type in QuizType::ALL {
        let stats = item.quiz_stats(quiz_type);
        if stats.count > 0 {
            components.push(stats.success_rate());
        }
    }

    if components.is_empty() {
        return 0.0;
    }

    let score = components.iter().sum::<f64>() / components.len() as f64;
    score.clamp(0.0, 100.0)
}

/// Success rate of one activity label on an item. Untried activities count
/// as perfect.
pub fn activity_rate(item: &ItemProgress, activity: ActivityKind) -> f64 {
    match activity.quiz_type() {
        None if item.tracing_count == 0 => UNTRIED_ACTIVITY_RATE,
        None => tracing_completion_rate(item),
        Some(quiz_type) => {
            let stats = item.quiz_stats(quiz_type);
            if stats.count == 0 {
                UNTRIED_ACTIVITY_RATE
            } else {
                stats.success_rate()
            }
        }
    }
}

/// Lowest-rated activity; ties go to the earliest label in `ActivityKind::ALL`.
pub fn weakest_activity(item: &ItemProgress) -> ActivityKind {
    let mut weakest = ActivityKind::Tracing;
    let mut lowest = f64::INFINITY;

    for activity in ActivityKind::ALL {
        let rate = activity_rate(item, activity);
        if rate < lowest {
            lowest = rate;
            weakest = activity;
        }
    }

    weakest
}

pub fn completion_rate(item: &ItemProgress) -> f64 {
    if item.tracing_count == 0 && item.quiz_count == 0 {
        return 0.0;
    }
    (tracing_completion_rate(item) + quiz_pass_rate(item)) / 2.0
}

pub fn total_attempts(item: &ItemProgress) -> u32 {
    item.tracing_count + item.quiz_count
}

pub fn total_time_spent(item: &ItemProgress) -> f64 {
    item.tracing_total_time + item.quiz_total_time
}

pub fn is_attempted(item: &ItemProgress) -> bool {
    total_attempts(item) > 0
}
