use serde::{Deserialize, Serialize};

use crate::models::activity::{Category, QuizType};

/// Score below which a quiz attempt counts as failed.
pub const QUIZ_PASS_SCORE: i32 = 50;
/// Every detail of a quiz batch must reach this score to complete the item.
pub const QUIZ_COMPLETION_SCORE: i32 = 80;

pub const DEFAULT_MAX_STARS: i32 = 3;
/// Largest star scale a single tracing attempt may report.
pub const MAX_STARS_CEILING: i32 = 100;

fn default_max_stars() -> i32 {
    DEFAULT_MAX_STARS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracingEvent {
    pub category: Category,
    pub item_label: String,
    pub completed: bool,
    pub stars_achieved: i32,
    #[serde(default = "default_max_stars")]
    pub max_stars: i32,
    pub total_time: f64,
}

impl TracingEvent {
    pub fn new(
        category: Category,
        item_label: impl Into<String>,
        completed: bool,
        stars_achieved: i32,
        total_time: f64,
    ) -> Self {
        Self {
            category,
            item_label: item_label.into(),
            completed,
            stars_achieved,
            max_stars: DEFAULT_MAX_STARS,
            total_time,
        }
    }

    pub fn with_max_stars(mut self, max_stars: i32) -> Self {
        self.max_stars = max_stars;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum QuizPerformanceLevel {
    Failed,
    BelowAverage,
    Average,
    Good,
    Excellent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    #[serde(rename = "type")]
    pub quiz_type: QuizType,
    pub lives_remaining: i32,
    pub total_lives: i32,
    pub timed_out: bool,
    pub time_taken: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_given: Option<f64>,
    pub score: i32,
}

impl QuizDetail {
    pub fn new(
        quiz_type: QuizType,
        lives_remaining: i32,
        total_lives: i32,
        timed_out: bool,
        time_taken: f64,
        score: i32,
    ) -> Self {
        Self {
            quiz_type,
            lives_remaining,
            total_lives,
            timed_out,
            time_taken,
            time_given: None,
            score,
        }
    }

    /// An attempt fails when the child runs out of lives, scores below the
    /// pass mark, or runs out of time.
    pub fn is_failed(&self) -> bool {
        self.lives_remaining == 0 || self.score < QUIZ_PASS_SCORE || self.timed_out
    }

    pub fn performance_level(&self) -> QuizPerformanceLevel {
        if self.is_failed() {
            QuizPerformanceLevel::Failed
        } else if self.score >= 90 {
            QuizPerformanceLevel::Excellent
        } else if self.score >= 80 {
            QuizPerformanceLevel::Good
        } else if self.score >= 70 {
            QuizPerformanceLevel::Average
        } else {
            QuizPerformanceLevel::BelowAverage
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizPerformanceSummary {
    pub total_quizzes: u32,
    pub passed_quizzes: u32,
    pub failed_quizzes: u32,
    pub timeout_quizzes: u32,
    pub average_score: f64,
    pub total_time: f64,
    pub average_time: f64,
}

impl QuizPerformanceSummary {
    pub fn pass_rate(&self) -> f64 {
        if self.total_quizzes == 0 {
            return 0.0;
        }
        f64::from(self.passed_quizzes) / f64::from(self.total_quizzes) * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEvent {
    pub category: Category,
    pub item_label: String,
    pub quiz_details: Vec<QuizDetail>,
}

impl QuizEvent {
    pub fn new(
        category: Category,
        item_label: impl Into<String>,
        quiz_details: Vec<QuizDetail>,
    ) -> Self {
        Self {
            category,
            item_label: item_label.into(),
            quiz_details,
        }
    }

    /// Timeouts are counted before failures, so a timed-out attempt is never
    /// also reported as failed here.
    pub fn performance_summary(&self) -> QuizPerformanceSummary {
        if self.quiz_details.is_empty() {
            return QuizPerformanceSummary::default();
        }

        let mut summary = QuizPerformanceSummary::default();
        let mut total_score = 0.0;

        for detail in &self.quiz_details {
            summary.total_quizzes += 1;
            summary.total_time += detail.time_taken;
            total_score += f64::from(detail.score);

            if detail.timed_out {
                summary.timeout_quizzes += 1;
            } else if detail.lives_remaining == 0 || detail.score < QUIZ_PASS_SCORE {
                summary.failed_quizzes += 1;
            } else {
                summary.passed_quizzes += 1;
            }
        }

        let total = f64::from(summary.total_quizzes);
        summary.average_score = total_score / total;
        summary.average_time = summary.total_time / total;
        summary
    }

    pub fn all_scores_reach(&self, threshold: i32) -> bool {
        self.quiz_details.iter().all(|detail| detail.score >= threshold)
    }
}

/// Several activities for one user, applied together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchActivityInput {
    pub user_id: String,
    #[serde(default)]
    pub tracing_activities: Vec<TracingEvent>,
    #[serde(default)]
    pub quiz_activities: Vec<QuizEvent>,
}
