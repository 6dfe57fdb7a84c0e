use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::activity::{ActivityKind, Category, PeriodType};
use crate::models::analysis::{
    ActivityRecommendation, ActivityWeaknessDetails, FocusItem, FocusedLearningPlan,
    WeaknessAnalysis,
};
use crate::models::input::{BatchActivityInput, QuizEvent, TracingEvent};
use crate::models::progress::Snapshot;
use crate::models::report::{
    CategoryDetailView, ChildStatistics, CompletionSummary, ParentProgressReport,
};
use crate::models::settings::EngineSettings;
use crate::services::settings_service::SettingsService;
use crate::services::snapshot_store::SnapshotStore;
use crate::services::{
    aggregator, progress_tracker, progress_updater, recommendation, report_service,
    weakness_analyzer,
};

/// Extra attempts after a write loses an optimistic-concurrency race.
pub const MAX_CONFLICT_RETRIES: usize = 3;

enum SettingsSource {
    Persisted(Arc<SettingsService>),
    Fixed(EngineSettings),
}

/// Ingestion and analysis for one learner at a time, on top of a snapshot
/// store. Activities land in the learner's Daily snapshot for "today" in
/// the configured time zone.
pub struct ProgressService<S: SnapshotStore> {
    store: S,
    settings: SettingsSource,
}

impl<S: SnapshotStore> ProgressService<S> {
    pub fn new(store: S, settings: Arc<SettingsService>) -> Self {
        Self {
            store,
            settings: SettingsSource::Persisted(settings),
        }
    }

    pub fn with_settings(store: S, settings: EngineSettings) -> Self {
        Self {
            store,
            settings: SettingsSource::Fixed(settings),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> AppResult<EngineSettings> {
        match &self.settings {
            SettingsSource::Persisted(service) => service.get(),
            SettingsSource::Fixed(settings) => Ok(settings.clone()),
        }
    }

    pub fn today(&self) -> AppResult<NaiveDate> {
        Ok(self.settings()?.today())
    }

    pub fn record_tracing(&self, user_id: &str, event: &TracingEvent) -> AppResult<Snapshot> {
        ensure_user(user_id)?;
        progress_updater::validate_tracing(event)?;
        self.write_today(user_id, |snapshot, now| {
            progress_updater::apply_tracing(snapshot, event, now)
        })
    }

    pub fn record_quiz(&self, user_id: &str, event: &QuizEvent) -> AppResult<Snapshot> {
        ensure_user(user_id)?;
        progress_updater::validate_quiz(event)?;
        self.write_today(user_id, |snapshot, now| {
            progress_updater::apply_quiz(snapshot, event, now)
        })
    }

    /// Applies the whole batch to today's snapshot in a single write, or
    /// nothing if any event is invalid.
    pub fn record_batch(&self, batch: &BatchActivityInput) -> AppResult<Snapshot> {
        progress_updater::validate_batch(batch)?;
        let saved = self.write_today(&batch.user_id, |snapshot, now| {
            progress_updater::apply_batch(snapshot, batch, now)
        })?;
        info!(
            target: "app::progress",
            user_id = %batch.user_id,
            tracing = batch.tracing_activities.len(),
            quizzes = batch.quiz_activities.len(),
            "batch recorded"
        );
        Ok(saved)
    }

    fn write_today<F>(&self, user_id: &str, apply: F) -> AppResult<Snapshot>
    where
        F: Fn(&mut Snapshot, DateTime<Utc>) -> AppResult<()>,
    {
        let today = self.today()?;
        let mut attempt = 0;

        loop {
            let mut snapshot = self
                .store
                .get_or_create(user_id, PeriodType::Daily, today)?;
            apply(&mut snapshot, Utc::now())?;

            match self.store.put(&snapshot) {
                Ok(saved) => {
                    info!(
                        target: "app::progress",
                        user_id,
                        period_start = %saved.period_start,
                        version = saved.version,
                        "progress recorded"
                    );
                    return Ok(saved);
                }
                Err(err) if err.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    warn!(
                        target: "app::progress",
                        user_id,
                        attempt,
                        "snapshot changed underneath, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Daily snapshots from `days` days ago through today, oldest first.
    pub fn window_snapshots(&self, user_id: &str, days: u32) -> AppResult<Vec<Snapshot>> {
        let today = self.today()?;
        let start = today - Duration::days(i64::from(days));
        self.store
            .query_range(user_id, PeriodType::Daily, start, today)
    }

    pub fn latest_snapshot(&self, user_id: &str) -> AppResult<Option<Snapshot>> {
        self.store.latest(user_id, PeriodType::Daily)
    }

    pub fn weakness_analysis(&self, user_id: &str) -> AppResult<WeaknessAnalysis> {
        let settings = self.settings()?;
        let snapshots = self.window_snapshots(user_id, settings.analysis_window_days)?;
        Ok(aggregator::analyze_window(
            &snapshots,
            settings.top_weak_items as usize,
        ))
    }

    pub fn focus_items(&self, user_id: &str) -> AppResult<Vec<FocusItem>> {
        let settings = self.settings()?;
        let analysis = self.weakness_analysis(user_id)?;
        Ok(recommendation::prioritized_focus_items(
            &analysis,
            settings.max_focus_items as usize,
        ))
    }

    pub fn learning_plan(&self, user_id: &str) -> AppResult<FocusedLearningPlan> {
        let settings = self.settings()?;
        let analysis = self.weakness_analysis(user_id)?;
        Ok(recommendation::generate_learning_plan(
            &analysis,
            settings.plan_duration,
            settings.today(),
            Utc::now(),
        ))
    }

    /// Recommendations against the most recent Daily snapshot; none yet
    /// means nothing to recommend.
    pub fn recommendations(&self, user_id: &str) -> AppResult<Vec<ActivityRecommendation>> {
        let Some(snapshot) = self.latest_snapshot(user_id)? else {
            return Ok(Vec::new());
        };
        let analysis = self.weakness_analysis(user_id)?;
        Ok(recommendation::generate_recommendations(&snapshot, &analysis))
    }

    pub fn activity_weakness_details(
        &self,
        user_id: &str,
    ) -> AppResult<BTreeMap<ActivityKind, ActivityWeaknessDetails>> {
        let settings = self.settings()?;
        let snapshots = self.window_snapshots(user_id, settings.analysis_window_days)?;
        Ok(weakness_analyzer::activity_weakness_details(&snapshots))
    }

    pub fn statistics(&self, user_id: &str) -> AppResult<ChildStatistics> {
        let settings = self.settings()?;
        let snapshots = self.window_snapshots(user_id, settings.statistics_window_days)?;
        Ok(report_service::child_statistics(
            user_id,
            &snapshots,
            settings.statistics_window_days,
            Utc::now(),
        ))
    }

    /// Report on the most recent Daily snapshot. `NotFound` if the learner
    /// has no progress at all.
    pub fn parent_report(&self, user_id: &str) -> AppResult<ParentProgressReport> {
        let settings = self.settings()?;
        let snapshot = self
            .latest_snapshot(user_id)?
            .ok_or_else(AppError::not_found)?;
        let analysis = self.weakness_analysis(user_id)?;
        Ok(report_service::parent_report(
            &snapshot,
            &analysis,
            settings.max_focus_items as usize,
            Utc::now(),
        ))
    }

    pub fn completion_summary(&self, user_id: &str) -> AppResult<CompletionSummary> {
        let snapshot = self.latest_snapshot(user_id)?;
        Ok(progress_tracker::completion_summary(
            user_id,
            snapshot.as_ref(),
            Utc::now(),
        ))
    }

    pub fn category_details(
        &self,
        user_id: &str,
        category: Category,
    ) -> AppResult<CategoryDetailView> {
        let snapshot = self.latest_snapshot(user_id)?;
        Ok(progress_tracker::category_details(
            snapshot.as_ref(),
            category,
        ))
    }

    pub fn delete_user(&self, user_id: &str) -> AppResult<usize> {
        ensure_user(user_id)?;
        let deleted = self.store.delete_user(user_id)?;
        info!(target: "app::progress", user_id, deleted, "user progress deleted");
        Ok(deleted)
    }
}

fn ensure_user(user_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::validation("userId", "user id cannot be empty"));
    }
    Ok(())
}
