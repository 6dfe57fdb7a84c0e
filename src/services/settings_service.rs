use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::RwLock;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::{SettingRow, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{EngineSettings, SettingsUpdateInput};

const KEY_ANALYSIS_WINDOW: &str = "analysis_window_days";
const KEY_STATISTICS_WINDOW: &str = "statistics_window_days";
const KEY_PLAN_DURATION: &str = "plan_duration";
const KEY_TOP_WEAK_ITEMS: &str = "top_weak_items";
const KEY_MAX_FOCUS_ITEMS: &str = "max_focus_items";
const KEY_TIMEZONE: &str = "timezone";

const DEFAULT_ANALYSIS_WINDOW: u32 = 7;
const DEFAULT_STATISTICS_WINDOW: u32 = 30;
const DEFAULT_PLAN_DURATION: u32 = 7;
const DEFAULT_TOP_WEAK_ITEMS: u32 = 5;
const DEFAULT_MAX_FOCUS_ITEMS: u32 = 10;
const DEFAULT_TIMEZONE: &str = "UTC";

const WINDOW_RANGE: RangeInclusive<u32> = 1..=365;
const PLAN_DURATION_RANGE: RangeInclusive<u32> = 1..=31;
const TOP_WEAK_ITEMS_RANGE: RangeInclusive<u32> = 1..=50;
const MAX_FOCUS_ITEMS_RANGE: RangeInclusive<u32> = 1..=100;

impl EngineSettings {
    pub fn defaults() -> Self {
        Self {
            analysis_window_days: DEFAULT_ANALYSIS_WINDOW,
            statistics_window_days: DEFAULT_STATISTICS_WINDOW,
            plan_duration: DEFAULT_PLAN_DURATION,
            top_weak_items: DEFAULT_TOP_WEAK_ITEMS,
            max_focus_items: DEFAULT_MAX_FOCUS_ITEMS,
            timezone: DEFAULT_TIMEZONE.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    /// The learner's current calendar day.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz()).date_naive()
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::defaults()
    }
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<EngineSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<EngineSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<EngineSettings> {
        let mut current = self.get()?;
        let mut changes: Vec<(&str, String)> = Vec::new();

        if let Some(days) = input.analysis_window_days {
            ensure_in_range("analysisWindowDays", days, &WINDOW_RANGE)?;
            current.analysis_window_days = days;
            changes.push((KEY_ANALYSIS_WINDOW, days.to_string()));
        }

        if let Some(days) = input.statistics_window_days {
            ensure_in_range("statisticsWindowDays", days, &WINDOW_RANGE)?;
            current.statistics_window_days = days;
            changes.push((KEY_STATISTICS_WINDOW, days.to_string()));
        }

        if let Some(days) = input.plan_duration {
            ensure_in_range("planDuration", days, &PLAN_DURATION_RANGE)?;
            current.plan_duration = days;
            changes.push((KEY_PLAN_DURATION, days.to_string()));
        }

        if let Some(count) = input.top_weak_items {
            ensure_in_range("topWeakItems", count, &TOP_WEAK_ITEMS_RANGE)?;
            current.top_weak_items = count;
            changes.push((KEY_TOP_WEAK_ITEMS, count.to_string()));
        }

        if let Some(count) = input.max_focus_items {
            ensure_in_range("maxFocusItems", count, &MAX_FOCUS_ITEMS_RANGE)?;
            current.max_focus_items = count;
            changes.push((KEY_MAX_FOCUS_ITEMS, count.to_string()));
        }

        if let Some(timezone) = input.timezone.as_ref() {
            let trimmed = timezone.trim();
            if trimmed.parse::<Tz>().is_err() {
                return Err(AppError::validation(
                    "timezone",
                    format!("`{trimmed}` is not a known IANA time zone"),
                ));
            }
            current.timezone = trimmed.to_string();
            changes.push((KEY_TIMEZONE, trimmed.to_string()));
        }

        if !changes.is_empty() {
            self.db
                .with_connection(|conn| SettingsRepository::upsert_many(conn, &changes))?;
            info!(
                target: "app::settings",
                keys = ?changes.iter().map(|(key, _)| *key).collect::<Vec<_>>(),
                "settings updated"
            );
        }
        current.updated_at = Utc::now().to_rfc3339();

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        Ok(current)
    }

    /// Drops stored overrides and returns to defaults.
    pub fn reset(&self) -> AppResult<EngineSettings> {
        self.db.with_connection(|conn| {
            for key in [
                KEY_ANALYSIS_WINDOW,
                KEY_STATISTICS_WINDOW,
                KEY_PLAN_DURATION,
                KEY_TOP_WEAK_ITEMS,
                KEY_MAX_FOCUS_ITEMS,
                KEY_TIMEZONE,
            ] {
                SettingsRepository::delete(conn, key)?;
            }
            Ok(())
        })?;

        let defaults = EngineSettings::defaults();
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(defaults.clone());
        }
        Ok(defaults)
    }

    fn load_settings_from_db(&self) -> AppResult<EngineSettings> {
        self.db.with_connection(|conn| {
            let rows = SettingsRepository::list(conn)?;
            let latest_updated_at = rows.iter().map(|row| row.updated_at.clone()).max();
            let map: HashMap<String, SettingRow> =
                rows.into_iter().map(|row| (row.key.clone(), row)).collect();

            let timezone = match map.get(KEY_TIMEZONE) {
                Some(row) if row.value.parse::<Tz>().is_ok() => row.value.clone(),
                Some(row) => {
                    warn!(
                        target: "app::settings",
                        value = %row.value,
                        "stored timezone invalid, falling back to default"
                    );
                    DEFAULT_TIMEZONE.to_string()
                }
                None => DEFAULT_TIMEZONE.to_string(),
            };

            Ok(EngineSettings {
                analysis_window_days: stored_number(
                    &map,
                    KEY_ANALYSIS_WINDOW,
                    &WINDOW_RANGE,
                    DEFAULT_ANALYSIS_WINDOW,
                ),
                statistics_window_days: stored_number(
                    &map,
                    KEY_STATISTICS_WINDOW,
                    &WINDOW_RANGE,
                    DEFAULT_STATISTICS_WINDOW,
                ),
                plan_duration: stored_number(
                    &map,
                    KEY_PLAN_DURATION,
                    &PLAN_DURATION_RANGE,
                    DEFAULT_PLAN_DURATION,
                ),
                top_weak_items: stored_number(
                    &map,
                    KEY_TOP_WEAK_ITEMS,
                    &TOP_WEAK_ITEMS_RANGE,
                    DEFAULT_TOP_WEAK_ITEMS,
                ),
                max_focus_items: stored_number(
                    &map,
                    KEY_MAX_FOCUS_ITEMS,
                    &MAX_FOCUS_ITEMS_RANGE,
                    DEFAULT_MAX_FOCUS_ITEMS,
                ),
                timezone,
                updated_at: latest_updated_at.unwrap_or_else(|| Utc::now().to_rfc3339()),
            })
        })
    }
}

fn stored_number(
    map: &HashMap<String, SettingRow>,
    key: &str,
    range: &RangeInclusive<u32>,
    default: u32,
) -> u32 {
    let Some(row) = map.get(key) else {
        return default;
    };

    match row.value.parse::<u32>() {
        Ok(value) if range.contains(&value) => value,
        _ => {
            warn!(
                target: "app::settings",
                key,
                value = %row.value,
                "stored setting invalid, falling back to default"
            );
            default
        }
    }
}

fn ensure_in_range(field: &str, value: u32, range: &RangeInclusive<u32>) -> AppResult<()> {
    if !range.contains(&value) {
        return Err(AppError::validation(
            field,
            format!(
                "must be between {} and {}, got {value}",
                range.start(),
                range.end()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn setup_service() -> (SettingsService, DbPool, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir");
        let db_path = temp_dir.path().join("settings.sqlite");
        let pool = DbPool::new(&db_path).expect("db pool");
        (SettingsService::new(pool.clone()), pool, temp_dir)
    }

    #[test]
    fn defaults_are_returned_when_no_settings_exist() {
        let (service, _pool, _dir) = setup_service();
        let settings = service.get().expect("settings");
        assert_eq!(settings.analysis_window_days, 7);
        assert_eq!(settings.statistics_window_days, 30);
        assert_eq!(settings.plan_duration, 7);
        assert_eq!(settings.top_weak_items, 5);
        assert_eq!(settings.max_focus_items, 10);
        assert_eq!(settings.timezone, "UTC");
    }

    #[test]
    fn update_persists_across_service_instances() {
        let (service, pool, _dir) = setup_service();
        service
            .update(SettingsUpdateInput {
                plan_duration: Some(14),
                timezone: Some("Asia/Kathmandu".into()),
                ..SettingsUpdateInput::default()
            })
            .expect("update");

        let reloaded = SettingsService::new(pool).get().expect("reload");
        assert_eq!(reloaded.plan_duration, 14);
        assert_eq!(reloaded.timezone, "Asia/Kathmandu");
        assert_eq!(reloaded.analysis_window_days, 7);
    }

    #[test]
    fn invalid_updates_are_rejected_without_side_effects() {
        let (service, _pool, _dir) = setup_service();

        let err = service
            .update(SettingsUpdateInput {
                plan_duration: Some(0),
                ..SettingsUpdateInput::default()
            })
            .expect_err("zero plan");
        assert_eq!(err.validation_field(), Some("planDuration"));

        let err = service
            .update(SettingsUpdateInput {
                top_weak_items: Some(3),
                timezone: Some("Mars/Olympus".into()),
                ..SettingsUpdateInput::default()
            })
            .expect_err("bad zone");
        assert_eq!(err.validation_field(), Some("timezone"));

        assert_eq!(service.get().expect("settings").top_weak_items, 5);
    }

    #[test]
    fn invalid_stored_values_fall_back_to_defaults() {
        let (_service, pool, _dir) = setup_service();
        pool.with_connection(|conn| {
            SettingsRepository::upsert_many(
                conn,
                &[
                    (KEY_MAX_FOCUS_ITEMS, "9000".to_string()),
                    (KEY_TIMEZONE, "Nowhere/Special".to_string()),
                    (KEY_TOP_WEAK_ITEMS, "8".to_string()),
                ],
            )
        })
        .expect("seed");

        let settings = SettingsService::new(pool).get().expect("settings");
        assert_eq!(settings.max_focus_items, 10);
        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.top_weak_items, 8);
    }

    #[test]
    fn reset_restores_defaults() {
        let (service, pool, _dir) = setup_service();
        service
            .update(SettingsUpdateInput {
                analysis_window_days: Some(3),
                ..SettingsUpdateInput::default()
            })
            .expect("update");
        service.reset().expect("reset");
        let settings = SettingsService::new(pool).get().expect("reload");
        assert_eq!(settings.analysis_window_days, 7);
    }
}
