use std::convert::TryFrom;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::activity::{Category, PeriodType};
use crate::models::progress::{ActivityStats, ItemProgress, Snapshot};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SNAPSHOT_COLUMNS: &str =
    "id, user_id, period_type, period_start, created_at, last_updated, version";

#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub id: String,
    pub user_id: String,
    pub period_type: String,
    pub period_start: String,
    pub created_at: String,
    pub last_updated: String,
    pub version: i64,
}

impl TryFrom<&Row<'_>> for SnapshotRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            period_type: row.get("period_type")?,
            period_start: row.get("period_start")?,
            created_at: row.get("created_at")?,
            last_updated: row.get("last_updated")?,
            version: row.get("version")?,
        })
    }
}

impl SnapshotRow {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            user_id: snapshot.user_id.clone(),
            period_type: snapshot.period_type.as_str().to_string(),
            period_start: format_date(snapshot.period_start),
            created_at: snapshot.created_at.to_rfc3339(),
            last_updated: snapshot.last_updated.to_rfc3339(),
            version: snapshot.version,
        }
    }

    /// Builds the snapshot shell; items are attached by the caller.
    pub fn into_snapshot(self) -> AppResult<Snapshot> {
        let period_type = PeriodType::parse(&self.period_type).ok_or_else(|| {
            AppError::database(format!("unknown period type `{}`", self.period_type))
        })?;
        let period_start = parse_date(&self.period_start)?;
        let created_at = parse_timestamp(&self.created_at)?;
        let last_updated = parse_timestamp(&self.last_updated)?;

        let mut snapshot = Snapshot::new(self.user_id, period_type, period_start, created_at);
        snapshot.id = self.id;
        snapshot.last_updated = last_updated;
        snapshot.version = self.version;
        Ok(snapshot)
    }
}

/// Quiz sub-type counters, stored together as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SubActivityStats {
    object_recognition: ActivityStats,
    #[serde(alias = "hearing")]
    listening: ActivityStats,
    text_to_figure: ActivityStats,
    figure_to_text: ActivityStats,
    counting: ActivityStats,
    bubble_pop: ActivityStats,
}

#[derive(Debug, Clone)]
pub struct ItemProgressRow {
    pub snapshot_id: String,
    pub category: String,
    pub item_name: String,
    pub completed: bool,
    pub tracing_count: u32,
    pub tracing_complete_count: u32,
    pub tracing_total_time: f64,
    pub total_stars: u32,
    pub total_stars_achieved: u32,
    pub quiz_count: u32,
    pub quiz_total_time: f64,
    pub quiz_fail_count: u32,
    pub quiz_time_out_count: u32,
    pub activity_stats: String,
}

impl TryFrom<&Row<'_>> for ItemProgressRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            snapshot_id: row.get("snapshot_id")?,
            category: row.get("category")?,
            item_name: row.get("item_name")?,
            completed: row.get::<_, i64>("completed")? != 0,
            tracing_count: row.get("tracing_count")?,
            tracing_complete_count: row.get("tracing_complete_count")?,
            tracing_total_time: row.get("tracing_total_time")?,
            total_stars: row.get("total_stars")?,
            total_stars_achieved: row.get("total_stars_achieved")?,
            quiz_count: row.get("quiz_count")?,
            quiz_total_time: row.get("quiz_total_time")?,
            quiz_fail_count: row.get("quiz_fail_count")?,
            quiz_time_out_count: row.get("quiz_time_out_count")?,
            activity_stats: row.get("activity_stats")?,
        })
    }
}

impl ItemProgressRow {
    pub fn from_item(snapshot_id: &str, category: Category, item: &ItemProgress) -> AppResult<Self> {
        let stats = SubActivityStats {
            object_recognition: item.object_recognition.clone(),
            listening: item.listening.clone(),
            text_to_figure: item.text_to_figure.clone(),
            figure_to_text: item.figure_to_text.clone(),
            counting: item.counting.clone(),
            bubble_pop: item.bubble_pop.clone(),
        };

        Ok(Self {
            snapshot_id: snapshot_id.to_string(),
            category: category.as_str().to_string(),
            item_name: item.item_name.clone(),
            completed: item.completed,
            tracing_count: item.tracing_count,
            tracing_complete_count: item.tracing_complete_count,
            tracing_total_time: item.tracing_total_time,
            total_stars: item.total_stars,
            total_stars_achieved: item.total_stars_achieved,
            quiz_count: item.quiz_count,
            quiz_total_time: item.quiz_total_time,
            quiz_fail_count: item.quiz_fail_count,
            quiz_time_out_count: item.quiz_time_out_count,
            activity_stats: serde_json::to_string(&stats)?,
        })
    }

    pub fn into_item(self) -> AppResult<(Category, ItemProgress)> {
        let category = Category::parse(&self.category)
            .ok_or_else(|| AppError::database(format!("unknown category `{}`", self.category)))?;
        let stats: SubActivityStats = serde_json::from_str(&self.activity_stats)?;

        let item = ItemProgress {
            item_name: self.item_name,
            completed: self.completed,
            tracing_count: self.tracing_count,
            tracing_complete_count: self.tracing_complete_count,
            tracing_total_time: self.tracing_total_time,
            total_stars: self.total_stars,
            total_stars_achieved: self.total_stars_achieved,
            quiz_count: self.quiz_count,
            quiz_total_time: self.quiz_total_time,
            quiz_fail_count: self.quiz_fail_count,
            quiz_time_out_count: self.quiz_time_out_count,
            object_recognition: stats.object_recognition,
            listening: stats.listening,
            text_to_figure: stats.text_to_figure,
            figure_to_text: stats.figure_to_text,
            counting: stats.counting,
            bubble_pop: stats.bubble_pop,
        };

        Ok((category, item))
    }
}

pub struct SnapshotRepository;

impl SnapshotRepository {
    pub fn find(
        conn: &Connection,
        user_id: &str,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> AppResult<Option<SnapshotRow>> {
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM progress_snapshots \
             WHERE user_id = :user_id AND period_type = :period_type AND period_start = :period_start"
        );
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(
                named_params! {
                    ":user_id": user_id,
                    ":period_type": period_type.as_str(),
                    ":period_start": format_date(period_start),
                },
                |row| SnapshotRow::try_from(row),
            )
            .optional()?;
        Ok(row)
    }

    pub fn latest(
        conn: &Connection,
        user_id: &str,
        period_type: PeriodType,
    ) -> AppResult<Option<SnapshotRow>> {
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM progress_snapshots \
             WHERE user_id = :user_id AND period_type = :period_type \
             ORDER BY period_start DESC LIMIT 1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row(
                named_params! {":user_id": user_id, ":period_type": period_type.as_str()},
                |row| SnapshotRow::try_from(row),
            )
            .optional()?;
        Ok(row)
    }

    /// Inclusive on both ends, oldest first.
    pub fn list_range(
        conn: &Connection,
        user_id: &str,
        period_type: PeriodType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<SnapshotRow>> {
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM progress_snapshots \
             WHERE user_id = :user_id AND period_type = :period_type \
               AND period_start >= :start AND period_start <= :end \
             ORDER BY period_start ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":user_id": user_id,
                    ":period_type": period_type.as_str(),
                    ":start": format_date(start),
                    ":end": format_date(end),
                },
                |row| SnapshotRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert(conn: &Connection, row: &SnapshotRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO progress_snapshots (
                    id, user_id, period_type, period_start, created_at, last_updated, version
                ) VALUES (
                    :id, :user_id, :period_type, :period_start, :created_at, :last_updated, :version
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":period_type": &row.period_type,
                ":period_start": &row.period_start,
                ":created_at": &row.created_at,
                ":last_updated": &row.last_updated,
                ":version": row.version,
            },
        )?;
        Ok(())
    }

    /// Moves the stored row from `expected_version` to `row.version`.
    /// Returns false when the stored version no longer matches.
    pub fn update_versioned(
        conn: &Connection,
        row: &SnapshotRow,
        expected_version: i64,
    ) -> AppResult<bool> {
        let changed = conn.execute(
            r#"
                UPDATE progress_snapshots
                SET last_updated = :last_updated,
                    version = :version
                WHERE id = :id AND version = :expected_version
            "#,
            named_params! {
                ":id": &row.id,
                ":last_updated": &row.last_updated,
                ":version": row.version,
                ":expected_version": expected_version,
            },
        )?;
        Ok(changed == 1)
    }

    pub fn list_items(conn: &Connection, snapshot_id: &str) -> AppResult<Vec<ItemProgressRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT snapshot_id, category, item_name, completed,
                       tracing_count, tracing_complete_count, tracing_total_time,
                       total_stars, total_stars_achieved,
                       quiz_count, quiz_total_time, quiz_fail_count, quiz_time_out_count,
                       activity_stats
                FROM item_progress
                WHERE snapshot_id = ?1
                ORDER BY category ASC, item_name ASC
            "#,
        )?;
        let rows = stmt
            .query_map([snapshot_id], |row| ItemProgressRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn upsert_item(conn: &Connection, row: &ItemProgressRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO item_progress (
                    snapshot_id, category, item_name, completed,
                    tracing_count, tracing_complete_count, tracing_total_time,
                    total_stars, total_stars_achieved,
                    quiz_count, quiz_total_time, quiz_fail_count, quiz_time_out_count,
                    activity_stats
                ) VALUES (
                    :snapshot_id, :category, :item_name, :completed,
                    :tracing_count, :tracing_complete_count, :tracing_total_time,
                    :total_stars, :total_stars_achieved,
                    :quiz_count, :quiz_total_time, :quiz_fail_count, :quiz_time_out_count,
                    :activity_stats
                )
                ON CONFLICT(snapshot_id, category, item_name) DO UPDATE SET
                    completed = excluded.completed,
                    tracing_count = excluded.tracing_count,
                    tracing_complete_count = excluded.tracing_complete_count,
                    tracing_total_time = excluded.tracing_total_time,
                    total_stars = excluded.total_stars,
                    total_stars_achieved = excluded.total_stars_achieved,
                    quiz_count = excluded.quiz_count,
                    quiz_total_time = excluded.quiz_total_time,
                    quiz_fail_count = excluded.quiz_fail_count,
                    quiz_time_out_count = excluded.quiz_time_out_count,
                    activity_stats = excluded.activity_stats
            "#,
            named_params! {
                ":snapshot_id": &row.snapshot_id,
                ":category": &row.category,
                ":item_name": &row.item_name,
                ":completed": row.completed,
                ":tracing_count": row.tracing_count,
                ":tracing_complete_count": row.tracing_complete_count,
                ":tracing_total_time": row.tracing_total_time,
                ":total_stars": row.total_stars,
                ":total_stars_achieved": row.total_stars_achieved,
                ":quiz_count": row.quiz_count,
                ":quiz_total_time": row.quiz_total_time,
                ":quiz_fail_count": row.quiz_fail_count,
                ":quiz_time_out_count": row.quiz_time_out_count,
                ":activity_stats": &row.activity_stats,
            },
        )?;
        Ok(())
    }

    /// Deletes every snapshot of a user; items go with them by cascade.
    pub fn delete_user(conn: &Connection, user_id: &str) -> AppResult<usize> {
        let deleted = conn.execute("DELETE FROM progress_snapshots WHERE user_id = ?1", [user_id])?;
        Ok(deleted)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| AppError::database(format!("invalid period start `{value}`: {err}")))
}

fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("invalid timestamp `{value}`: {err}")))
}
