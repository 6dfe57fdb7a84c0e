//! Snapshot persistence keyed by (user, period type, period start).
//!
//! Writers use optimistic concurrency: `put` only succeeds when the stored
//! version still equals the version the caller loaded, and bumps it.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use tracing::debug;

use crate::db::repositories::snapshot_repository::{
    ItemProgressRow, SnapshotRepository, SnapshotRow,
};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::activity::PeriodType;
use crate::models::progress::Snapshot;

pub trait SnapshotStore: Send + Sync {
    /// The stored snapshot, or a fresh unsaved one (version 0). Nothing is
    /// written until `put`.
    fn get_or_create(
        &self,
        user_id: &str,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> AppResult<Snapshot> {
        match self.find(user_id, period_type, period_start)? {
            Some(snapshot) => Ok(snapshot),
            None => Ok(Snapshot::new(
                user_id,
                period_type,
                period_start,
                chrono::Utc::now(),
            )),
        }
    }

    fn find(
        &self,
        user_id: &str,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> AppResult<Option<Snapshot>>;

    fn latest(&self, user_id: &str, period_type: PeriodType) -> AppResult<Option<Snapshot>>;

    /// Persists the snapshot and returns it with its new version. Fails with
    /// `Conflict` if someone else wrote it since it was loaded.
    fn put(&self, snapshot: &Snapshot) -> AppResult<Snapshot>;

    /// Snapshots with `start <= period_start <= end`, oldest first.
    fn query_range(
        &self,
        user_id: &str,
        period_type: PeriodType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Snapshot>>;

    /// Removes every snapshot of the user and returns how many there were.
    fn delete_user(&self, user_id: &str) -> AppResult<usize>;
}

fn stale(snapshot: &Snapshot, stored: i64) -> AppError {
    AppError::conflict(format!(
        "snapshot {} for user {} is at version {}, write was based on {}",
        snapshot.period_start, snapshot.user_id, stored, snapshot.version
    ))
}

type SnapshotKey = (String, PeriodType, NaiveDate);

/// Process-local store, mainly for tests and embedding without a database.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<SnapshotKey, Snapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<SnapshotKey, Snapshot>>> {
        self.snapshots
            .lock()
            .map_err(|_| AppError::other("snapshot store lock poisoned"))
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn find(
        &self,
        user_id: &str,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> AppResult<Option<Snapshot>> {
        let key = (user_id.to_string(), period_type, period_start);
        Ok(self.lock()?.get(&key).cloned())
    }

    fn latest(&self, user_id: &str, period_type: PeriodType) -> AppResult<Option<Snapshot>> {
        Ok(self
            .lock()?
            .values()
            .filter(|s| s.user_id == user_id && s.period_type == period_type)
            .max_by_key(|s| s.period_start)
            .cloned())
    }

    fn put(&self, snapshot: &Snapshot) -> AppResult<Snapshot> {
        let key = (
            snapshot.user_id.clone(),
            snapshot.period_type,
            snapshot.period_start,
        );
        let mut snapshots = self.lock()?;

        let stored_version = snapshots.get(&key).map_or(0, |stored| stored.version);
        if stored_version != snapshot.version {
            return Err(stale(snapshot, stored_version));
        }

        let mut saved = snapshot.clone();
        saved.version += 1;
        snapshots.insert(key, saved.clone());
        Ok(saved)
    }

    fn query_range(
        &self,
        user_id: &str,
        period_type: PeriodType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Snapshot>> {
        let mut found: Vec<Snapshot> = self
            .lock()?
            .values()
            .filter(|s| {
                s.user_id == user_id
                    && s.period_type == period_type
                    && s.period_start >= start
                    && s.period_start <= end
            })
            .cloned()
            .collect();
        found.sort_by_key(|s| s.period_start);
        Ok(found)
    }

    fn delete_user(&self, user_id: &str) -> AppResult<usize> {
        let mut snapshots = self.lock()?;
        let before = snapshots.len();
        snapshots.retain(|(owner, _, _), _| owner != user_id);
        Ok(before - snapshots.len())
    }
}

/// SQLite-backed store over `progress_snapshots` and `item_progress`.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    db: DbPool,
}

impl SqliteSnapshotStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    fn hydrate(conn: &rusqlite::Connection, row: SnapshotRow) -> AppResult<Snapshot> {
        let mut snapshot = row.into_snapshot()?;
        for item_row in SnapshotRepository::list_items(conn, &snapshot.id)? {
            let (category, item) = item_row.into_item()?;
            snapshot
                .categories
                .entry(category)
                .or_default()
                .insert(item.item_name.clone(), item);
        }
        Ok(snapshot)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn find(
        &self,
        user_id: &str,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> AppResult<Option<Snapshot>> {
        self.db.with_connection(|conn| {
            SnapshotRepository::find(conn, user_id, period_type, period_start)?
                .map(|row| Self::hydrate(conn, row))
                .transpose()
        })
    }

    fn latest(&self, user_id: &str, period_type: PeriodType) -> AppResult<Option<Snapshot>> {
        self.db.with_connection(|conn| {
            SnapshotRepository::latest(conn, user_id, period_type)?
                .map(|row| Self::hydrate(conn, row))
                .transpose()
        })
    }

    fn put(&self, snapshot: &Snapshot) -> AppResult<Snapshot> {
        self.db.with_transaction(|tx| {
            let mut saved = snapshot.clone();
            saved.version += 1;
            let row = SnapshotRow::from_snapshot(&saved);

            if snapshot.version == 0 {
                if let Some(existing) = SnapshotRepository::find(
                    tx,
                    &snapshot.user_id,
                    snapshot.period_type,
                    snapshot.period_start,
                )? {
                    return Err(stale(snapshot, existing.version));
                }
                SnapshotRepository::insert(tx, &row)?;
            } else if !SnapshotRepository::update_versioned(tx, &row, snapshot.version)? {
                let stored = SnapshotRepository::find(
                    tx,
                    &snapshot.user_id,
                    snapshot.period_type,
                    snapshot.period_start,
                )?
                .map_or(0, |existing| existing.version);
                return Err(stale(snapshot, stored));
            }

            for (category, item) in saved.iter_items() {
                let item_row = ItemProgressRow::from_item(&row.id, category, item)?;
                SnapshotRepository::upsert_item(tx, &item_row)?;
            }

            debug!(
                target: "app::db",
                user_id = %saved.user_id,
                period_type = %saved.period_type,
                period_start = %saved.period_start,
                version = saved.version,
                items = saved.item_count(),
                "snapshot stored"
            );
            Ok(saved)
        })
    }

    fn query_range(
        &self,
        user_id: &str,
        period_type: PeriodType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Snapshot>> {
        self.db.with_connection(|conn| {
            SnapshotRepository::list_range(conn, user_id, period_type, start, end)?
                .into_iter()
                .map(|row| Self::hydrate(conn, row))
                .collect()
        })
    }

    fn delete_user(&self, user_id: &str) -> AppResult<usize> {
        self.db
            .with_connection(|conn| SnapshotRepository::delete_user(conn, user_id))
    }
}
