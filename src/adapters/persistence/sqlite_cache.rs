//! SQLite-backed schedule cache. Implements CachePort.
//!
//! One row per (entity kind, entity id, week); last-write-wins upsert. No
//! TTL: a stale entry is always preferable to no data, and staleness is
//! flagged by the service layer, not here.

use crate::adapters::persistence::{open_db, unix_now};
use crate::domain::{DomainError, ScheduleEntity, ScheduleSnapshot, WeekId};
use crate::ports::{CacheEntry, CachePort};
use libsql::{params, Database};
use std::path::Path;
use tracing::{debug, info};

const CACHE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schedule_cache (
    entity_kind TEXT NOT NULL,
    entity_id INTEGER NOT NULL,
    week TEXT NOT NULL,
    snapshot_json TEXT NOT NULL,
    stored_at INTEGER NOT NULL,
    PRIMARY KEY (entity_kind, entity_id, week)
)"#;
const CACHE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_schedule_cache_week ON schedule_cache (week)";

pub struct SqliteCache {
    db: Database,
}

impl SqliteCache {
    /// Connect to (or create) the cache database and ensure the schema.
    /// Call once at startup; the returned store is safe to share via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Cache(e.to_string()))?;
        let db_path = base.join("schedule_cache.db");
        let db = open_db(&db_path, DomainError::Cache).await?;
        let conn = db.connect().map_err(Self::err)?;
        conn.execute(CACHE_TABLE, ()).await.map_err(Self::err)?;
        conn.execute(CACHE_INDEX, ()).await.map_err(Self::err)?;
        info!(path = %db_path.display(), "schedule cache ready");
        Ok(Self { db })
    }

    fn err(e: impl ToString) -> DomainError {
        DomainError::Cache(e.to_string())
    }
}

#[async_trait::async_trait]
impl CachePort for SqliteCache {
    async fn get(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
    ) -> Result<Option<CacheEntry>, DomainError> {
        let conn = self.db.connect().map_err(Self::err)?;
        let mut rows = conn
            .query(
                r#"
                SELECT snapshot_json, stored_at FROM schedule_cache
                WHERE entity_kind = ?1 AND entity_id = ?2 AND week = ?3
                "#,
                params![entity.kind.as_str(), entity.id, week.to_string()],
            )
            .await
            .map_err(Self::err)?;

        let Some(row) = rows.next().await.map_err(Self::err)? else {
            return Ok(None);
        };
        let json: String = row.get(0).map_err(Self::err)?;
        let stored_at: i64 = row.get(1).map_err(Self::err)?;
        let snapshot: ScheduleSnapshot = serde_json::from_str(&json).map_err(Self::err)?;
        Ok(Some(CacheEntry {
            snapshot,
            stored_at,
        }))
    }

    async fn put(&self, snapshot: &ScheduleSnapshot) -> Result<(), DomainError> {
        let json = serde_json::to_string(snapshot).map_err(Self::err)?;
        let conn = self.db.connect().map_err(Self::err)?;
        conn.execute(
            r#"
            INSERT INTO schedule_cache (entity_kind, entity_id, week, snapshot_json, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (entity_kind, entity_id, week) DO UPDATE SET
                snapshot_json = excluded.snapshot_json,
                stored_at = excluded.stored_at
            "#,
            params![
                snapshot.entity.kind.as_str(),
                snapshot.entity.id,
                snapshot.week.to_string(),
                json,
                unix_now()
            ],
        )
        .await
        .map_err(Self::err)?;
        debug!(
            entity = %snapshot.entity,
            week = %snapshot.week,
            lessons = snapshot.lessons.len(),
            "snapshot cached"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lesson, Parity};
    use chrono::{NaiveDate, NaiveTime};
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("schedbot-{tag}-{}-{nanos}", std::process::id()))
    }

    fn snapshot(id: i64, subject: &str) -> ScheduleSnapshot {
        let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        ScheduleSnapshot {
            entity: ScheduleEntity::group(id),
            week: WeekId::from_date(date),
            lessons: vec![Lesson {
                date,
                number: 1,
                starts_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ends_at: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                subject: subject.into(),
                teacher: None,
                room: Some("214".into()),
                parity: Parity::Every,
            }],
            fetched_at: date.and_hms_opt(8, 0, 0).unwrap(),
            is_stale: false,
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_identical_snapshot() {
        let dir = temp_dir("cache-roundtrip");
        let cache = SqliteCache::connect(&dir).await.unwrap();
        let snap = snapshot(101, "Calculus");

        cache.put(&snap).await.unwrap();
        let entry = cache
            .get(snap.entity, snap.week)
            .await
            .unwrap()
            .expect("entry present");
        assert_eq!(entry.snapshot.lessons, snap.lessons);
        assert!(!entry.snapshot.is_stale);
        assert!(entry.stored_at > 0);
    }

    #[tokio::test]
    async fn newer_put_replaces_older_for_same_key() {
        let dir = temp_dir("cache-lww");
        let cache = SqliteCache::connect(&dir).await.unwrap();

        cache.put(&snapshot(101, "Calculus")).await.unwrap();
        let newer = snapshot(101, "Physics");
        cache.put(&newer).await.unwrap();

        let entry = cache.get(newer.entity, newer.week).await.unwrap().unwrap();
        assert_eq!(entry.snapshot.lessons[0].subject, "Physics");
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = temp_dir("cache-miss");
        let cache = SqliteCache::connect(&dir).await.unwrap();
        let week = WeekId { year: 2024, week: 36 };
        assert!(cache
            .get(ScheduleEntity::group(404), week)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn entries_survive_reconnect() {
        let dir = temp_dir("cache-restart");
        let snap = snapshot(101, "Calculus");
        {
            let cache = SqliteCache::connect(&dir).await.unwrap();
            cache.put(&snap).await.unwrap();
        }
        let cache = SqliteCache::connect(&dir).await.unwrap();
        let entry = cache.get(snap.entity, snap.week).await.unwrap().unwrap();
        assert_eq!(entry.snapshot, snap);
    }
}
