//! SQLite-backed chat subscription store. Implements ChatDataPort.
//!
//! Updates are atomic per chat id: a read-modify-write runs under that
//! chat's lock, so a settings change racing a scheduler tick for the same
//! chat never loses a write. Unrelated chats do not contend.

use crate::adapters::persistence::{open_db, unix_now};
use crate::domain::entities::DEFAULT_NOTIFY_BEFORE_MINUTES;
use crate::domain::{ChatSubscription, DomainError};
use crate::ports::{ChatDataPort, SubscriptionMutator};
use libsql::{params, Connection, Database, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const CHATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chats (
    chat_id INTEGER PRIMARY KEY,
    group_id INTEGER,
    lang_code TEXT NOT NULL,
    notify_before_minutes INTEGER NOT NULL,
    enabled INTEGER NOT NULL,
    last_notified_lesson_key TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)"#;

const SELECT_FIELDS: &str = "chat_id, group_id, lang_code, notify_before_minutes, enabled, \
                             last_notified_lesson_key, created_at, updated_at";

pub struct SqliteChatStore {
    db: Database,
    default_lang: String,
    /// Per-chat update locks. Contention is scoped to a single chat id.
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl SqliteChatStore {
    /// Connect to (or create) the chat database and ensure the schema.
    pub async fn connect(
        base_dir: impl AsRef<Path>,
        default_lang: String,
    ) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::ChatData(e.to_string()))?;
        let db_path = base.join("chats.db");
        let db = open_db(&db_path, DomainError::ChatData).await?;
        let conn = db.connect().map_err(Self::err)?;
        conn.execute(CHATS_TABLE, ()).await.map_err(Self::err)?;
        info!(path = %db_path.display(), "chat store ready");
        Ok(Self {
            db,
            default_lang,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn err(e: impl ToString) -> DomainError {
        DomainError::ChatData(e.to_string())
    }

    async fn chat_lock(&self, chat_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Decode a row, falling back to typed defaults for invalid values.
    fn decode(&self, row: &Row) -> Result<ChatSubscription, DomainError> {
        let chat_id: i64 = row.get(0).map_err(Self::err)?;
        let group_id: Option<i64> = row.get::<i64>(1).ok();
        let lang_code: String = row.get::<String>(2).unwrap_or_default();
        let lang_code = if lang_code.is_empty() {
            self.default_lang.clone()
        } else {
            lang_code
        };
        let minutes: i64 = row
            .get(3)
            .unwrap_or(i64::from(DEFAULT_NOTIFY_BEFORE_MINUTES));
        let notify_before_minutes =
            u32::try_from(minutes).unwrap_or(DEFAULT_NOTIFY_BEFORE_MINUTES);
        Ok(ChatSubscription {
            chat_id,
            group_id,
            lang_code,
            notify_before_minutes,
            enabled: row.get::<i64>(4).unwrap_or(0) != 0,
            last_notified_lesson_key: row.get::<String>(5).ok(),
            created_at: row.get(6).unwrap_or(0),
            updated_at: row.get(7).unwrap_or(0),
        })
    }

    async fn load(
        &self,
        conn: &Connection,
        chat_id: i64,
    ) -> Result<Option<ChatSubscription>, DomainError> {
        let mut rows = conn
            .query(
                &format!("SELECT {SELECT_FIELDS} FROM chats WHERE chat_id = ?1"),
                params![chat_id],
            )
            .await
            .map_err(Self::err)?;
        match rows.next().await.map_err(Self::err)? {
            Some(row) => Ok(Some(self.decode(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, conn: &Connection, sub: &ChatSubscription) -> Result<(), DomainError> {
        conn.execute(
            r#"
            INSERT INTO chats (chat_id, group_id, lang_code, notify_before_minutes,
                               enabled, last_notified_lesson_key, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (chat_id) DO UPDATE SET
                group_id = excluded.group_id,
                lang_code = excluded.lang_code,
                notify_before_minutes = excluded.notify_before_minutes,
                enabled = excluded.enabled,
                last_notified_lesson_key = excluded.last_notified_lesson_key,
                updated_at = excluded.updated_at
            "#,
            params![
                sub.chat_id,
                sub.group_id,
                sub.lang_code.as_str(),
                i64::from(sub.notify_before_minutes),
                i64::from(sub.enabled),
                sub.last_notified_lesson_key.as_deref(),
                sub.created_at,
                sub.updated_at
            ],
        )
        .await
        .map_err(Self::err)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatDataPort for SqliteChatStore {
    async fn get(&self, chat_id: i64) -> Result<ChatSubscription, DomainError> {
        let conn = self.db.connect().map_err(Self::err)?;
        self.load(&conn, chat_id)
            .await?
            .ok_or(DomainError::SubscriptionNotFound(chat_id))
    }

    async fn update(
        &self,
        chat_id: i64,
        mutate: SubscriptionMutator,
    ) -> Result<ChatSubscription, DomainError> {
        let lock = self.chat_lock(chat_id).await;
        let _guard = lock.lock().await;

        let conn = self.db.connect().map_err(Self::err)?;
        let now = unix_now();
        let mut sub = self
            .load(&conn, chat_id)
            .await?
            .unwrap_or_else(|| ChatSubscription::new(chat_id, self.default_lang.clone(), now));

        let previous_group = sub.group_id;
        mutate(&mut sub);
        if previous_group.is_some() && sub.group_id != previous_group {
            // A reassigned group starts with a clean reminder slate.
            sub.last_notified_lesson_key = None;
            debug!(chat_id, group_id = ?sub.group_id, "group changed; reminder state reset");
        }
        sub.updated_at = now;

        self.save(&conn, &sub).await?;
        Ok(sub)
    }

    async fn list_active(&self) -> Result<Vec<ChatSubscription>, DomainError> {
        let conn = self.db.connect().map_err(Self::err)?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_FIELDS} FROM chats \
                     WHERE enabled = 1 AND group_id IS NOT NULL ORDER BY chat_id"
                ),
                (),
            )
            .await
            .map_err(Self::err)?;
        let mut subs = Vec::new();
        while let Some(row) = rows.next().await.map_err(Self::err)? {
            subs.push(self.decode(&row)?);
        }
        Ok(subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("schedbot-{tag}-{}-{nanos}", std::process::id()))
    }

    async fn store(tag: &str) -> SqliteChatStore {
        SqliteChatStore::connect(temp_dir(tag), "uk".into())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_chat_is_not_found() {
        let store = store("chat-miss").await;
        let err = store.get(42).await.unwrap_err();
        assert!(matches!(err, DomainError::SubscriptionNotFound(42)));
    }

    #[tokio::test]
    async fn first_update_creates_with_defaults() {
        let store = store("chat-create").await;
        let sub = store
            .update(42, Box::new(|s| s.group_id = Some(101)))
            .await
            .unwrap();
        assert_eq!(sub.group_id, Some(101));
        assert_eq!(sub.lang_code, "uk");
        assert_eq!(sub.notify_before_minutes, DEFAULT_NOTIFY_BEFORE_MINUTES);
        assert!(!sub.enabled);
        assert!(sub.created_at > 0);

        let loaded = store.get(42).await.unwrap();
        assert_eq!(loaded, sub);
    }

    #[tokio::test]
    async fn disabled_chats_stay_stored_but_inactive() {
        let store = store("chat-disable").await;
        store
            .update(
                1,
                Box::new(|s| {
                    s.group_id = Some(101);
                    s.enabled = true;
                }),
            )
            .await
            .unwrap();
        assert_eq!(store.list_active().await.unwrap().len(), 1);

        store
            .update(1, Box::new(|s| s.enabled = false))
            .await
            .unwrap();
        assert!(store.list_active().await.unwrap().is_empty());
        // Not hard-deleted: history is preserved.
        assert!(store.get(1).await.is_ok());
    }

    #[tokio::test]
    async fn group_change_resets_reminder_key() {
        let store = store("chat-group-reset").await;
        store
            .update(
                1,
                Box::new(|s| {
                    s.group_id = Some(101);
                    s.last_notified_lesson_key = Some("2024-09-02:1:starts".into());
                }),
            )
            .await
            .unwrap();
        assert!(store
            .get(1)
            .await
            .unwrap()
            .last_notified_lesson_key
            .is_some());

        let sub = store
            .update(1, Box::new(|s| s.group_id = Some(202)))
            .await
            .unwrap();
        assert!(sub.last_notified_lesson_key.is_none());
    }

    #[tokio::test]
    async fn concurrent_updates_lose_neither_write() {
        let store = Arc::new(store("chat-race").await);
        store
            .update(1, Box::new(|s| s.group_id = Some(101)))
            .await
            .unwrap();

        let a = Arc::clone(&store);
        let b = Arc::clone(&store);
        let (ra, rb) = tokio::join!(
            a.update(1, Box::new(|s| s.lang_code = "en".into())),
            b.update(1, Box::new(|s| s.notify_before_minutes = 5)),
        );
        ra.unwrap();
        rb.unwrap();

        let sub = store.get(1).await.unwrap();
        assert_eq!(sub.lang_code, "en");
        assert_eq!(sub.notify_before_minutes, 5);
        assert_eq!(sub.group_id, Some(101));
    }

    #[tokio::test]
    async fn subscriptions_survive_reconnect() {
        let dir = temp_dir("chat-restart");
        {
            let store = SqliteChatStore::connect(&dir, "uk".into()).await.unwrap();
            store
                .update(
                    7,
                    Box::new(|s| {
                        s.group_id = Some(101);
                        s.enabled = true;
                        s.last_notified_lesson_key = Some("2024-09-02:1:starts".into());
                    }),
                )
                .await
                .unwrap();
        }
        let store = SqliteChatStore::connect(&dir, "uk".into()).await.unwrap();
        let sub = store.get(7).await.unwrap();
        assert_eq!(
            sub.last_notified_lesson_key.as_deref(),
            Some("2024-09-02:1:starts")
        );
        assert_eq!(store.list_active().await.unwrap().len(), 1);
    }
}
