//! SQLite persistence via libsql: schedule cache and chat subscriptions.
//!
//! Both stores survive process restart with no external dependency beyond
//! the local database files.

pub mod chat_store;
pub mod sqlite_cache;

pub use chat_store::SqliteChatStore;
pub use sqlite_cache::SqliteCache;

use crate::domain::DomainError;
use libsql::{Connection, Database};
use std::path::Path;

/// Open (or create) a local database with WAL mode and synchronous=NORMAL:
/// concurrent readers plus one writer, without sacrificing durability.
pub(crate) async fn open_db(
    path: &Path,
    wrap: fn(String) -> DomainError,
) -> Result<Database, DomainError> {
    let path_str = path.to_string_lossy();
    let db = libsql::Builder::new_local(path_str.as_ref())
        .build()
        .await
        .map_err(|e| wrap(e.to_string()))?;
    let conn = db.connect().map_err(|e| wrap(e.to_string()))?;
    run_pragma(&conn, "PRAGMA journal_mode=WAL", wrap).await?;
    run_pragma(&conn, "PRAGMA synchronous=NORMAL", wrap).await?;
    Ok(db)
}

/// PRAGMA returns a row (the new value); execute fails when rows come back,
/// so query and drain instead.
async fn run_pragma(
    conn: &Connection,
    sql: &str,
    wrap: fn(String) -> DomainError,
) -> Result<(), DomainError> {
    let mut rows = conn
        .query(sql, ())
        .await
        .map_err(|e| wrap(format!("{sql}: {e}")))?;
    while rows
        .next()
        .await
        .map_err(|e| wrap(e.to_string()))?
        .is_some()
    {}
    Ok(())
}

/// Unix seconds, for stored_at/updated_at columns.
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
