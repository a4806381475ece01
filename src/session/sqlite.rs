use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::store::KeyValueStore;
use crate::models::Result;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS session_kv (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Session store kept in a local SQLite database.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Opens (creating if necessary) the database at `url`, e.g.
    /// `sqlite://cwl_session.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // One connection: an in-memory database lives only as long as its
        // connection, and writes are serialized anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        info!("Opened session store at {}", url);

        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM session_kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerRecord, Roster};
    use crate::scoring::{RuleKey, RuleTable};
    use crate::session::SessionStore;

    #[tokio::test]
    async fn test_sqlite_store_persists_both_keys() {
        let store = SqliteSessionStore::connect("sqlite::memory:").await.unwrap();

        let roster = Roster::from_records(vec![PlayerRecord::blank("Alice")]);
        store.save_roster(&roster).await.unwrap();

        let mut rules = RuleTable::default();
        rules.set(RuleKey::Perfect100, 3);
        store.save_rule_table(&rules).await.unwrap();

        assert_eq!(store.load_roster().await.unwrap(), Some(roster));
        assert_eq!(store.load_rule_table().await.unwrap(), Some(rules));
    }

    #[tokio::test]
    async fn test_sqlite_store_overwrites_and_clears() {
        let store = SqliteSessionStore::connect("sqlite::memory:").await.unwrap();

        store
            .save_roster(&Roster::from_records(vec![PlayerRecord::blank("Old")]))
            .await
            .unwrap();
        let newer = Roster::from_records(vec![PlayerRecord::blank("New")]);
        store.save_roster(&newer).await.unwrap();
        assert_eq!(store.load_roster().await.unwrap(), Some(newer));

        store.clear_roster().await.unwrap();
        assert!(store.load_roster().await.unwrap().is_none());
    }
}
