use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::models::{Result, Roster};
use crate::scoring::RuleTable;

pub const ROSTER_KEY: &str = "cwl-roster";
pub const RULE_TABLE_KEY: &str = "cwl-rule-table";

/// Durable state of one installation: the roster in progress and the saved
/// rule table.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_roster(&self) -> Result<Option<Roster>>;

    async fn save_roster(&self, roster: &Roster) -> Result<()>;

    async fn clear_roster(&self) -> Result<()>;

    async fn load_rule_table(&self) -> Result<Option<RuleTable>>;

    async fn save_rule_table(&self, table: &RuleTable) -> Result<()>;
}

/// String key-value substrate the session store is kept in.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: KeyValueStore> SessionStore for T {
    async fn load_roster(&self) -> Result<Option<Roster>> {
        match self.get(ROSTER_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_roster(&self, roster: &Roster) -> Result<()> {
        let raw = serde_json::to_string(roster)?;
        self.put(ROSTER_KEY, raw).await
    }

    async fn clear_roster(&self) -> Result<()> {
        self.remove(ROSTER_KEY).await
    }

    async fn load_rule_table(&self) -> Result<Option<RuleTable>> {
        match self.get(RULE_TABLE_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_rule_table(&self, table: &RuleTable) -> Result<()> {
        let raw = serde_json::to_string(table)?;
        self.put(RULE_TABLE_KEY, raw).await
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}

#[async_trait]
impl KeyValueStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, PlayerRecord};
    use crate::scoring::RuleKey;

    #[tokio::test]
    async fn test_roster_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.load_roster().await.unwrap().is_none());

        let mut record = PlayerRecord::blank("Alice");
        record.set(Field::OwnTownHall, Some(0));
        record.set(Field::Stars(3), Some(2));
        let roster = Roster::from_records(vec![record, PlayerRecord::blank("Bob")]);

        store.save_roster(&roster).await.unwrap();
        assert_eq!(store.load_roster().await.unwrap(), Some(roster));

        store.clear_roster().await.unwrap();
        assert!(store.load_roster().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rule_table_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.load_rule_table().await.unwrap().is_none());

        let mut table = RuleTable::default();
        table.set(RuleKey::AllAttacks, 10);
        store.save_rule_table(&table).await.unwrap();

        assert_eq!(store.load_rule_table().await.unwrap(), Some(table));
    }

    #[tokio::test]
    async fn test_corrupt_roster_is_an_error() {
        let store = MemorySessionStore::new();
        store.put(ROSTER_KEY, "not json".to_string()).await.unwrap();
        assert!(store.load_roster().await.is_err());
    }

    #[tokio::test]
    async fn test_clearing_roster_keeps_rule_table() {
        let store = MemorySessionStore::new();
        store.save_roster(&Roster::new()).await.unwrap();
        store.save_rule_table(&RuleTable::default()).await.unwrap();

        store.clear_roster().await.unwrap();
        assert!(!store.contains(ROSTER_KEY).await);
        assert!(store.contains(RULE_TABLE_KEY).await);
    }
}
