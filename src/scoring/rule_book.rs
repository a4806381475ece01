use std::sync::Arc;
use tracing::{info, warn};

use super::RuleTable;
use crate::models::Result;
use crate::session::SessionStore;

/// Owner of the active rule table.
///
/// Drafts handed out by [`RuleBook::draft`] are independent copies; nothing a
/// caller does to a draft reaches the active table until it is applied.
pub struct RuleBook {
    active: RuleTable,
    store: Arc<dyn SessionStore>,
}

impl RuleBook {
    /// Loads the persisted table, falling back to the built-in default when
    /// none is saved or the saved one cannot be read.
    pub async fn load(store: Arc<dyn SessionStore>) -> Self {
        let active = Self::load_active(store.as_ref()).await;
        Self { active, store }
    }

    pub async fn load_active(store: &dyn SessionStore) -> RuleTable {
        match store.load_rule_table().await {
            Ok(Some(table)) => {
                info!("Loaded saved rule table");
                table
            }
            Ok(None) => RuleTable::default(),
            Err(e) => {
                warn!("Could not read saved rule table, using defaults: {}", e);
                RuleTable::default()
            }
        }
    }

    pub fn active(&self) -> &RuleTable {
        &self.active
    }

    pub fn draft(&self) -> RuleTable {
        self.active.clone()
    }

    /// Makes `draft` active until the process exits.
    pub fn apply_for_session(&mut self, draft: RuleTable) {
        info!("Applying rule table for this session");
        self.active = draft;
    }

    /// Makes `draft` active and overwrites the saved table. The table stays
    /// active for the session even if saving fails.
    pub async fn save_permanently(&mut self, draft: RuleTable) -> Result<()> {
        self.active = draft;
        self.store.save_rule_table(&self.active).await?;
        info!("Saved rule table permanently");
        Ok(())
    }

    pub fn reset_draft_to_default() -> RuleTable {
        RuleTable::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CwlError;
    use crate::scoring::RuleKey;
    use crate::session::{KeyValueStore, MemorySessionStore, RULE_TABLE_KEY};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(CwlError::Config("disk on fire".to_string()))
        }

        async fn put(&self, _key: &str, _value: String) -> Result<()> {
            Err(CwlError::Config("disk on fire".to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_missing_table_resolves_to_default() {
        let book = RuleBook::load(Arc::new(MemorySessionStore::new())).await;
        assert_eq!(book.active(), &RuleTable::default());
    }

    #[tokio::test]
    async fn test_unreadable_table_resolves_to_default() {
        let book = RuleBook::load(Arc::new(BrokenStore)).await;
        assert_eq!(book.active(), &RuleTable::default());
    }

    #[tokio::test]
    async fn test_corrupt_table_resolves_to_default() {
        let store = Arc::new(MemorySessionStore::new());
        store.put(RULE_TABLE_KEY, "[1, 2".to_string()).await.unwrap();
        let book = RuleBook::load(store).await;
        assert_eq!(book.active(), &RuleTable::default());
    }

    #[tokio::test]
    async fn test_draft_edits_do_not_touch_active() {
        let mut book = RuleBook::load(Arc::new(MemorySessionStore::new())).await;
        let before = serde_json::to_string(book.active()).unwrap();

        let mut draft = book.draft();
        draft.set(RuleKey::AttackMade, 42);
        drop(draft);

        assert_eq!(serde_json::to_string(book.active()).unwrap(), before);

        let mut draft = book.draft();
        draft.set(RuleKey::AttackMade, 7);
        book.apply_for_session(draft.clone());
        draft.set(RuleKey::AttackMade, 8);
        assert_eq!(book.active().get(RuleKey::AttackMade), 7);
    }

    #[tokio::test]
    async fn test_apply_for_session_does_not_persist() {
        let store = Arc::new(MemorySessionStore::new());
        let mut book = RuleBook::load(store.clone()).await;

        let mut draft = book.draft();
        draft.set(RuleKey::CourageBase, 9);
        book.apply_for_session(draft);

        assert_eq!(book.active().get(RuleKey::CourageBase), 9);
        assert!(store.load_rule_table().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_permanently_survives_reload() {
        let store = Arc::new(MemorySessionStore::new());
        let mut book = RuleBook::load(store.clone()).await;

        let mut draft = book.draft();
        draft.set(RuleKey::AllAttacks, 5);
        book.save_permanently(draft.clone()).await.unwrap();

        let reloaded = RuleBook::load(store).await;
        assert_eq!(reloaded.active(), &draft);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_table_active() {
        let mut book = RuleBook::load(Arc::new(BrokenStore)).await;
        let mut draft = book.draft();
        draft.set(RuleKey::Perfect100, 4);

        assert!(book.save_permanently(draft).await.is_err());
        assert_eq!(book.active().get(RuleKey::Perfect100), 4);
    }

    #[test]
    fn test_reset_draft_is_default() {
        assert_eq!(RuleBook::reset_draft_to_default(), RuleTable::default());
    }
}
