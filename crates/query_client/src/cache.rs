use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::Mutex;

use shared::domain::SessionKey;

/// Documents accumulated for one session key under infinite paging, in fetch
/// order, plus the cursor from the last fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedResultSet {
    pub documents: Vec<Value>,
    pub continuation_token: Option<String>,
}

/// Keyed store of accumulated query results. Its lifecycle is independent of
/// the session registry: entries live until explicitly invalidated, so a view
/// can be torn down and recreated without the owner losing the choice of
/// whether pages survive. The query coordinator is the only writer.
#[derive(Debug, Default)]
pub struct ResultPageCache {
    entries: Mutex<HashMap<SessionKey, CachedResultSet>>,
}

impl ResultPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &SessionKey) -> Option<CachedResultSet> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Full replace; the coordinator merges pages before storing.
    pub async fn set(&self, key: SessionKey, results: CachedResultSet) {
        self.entries.lock().await.insert(key, results);
    }

    pub async fn invalidate(&self, key: &SessionKey) {
        self.entries.lock().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
