use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct CacheEntry {
    body: String,
    expires_at: Instant,
}

/// Process wide response cache for the global feed, keyed by request URI.
///
/// Entries live for a fixed TTL; serving a page that is stale within that
/// window is acceptable. Post mutations purge the whole cache so freshly
/// created content becomes observable immediately. A zero TTL disables
/// caching entirely.
pub struct PageCache {
    ttl: Duration,
    store: RwLock<HashMap<String, CacheEntry>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            store: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if Instant::now() > entry.expires_at {
            drop(store);
            let mut store = self.store.write().await;
            store.remove(key);
            return None;
        }

        Some(entry.body.clone())
    }

    pub async fn put(&self, key: String, body: String) {
        if self.ttl.is_zero() {
            return;
        }
        let mut store = self.store.write().await;
        store.insert(
            key,
            CacheEntry {
                body,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub async fn purge(&self) {
        let mut store = self.store.write().await;
        store.clear();
    }
}
