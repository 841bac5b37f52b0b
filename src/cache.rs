// Query cache with explicit invalidation
//
// A process-wide keyed cache of server collections. Reads that find a fresh
// entry are served from memory; a missing or stale entry means the caller
// must fetch from the backend and `store()` the result. Mutations never touch
// the cache directly: they call `invalidate()`, which marks the entry stale
// and publishes the key on a broadcast channel so any screen displaying that
// collection can refetch.
//
// The set of keys is a closed enum rather than free-form strings so every
// invalidation site names exactly which collections it dirties.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Server-side collections the client caches
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum CollectionKey {
    Leads,
    Contacts,
    Deals,
    Insights,
}

impl CollectionKey {
    /// URL path segment for this collection
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::Insights => "insights",
        }
    }
}

impl std::fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cached collection payload
#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    fetched_at: DateTime<Utc>,
    stale: bool,
}

/// Capacity of the invalidation broadcast channel
///
/// Subscribers that lag behind simply miss keys and will catch up on their
/// next stale-check, so a small buffer is enough.
const INVALIDATION_BUFFER: usize = 32;

/// Keyed cache of server data with invalidation pub/sub
///
/// Cheap to clone: all clones share the same entries and publisher.
#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<CollectionKey, CacheEntry>>>,
    invalidations: broadcast::Sender<CollectionKey>,
}

impl QueryCache {
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_BUFFER);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            invalidations,
        }
    }

    /// Store a freshly fetched payload, clearing any stale flag
    pub fn store(&self, key: CollectionKey, value: serde_json::Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Utc::now(),
                stale: false,
            },
        );
    }

    /// Get the cached payload for a key, if present and fresh
    pub fn get(&self, key: CollectionKey) -> Option<serde_json::Value> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&key)
            .filter(|e| !e.stale)
            .map(|e| e.value.clone())
    }

    /// When the current payload for a key was fetched, if it is fresh
    pub fn fetched_at(&self, key: CollectionKey) -> Option<DateTime<Utc>> {
        let entries = self.entries.lock().unwrap();
        entries.get(&key).filter(|e| !e.stale).map(|e| e.fetched_at)
    }

    /// Whether the next read for this key must hit the backend
    pub fn needs_fetch(&self, key: CollectionKey) -> bool {
        let entries = self.entries.lock().unwrap();
        entries.get(&key).map(|e| e.stale).unwrap_or(true)
    }

    /// Mark a key stale and notify subscribers
    pub fn invalidate(&self, key: CollectionKey) {
        {
            let mut entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.get_mut(&key) {
                entry.stale = true;
            }
        }
        tracing::debug!(collection = %key, "Cache invalidated");
        // Send fails only when nobody is subscribed, which is fine
        let _ = self.invalidations.send(key);
    }

    /// Invalidate several keys at once
    pub fn invalidate_many(&self, keys: &[CollectionKey]) {
        for key in keys {
            self.invalidate(*key);
        }
    }

    /// Subscribe to invalidation notifications
    pub fn subscribe(&self) -> broadcast::Receiver<CollectionKey> {
        self.invalidations.subscribe()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_key_needs_fetch() {
        let cache = QueryCache::new();
        assert!(cache.needs_fetch(CollectionKey::Leads));
        assert!(cache.get(CollectionKey::Leads).is_none());
    }

    #[test]
    fn test_store_then_get() {
        let cache = QueryCache::new();
        cache.store(CollectionKey::Deals, json!([{"id": 1}]));

        assert!(!cache.needs_fetch(CollectionKey::Deals));
        assert_eq!(cache.get(CollectionKey::Deals), Some(json!([{"id": 1}])));
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let cache = QueryCache::new();
        cache.store(CollectionKey::Contacts, json!([]));
        cache.invalidate(CollectionKey::Contacts);

        // Stale entries are never served
        assert!(cache.get(CollectionKey::Contacts).is_none());
        assert!(cache.needs_fetch(CollectionKey::Contacts));

        // A fresh store clears the stale flag
        cache.store(CollectionKey::Contacts, json!([{"id": 7}]));
        assert!(!cache.needs_fetch(CollectionKey::Contacts));
    }

    #[test]
    fn test_invalidation_broadcast() {
        let cache = QueryCache::new();
        let mut rx = cache.subscribe();

        cache.invalidate_many(&[CollectionKey::Leads, CollectionKey::Insights]);

        assert_eq!(rx.try_recv(), Ok(CollectionKey::Leads));
        assert_eq!(rx.try_recv(), Ok(CollectionKey::Insights));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clones_share_entries() {
        let a = QueryCache::new();
        let b = a.clone();
        a.store(CollectionKey::Leads, json!([]));
        assert!(!b.needs_fetch(CollectionKey::Leads));
    }
}
