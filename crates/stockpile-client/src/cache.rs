//! TTL cache for GET responses.
//!
//! Entries are keyed by request signature and expire `ttl` after being
//! stored. Expiry is enforced lazily on lookup; the background sweep exists
//! only to bound memory between lookups.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// A cached GET payload.
struct CacheEntry {
    payload: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// TTL-keyed store of prior successful GET responses.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl ResponseCache {
    /// Creates an empty cache with the given default entry lifetime.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Looks up a live entry, evicting it if it has expired.
    pub async fn get(&self, signature: &str) -> Option<Value> {
        let mut entries = self.entries.write().await;
        match entries.get(signature) {
            Some(entry) if !entry.is_expired() => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(signature);
                None
            }
            None => None,
        }
    }

    /// Stores a payload under a signature. `ttl` of `None` uses the cache
    /// default.
    pub async fn put(&self, signature: &str, payload: Value, ttl: Option<Duration>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            signature.to_string(),
            CacheEntry {
                payload,
                stored_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
            },
        );
    }

    /// Drops the entry with the exact signature and every entry whose
    /// signature starts with `target`. Mutation handlers use this to evict
    /// reads they have just made stale. Returns the number of entries
    /// removed.
    pub async fn invalidate(&self, target: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|sig, _| !sig.starts_with(target));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(target, removed, "cache invalidated");
        }
        removed
    }

    /// Removes expired entries. Returns the number swept.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!(swept, remaining = entries.len(), "cache sweep");
        }
        swept
    }

    /// Number of entries currently held, including not-yet-swept expired
    /// ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` when the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Spawns the periodic sweep. The task runs until aborted.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                cache.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("GET /tags?#", json!(["a", "b"]), None).await;
        assert_eq!(cache.get("GET /tags?#").await, Some(json!(["a", "b"])));
    }

    #[tokio::test]
    async fn test_miss_after_ttl_elapses() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache
            .put("GET /tags?#", json!([]), Some(Duration::from_millis(5)))
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get("GET /tags?#").await.is_none());
        // The expired entry was evicted by the lookup.
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_signature_misses() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        assert!(cache.get("GET /nothing?#").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_exact_signature() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("GET /entities/tree?#", json!([]), None).await;
        assert_eq!(cache.invalidate("GET /entities/tree?#").await, 1);
        assert!(cache.get("GET /entities/tree?#").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("GET /entities/tree?#", json!([]), None).await;
        cache.put("GET /entities/42?#", json!({}), None).await;
        cache.put("GET /tags?#", json!([]), None).await;

        assert_eq!(cache.invalidate("GET /entities").await, 2);
        assert!(cache.get("GET /tags?#").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_unknown_prefix_is_noop() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("GET /tags?#", json!([]), None).await;
        assert_eq!(cache.invalidate("GET /spaces").await, 0);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache
            .put("GET /old?#", json!(1), Some(Duration::from_millis(1)))
            .await;
        cache.put("GET /live?#", json!(2), None).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.get("GET /live?#").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("GET /tags?#", json!(1), None).await;
        cache.put("GET /tags?#", json!(2), None).await;
        assert_eq!(cache.get("GET /tags?#").await, Some(json!(2)));
        assert_eq!(cache.len().await, 1);
    }
}
