//! Short-lived in-memory cache in front of bearer-token validation.
//!
//! Maps a token digest to the owning user id so most authenticated requests
//! skip the `auth_sessions` lookup. Entries live for a minute at most, which
//! also bounds how often the sliding expiry gets written back to SQLite.

use moka::sync::Cache;
use std::time::Duration;

const CACHE_TTL: Duration = Duration::from_secs(60);
const CACHE_CAPACITY: u64 = 10_000;

#[derive(Clone)]
pub struct SessionCache {
    entries: Cache<String, String>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// User id for a cached token digest
    pub fn get(&self, token_hash: &str) -> Option<String> {
        self.entries.get(token_hash)
    }

    pub fn insert(&self, token_hash: &str, user_id: &str) {
        self.entries.insert(token_hash.to_string(), user_id.to_string());
    }

    /// Forget one token (logout)
    pub fn invalidate(&self, token_hash: &str) {
        self.entries.invalidate(token_hash);
    }

    /// Forget every token. Used when a user's sessions are revoked in bulk.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_invalidate() {
        let cache = SessionCache::new();
        assert!(cache.get("t1").is_none());

        cache.insert("t1", "user-1");
        cache.insert("t2", "user-2");
        assert_eq!(cache.get("t1").as_deref(), Some("user-1"));

        cache.invalidate("t1");
        assert!(cache.get("t1").is_none());
        assert_eq!(cache.get("t2").as_deref(), Some("user-2"));

        cache.invalidate_all();
        assert!(cache.get("t2").is_none());
    }

    #[test]
    fn test_entries_expire() {
        let cache = SessionCache::with_ttl(Duration::from_millis(20));
        cache.insert("t1", "user-1");
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("t1").is_none());
    }
}
