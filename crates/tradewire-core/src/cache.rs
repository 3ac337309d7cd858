//! In-memory time-to-live cache for decoded API responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::clock::{Clock, SystemClock};

/// Defines how a single request interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present;
    /// otherwise, fetch from the network and write the response to the cache.
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry,
    /// and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

/// Snapshot returned by [`CacheStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe response cache. Expired entries are dropped lazily on lookup
/// or by an explicit [`CacheStore::purge_expired`].
pub struct CacheStore<V> {
    entries: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry<V>>>>,
    counters: Arc<CacheCounters>,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            counters: Arc::clone(&self.counters),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V> std::fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl<V: Clone + Send + Sync> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            counters: Arc::new(CacheCounters::default()),
            clock,
        }
    }

    /// Returns the value stored under `key` if it has not expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.get_with(key, |value| Some(value.clone())).await
    }

    /// Reads a fresh entry through `read`.
    ///
    /// Only a `Some` from `read` counts as a hit. An entry `read` rejects is
    /// evicted and the lookup counts as a miss.
    pub async fn get_with<U>(&self, key: &str, read: impl FnOnce(&V) -> Option<U>) -> Option<U> {
        let now = self.clock.now();
        let mut rejected_at = None;
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => match read(&entry.value) {
                    Some(found) => {
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        return Some(found);
                    }
                    None => rejected_at = Some(entry.stored_at),
                },
                Some(_) => {}
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        let mut entries = self.entries.write().await;
        match entries.get(key) {
            // Leave a replacement written since the read lock was released.
            Some(entry) if rejected_at == Some(entry.stored_at) => {
                entries.remove(key);
            }
            Some(entry) if rejected_at.is_none() && !entry.is_fresh(now) => {
                entries.remove(key);
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// A zero `ttl` stores nothing and drops the previous entry.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let mut entries = self.entries.write().await;
        if ttl.is_zero() {
            entries.remove(&key);
            return;
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: self.clock.now(),
                ttl,
            },
        );
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Removes every entry whose key matches `pattern` and returns how many
    /// were dropped.
    ///
    /// `*` matches everything, `prefix*` and `*suffix` anchor at one end,
    /// `*part*` and bare patterns match anywhere in the key.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !pattern_matches(pattern, key));
        before - entries.len()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        let purged = before - entries.len();
        self.counters
            .expirations
            .fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.expirations.store(0, Ordering::Relaxed);
    }
}

fn pattern_matches(pattern: &str, key: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(_), Some(_)) => key.contains(&pattern[1..pattern.len() - 1]),
        (None, Some(prefix)) => key.starts_with(prefix),
        (Some(suffix), None) => key.ends_with(suffix),
        (None, None) => key.contains(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn manual_cache() -> (CacheStore<String>, ManualClock) {
        let clock = ManualClock::new();
        (CacheStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_cache_store_basic_operations() {
        let (cache, _) = manual_cache();

        assert!(cache.get("key1").await.is_none());

        cache
            .set("key1", "value1".to_string(), Duration::from_secs(1))
            .await;
        assert_eq!(cache.get("key1").await, Some("value1".to_string()));

        cache
            .set("key1", "value2".to_string(), Duration::from_secs(1))
            .await;
        assert_eq!(cache.get("key1").await, Some("value2".to_string()));
    }

    #[tokio::test]
    async fn test_cache_expiration_boundary() {
        let (cache, clock) = manual_cache();

        cache
            .set("key1", "value1".to_string(), Duration::from_millis(1000))
            .await;

        clock.advance(Duration::from_millis(999));
        assert!(cache.get("key1").await.is_some());

        clock.advance(Duration::from_millis(2));
        assert!(cache.get("key1").await.is_none());
        assert_eq!(cache.len().await, 0, "expired entry is evicted on lookup");
    }

    #[tokio::test]
    async fn test_zero_ttl_drops_entry() {
        let (cache, _) = manual_cache();

        cache
            .set("key1", "value1".to_string(), Duration::from_secs(60))
            .await;
        cache.set("key1", "value2".to_string(), Duration::ZERO).await;

        assert!(cache.get("key1").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_by_pattern() {
        let (cache, _) = manual_cache();
        let ttl = Duration::from_secs(60);
        cache.set("GET_https://a.test/rates_", "a".into(), ttl).await;
        cache.set("GET_https://a.test/pincode_", "b".into(), ttl).await;
        cache.set("GET_https://b.test/rates_", "c".into(), ttl).await;

        assert_eq!(cache.invalidate("GET_https://a.test*").await, 2);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.invalidate("rates").await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_fresh_entries() {
        let (cache, clock) = manual_cache();

        cache
            .set("short", "1".to_string(), Duration::from_millis(100))
            .await;
        cache
            .set("long", "2".to_string(), Duration::from_secs(60))
            .await;

        clock.advance(Duration::from_millis(150));
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let (cache, _) = manual_cache();
        cache
            .set("key1", "value1".to_string(), Duration::from_secs(60))
            .await;

        cache.get("key1").await;
        cache.get("key1").await;
        cache.get("absent").await;

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);

        cache.reset_stats();
        cache.clear().await;
        assert_eq!(cache.stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_rejected_entry_is_evicted_and_counted_as_miss() {
        let (cache, _) = manual_cache();
        cache
            .set("key1", "not-a-number".to_string(), Duration::from_secs(60))
            .await;

        let parsed = cache
            .get_with("key1", |value| value.parse::<u32>().ok())
            .await;

        assert!(parsed.is_none());
        assert!(cache.is_empty().await);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 0);
    }

    #[tokio::test]
    async fn test_accepted_read_counts_as_hit() {
        let (cache, _) = manual_cache();
        cache
            .set("key1", "42".to_string(), Duration::from_secs(60))
            .await;

        let parsed = cache
            .get_with("key1", |value| value.parse::<u32>().ok())
            .await;

        assert_eq!(parsed, Some(42));
        assert_eq!(cache.stats().await.hits, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn test_pattern_matching_forms() {
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("GET_*", "GET_/foo_"));
        assert!(!pattern_matches("POST_*", "GET_/foo_"));
        assert!(pattern_matches("*_", "GET_/foo_"));
        assert!(pattern_matches("*foo*", "GET_/foo_"));
        assert!(pattern_matches("foo", "GET_/foo_"));
    }

    #[test]
    fn test_cache_mode_default() {
        let mode: CacheMode = Default::default();
        assert_eq!(mode, CacheMode::Use);
        assert!(CacheMode::Refresh.writes());
        assert!(!CacheMode::Refresh.reads());
        assert!(!CacheMode::Bypass.writes());
    }
}
