use async_trait::async_trait;
use bulletin::ports::EphemeralCache;
use bytes::Bytes;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use shared::{Result, TtlMs};
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::trace;

/// Cached value together with the TTL it was written with
#[derive(Clone, Debug)]
struct CachedBytes {
    value: Bytes,
    ttl: Duration,
}

impl CachedBytes {
    fn new(value: Bytes, ttl: TtlMs) -> Self {
        Self {
            value,
            ttl: ttl.as_duration(),
        }
    }
}

/// Expiry counted from the last write; reads never extend it
struct WriteTtl;

impl Expiry<String, CachedBytes> for WriteTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedBytes,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedBytes,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based side cache with per-entry TTL and atomic conditional writes
pub struct MokaCache {
    cache: Cache<String, CachedBytes>,
}

impl MokaCache {
    /// Create a new unbounded Moka cache
    pub fn new_unbounded() -> Self {
        Self::new("bulletin".to_string(), None)
    }

    /// Create a new bounded Moka cache with max entries
    pub fn new_bounded(max_entries: u64) -> Self {
        Self::new("bulletin".to_string(), Some(max_entries))
    }

    /// Create a Moka cache from name and optional capacity
    pub fn new(name: String, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(&name).expire_after(WriteTtl);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }
}

#[async_trait]
impl EphemeralCache for MokaCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        // Expired entries read as absent even before eviction runs
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set_if_absent(&self, key: &str, value: Bytes, ttl: TtlMs) -> Result<bool> {
        let entry = self
            .cache
            .entry_by_ref(key)
            .or_insert(CachedBytes::new(value, ttl))
            .await;

        trace!("set_if_absent key={} stored={}", key, entry.is_fresh());
        Ok(entry.is_fresh())
    }

    async fn set_if_present(&self, key: &str, value: Bytes, ttl: TtlMs) -> Result<bool> {
        let replacement = CachedBytes::new(value, ttl);

        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(_) => Op::Put(replacement),
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        let stored = matches!(result, CompResult::ReplacedWith(_));
        trace!("set_if_present key={} stored={}", key, stored);
        Ok(stored)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }
}

impl Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const LONG: TtlMs = TtlMs(60_000);

    fn bytes(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[tokio::test]
    async fn test_set_if_absent_only_fills_empty_keys() {
        let cache = MokaCache::new_unbounded();

        assert!(cache.set_if_absent("123", bytes("first"), LONG).await.unwrap());
        assert!(!cache.set_if_absent("123", bytes("second"), LONG).await.unwrap());

        assert_eq!(cache.get("123").await.unwrap(), Some(bytes("first")));
    }

    #[tokio::test]
    async fn test_set_if_present_never_seeds() {
        let cache = MokaCache::new_unbounded();

        assert!(!cache.set_if_present("123", bytes("value"), LONG).await.unwrap());
        assert_eq!(cache.get("123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_if_present_overwrites_existing() {
        let cache = MokaCache::new_unbounded();

        cache.set_if_absent("123", bytes("old"), LONG).await.unwrap();
        assert!(cache.set_if_present("123", bytes("new"), LONG).await.unwrap());

        assert_eq!(cache.get("123").await.unwrap(), Some(bytes("new")));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MokaCache::new_unbounded();

        cache.set_if_absent("123", bytes("value"), LONG).await.unwrap();
        assert!(cache.delete("123").await.unwrap());
        assert!(!cache.delete("123").await.unwrap());
        assert_eq!(cache.get("123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let cache = MokaCache::new_unbounded();
        assert_eq!(cache.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = MokaCache::new_unbounded();

        cache
            .set_if_absent("short", bytes("value"), TtlMs(100))
            .await
            .unwrap();
        cache.set_if_absent("long", bytes("value"), LONG).await.unwrap();
        assert!(cache.get("short").await.unwrap().is_some());

        sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reads_do_not_extend_ttl() {
        let cache = MokaCache::new_unbounded();

        cache
            .set_if_absent("123", bytes("value"), TtlMs(300))
            .await
            .unwrap();

        sleep(Duration::from_millis(180)).await;
        assert!(cache.get("123").await.unwrap().is_some());

        sleep(Duration::from_millis(220)).await;
        assert_eq!(cache.get("123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_counts_as_absent_for_conditional_writes() {
        let cache = MokaCache::new_unbounded();

        cache
            .set_if_absent("123", bytes("old"), TtlMs(100))
            .await
            .unwrap();
        sleep(Duration::from_millis(200)).await;

        assert!(!cache.set_if_present("123", bytes("new"), LONG).await.unwrap());
        assert!(cache.set_if_absent("123", bytes("fresh"), LONG).await.unwrap());
        assert_eq!(cache.get("123").await.unwrap(), Some(bytes("fresh")));
    }

    #[tokio::test]
    async fn test_set_if_present_restarts_ttl() {
        let cache = MokaCache::new_unbounded();

        cache
            .set_if_absent("123", bytes("old"), TtlMs(300))
            .await
            .unwrap();
        sleep(Duration::from_millis(200)).await;
        assert!(cache.set_if_present("123", bytes("new"), TtlMs(300)).await.unwrap());

        // Past the original deadline, inside the refreshed one
        sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.get("123").await.unwrap(), Some(bytes("new")));
    }

    #[tokio::test]
    async fn test_moka_cache_bounded() {
        let cache = MokaCache::new_bounded(2);

        cache.set_if_absent("key1", bytes("value1"), LONG).await.unwrap();
        cache.set_if_absent("key2", bytes("value2"), LONG).await.unwrap();
        cache.set_if_absent("key3", bytes("value3"), LONG).await.unwrap();

        cache.cache.run_pending_tasks().await;

        let entry_count = cache.cache.entry_count();
        assert!(entry_count <= 2, "Cache should have at most 2 entries");
    }
}
