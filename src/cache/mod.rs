//! In-memory metadata cache.
//!
//! Bounded, thread-safe LRU cache with per-category TTL expiration, used to
//! avoid redundant server reads for frequently re-read items (dashboard
//! widgets, detail views, sync lookups). Not part of the bulk-sync data path.
//!
//! Categories:
//! - Widget cache: short TTL (5 min), for dashboard/home items
//! - Detail cache: medium TTL (15 min), for item detail views
//! - Sync cache: long TTL (60 min), for library sync operations
//!
//! The host builds one `Arc<MetadataCache>` at startup and passes it to every
//! call site; reset only via [`clear`](MetadataCache::clear).

use std::fmt;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use reelsync_common::ItemId;

use crate::config::CacheConfig;

/// Cache category, selecting which TTL applies to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    /// Dashboard/home widget data.
    Widget,
    /// Item detail views.
    Detail,
    /// Library sync operations.
    Sync,
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Widget => write!(f, "widget"),
            Self::Detail => write!(f, "detail"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

/// Single cache entry with its insertion timestamp and access count.
#[derive(Debug)]
struct CacheEntry {
    payload: Value,
    inserted_at: Instant,
    category: CacheCategory,
    access_count: u64,
}

impl CacheEntry {
    fn new(payload: Value, category: CacheCategory) -> Self {
        Self {
            payload,
            inserted_at: Instant::now(),
            category,
            access_count: 0,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

struct CacheInner {
    /// Recency-ordered entries; capacity is enforced by hand so eviction
    /// counts and the strictly-under-capacity rule stay explicit.
    entries: LruCache<ItemId, CacheEntry>,
    counters: Counters,
}

/// Entry counts per category, as reported by [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub widget: usize,
    pub detail: usize,
    pub sync: usize,
}

/// Snapshot of cache statistics.
///
/// All counters are monotonic for the lifetime of the cache instance except
/// `size`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Hit percentage over all lookups, rounded to two decimals.
    pub hit_rate: f64,
    pub by_category: CategoryCounts,
}

/// Thread-safe LRU cache with TTL expiration for metadata payloads.
///
/// Every public operation runs under one lock over the whole structure. The
/// cache is read-mostly and bursty rather than a hot per-request path, so
/// whole-structure serialization is an acceptable tradeoff that avoids
/// lock-ordering hazards.
///
/// Payloads are value-isolated: [`set`](Self::set) takes ownership of the
/// stored value and [`get`](Self::get) returns a clone, so mutating a
/// returned payload never affects cached state.
///
/// # Examples
///
/// ```
/// use reelsync::cache::{CacheCategory, MetadataCache};
/// use reelsync::config::CacheConfig;
/// use reelsync_common::ItemId;
/// use serde_json::json;
///
/// let cache = MetadataCache::new(&CacheConfig::default());
/// cache.set(ItemId::new(5), json!({"title": "Foo"}), CacheCategory::Widget);
/// assert!(cache.get(ItemId::new(5), None).is_some());
/// ```
pub struct MetadataCache {
    inner: Mutex<CacheInner>,
    max_size: usize,
    ttl_widget: Duration,
    ttl_detail: Duration,
    ttl_sync: Duration,
}

impl MetadataCache {
    /// Create a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_limits(
            config.max_size,
            Duration::from_secs(config.ttl_widget_secs),
            Duration::from_secs(config.ttl_detail_secs),
            Duration::from_secs(config.ttl_sync_secs),
        )
    }

    /// Create a cache with explicit size and TTL limits.
    pub fn with_limits(
        max_size: usize,
        ttl_widget: Duration,
        ttl_detail: Duration,
        ttl_sync: Duration,
    ) -> Self {
        debug!(
            max_size,
            ttl_widget_secs = ttl_widget.as_secs(),
            ttl_detail_secs = ttl_detail.as_secs(),
            ttl_sync_secs = ttl_sync.as_secs(),
            "Metadata cache initialized"
        );
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                counters: Counters::default(),
            }),
            max_size: max_size.max(1),
            ttl_widget,
            ttl_detail,
            ttl_sync,
        }
    }

    fn ttl_for(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Widget => self.ttl_widget,
            CacheCategory::Detail => self.ttl_detail,
            CacheCategory::Sync => self.ttl_sync,
        }
    }

    /// Retrieve the cached payload for `key`.
    ///
    /// Returns `None` when the key is unknown, when `category` is given and
    /// does not match the stored entry, or when the entry's TTL has elapsed
    /// (in which case the entry is purged on the spot). A hit promotes the
    /// entry to most-recently-used, bumps its access count, and returns an
    /// isolated copy of the payload.
    pub fn get(&self, key: ItemId, category: Option<CacheCategory>) -> Option<Value> {
        let inner = &mut *self.inner.lock();

        let (stored_category, expired) = match inner.entries.peek(&key) {
            Some(entry) => (
                entry.category,
                entry.is_expired(self.ttl_for(entry.category)),
            ),
            None => {
                inner.counters.misses += 1;
                return None;
            }
        };

        if let Some(category) = category {
            if stored_category != category {
                inner.counters.misses += 1;
                return None;
            }
        }

        if expired {
            inner.entries.pop(&key);
            inner.counters.expirations += 1;
            inner.counters.misses += 1;
            return None;
        }

        // Promote to most-recently-used.
        let entry = inner.entries.get_mut(&key)?;
        entry.access_count += 1;
        let payload = entry.payload.clone();
        inner.counters.hits += 1;
        Some(payload)
    }

    /// Store a payload under `key`.
    ///
    /// When `key` is new and the cache is at or above capacity, least
    /// recently used entries are evicted until strictly under `max_size`
    /// before the insert. The new or updated entry becomes most recently
    /// used. Eviction is driven purely by size, independent of TTL.
    pub fn set(&self, key: ItemId, payload: Value, category: CacheCategory) {
        let mut inner = self.inner.lock();
        store(&mut inner, self.max_size, key, payload, category);
    }

    /// Store several payloads under one held lock, atomically with respect
    /// to every other cache operation.
    pub fn set_batch(
        &self,
        items: impl IntoIterator<Item = (ItemId, Value)>,
        category: CacheCategory,
    ) {
        let mut inner = self.inner.lock();
        let mut count = 0usize;
        for (key, payload) in items {
            store(&mut inner, self.max_size, key, payload, category);
            count += 1;
        }
        debug!(count, category = %category, "Batch cached items");
    }

    /// Remove `key` unconditionally.
    pub fn invalidate(&self, key: ItemId) {
        let mut inner = self.inner.lock();
        if inner.entries.pop(&key).is_some() {
            debug!(item_id = %key, "Cache invalidate");
        }
    }

    /// Remove several keys unconditionally.
    pub fn invalidate_batch(&self, keys: &[ItemId]) {
        let mut inner = self.inner.lock();
        let mut count = 0usize;
        for key in keys {
            if inner.entries.pop(key).is_some() {
                count += 1;
            }
        }
        if count > 0 {
            debug!(count, "Batch invalidate");
        }
    }

    /// Remove every entry of the given category.
    pub fn invalidate_by_type(&self, category: CacheCategory) {
        let mut inner = self.inner.lock();
        let keys: Vec<ItemId> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.category == category)
            .map(|(key, _)| *key)
            .collect();
        for key in &keys {
            inner.entries.pop(key);
        }
        debug!(category = %category, count = keys.len(), "Invalidate by category");
    }

    /// Eagerly remove every entry whose TTL has elapsed.
    ///
    /// Complements the lazy per-[`get`](Self::get) expiry.
    pub fn cleanup(&self) {
        let mut inner = self.inner.lock();
        let expired: Vec<ItemId> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl_for(entry.category)))
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            inner.entries.pop(key);
            inner.counters.expirations += 1;
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Cache cleanup removed expired entries");
        }
    }

    /// Remove everything. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        info!(count, "Cache cleared");
    }

    /// Snapshot current statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.counters.hits + inner.counters.misses;
        let hit_rate = if total > 0 {
            let rate = inner.counters.hits as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };

        let mut by_category = CategoryCounts::default();
        for (_, entry) in inner.entries.iter() {
            match entry.category {
                CacheCategory::Widget => by_category.widget += 1,
                CacheCategory::Detail => by_category.detail += 1,
                CacheCategory::Sync => by_category.sync += 1,
            }
        }

        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            evictions: inner.counters.evictions,
            expirations: inner.counters.expirations,
            hit_rate,
            by_category,
        }
    }

    /// Number of physically present entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Whether `key` is present and unexpired. Does not update recency or
    /// any counter.
    pub fn contains(&self, key: ItemId) -> bool {
        let inner = self.inner.lock();
        inner
            .entries
            .peek(&key)
            .map(|entry| !entry.is_expired(self.ttl_for(entry.category)))
            .unwrap_or(false)
    }
}

/// Insert under an already-held lock, evicting LRU entries first when the
/// key is new and the cache is at capacity.
fn store(
    inner: &mut CacheInner,
    max_size: usize,
    key: ItemId,
    payload: Value,
    category: CacheCategory,
) {
    if !inner.entries.contains(&key) {
        while inner.entries.len() >= max_size {
            if let Some((evicted, _)) = inner.entries.pop_lru() {
                inner.counters.evictions += 1;
                debug!(item_id = %evicted, "Cache eviction");
            } else {
                break;
            }
        }
    }
    inner.entries.put(key, CacheEntry::new(payload, category));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    const LONG: Duration = Duration::from_secs(3600);
    const SHORT: Duration = Duration::from_millis(40);

    fn cache_with_max(max_size: usize) -> MetadataCache {
        MetadataCache::with_limits(max_size, LONG, LONG, LONG)
    }

    #[test]
    fn set_then_get_returns_isolated_copy() {
        let cache = cache_with_max(10);
        let payload = json!({"title": "Foo", "year": 2014});
        cache.set(ItemId::new(1), payload.clone(), CacheCategory::Widget);

        let mut fetched = cache.get(ItemId::new(1), None).unwrap();
        assert_eq!(fetched, payload);

        // Mutating the returned value must not affect the cached copy.
        fetched["title"] = json!("Bar");
        let fetched_again = cache.get(ItemId::new(1), None).unwrap();
        assert_eq!(fetched_again["title"], json!("Foo"));
    }

    #[test]
    fn category_mismatch_is_a_miss() {
        let cache = cache_with_max(10);
        cache.set(ItemId::new(1), json!("a"), CacheCategory::Detail);

        assert!(cache.get(ItemId::new(1), Some(CacheCategory::Widget)).is_none());
        assert!(cache.get(ItemId::new(1), Some(CacheCategory::Detail)).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn capacity_eviction_removes_lru_first() {
        let cache = cache_with_max(3);
        for id in 1..=3u64 {
            cache.set(ItemId::new(id), json!(id), CacheCategory::Sync);
        }
        // Touch key 1 so key 2 becomes least recently used.
        cache.get(ItemId::new(1), None).unwrap();

        cache.set(ItemId::new(4), json!(4), CacheCategory::Sync);

        assert!(cache.get(ItemId::new(2), None).is_none());
        assert!(cache.get(ItemId::new(1), None).is_some());
        assert!(cache.get(ItemId::new(3), None).is_some());
        assert!(cache.get(ItemId::new(4), None).is_some());
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.len() <= 3);
    }

    #[test]
    fn eviction_counter_increments_once_per_excess_insert() {
        let cache = cache_with_max(5);
        for id in 1..=6u64 {
            cache.set(ItemId::new(id), json!(id), CacheCategory::Widget);
        }
        let stats = cache.stats();
        assert_eq!(stats.size, 5);
        assert_eq!(stats.evictions, 1);
        // Key 1 was the least recently used.
        assert!(cache.get(ItemId::new(1), None).is_none());
    }

    #[test]
    fn updating_existing_key_does_not_evict() {
        let cache = cache_with_max(2);
        cache.set(ItemId::new(1), json!("a"), CacheCategory::Widget);
        cache.set(ItemId::new(2), json!("b"), CacheCategory::Widget);
        cache.set(ItemId::new(1), json!("a2"), CacheCategory::Widget);

        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get(ItemId::new(1), None).unwrap(), json!("a2"));
    }

    #[test]
    fn ttl_expiry_scenario() {
        // Scenario A: a widget entry past its TTL is absent and counted as
        // exactly one expiration.
        let cache = MetadataCache::with_limits(10, SHORT, LONG, LONG);
        cache.set(ItemId::new(5), json!({"title": "Foo"}), CacheCategory::Widget);

        std::thread::sleep(SHORT + Duration::from_millis(30));

        assert!(cache.get(ItemId::new(5), None).is_none());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);

        // A second lookup is a plain miss, not another expiration.
        assert!(cache.get(ItemId::new(5), None).is_none());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn hit_before_ttl_elapses() {
        let cache = MetadataCache::with_limits(10, LONG, LONG, LONG);
        cache.set(ItemId::new(5), json!("v"), CacheCategory::Widget);

        assert!(cache.get(ItemId::new(5), None).is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.expirations, 0);
    }

    #[test]
    fn set_batch_respects_capacity() {
        // Scenario B: max_size 1, two keys batched, only the second survives.
        let cache = cache_with_max(1);
        cache.set_batch(
            vec![(ItemId::new(1), json!("a")), (ItemId::new(2), json!("b"))],
            CacheCategory::Sync,
        );

        assert!(cache.get(ItemId::new(1), None).is_none());
        assert_eq!(cache.get(ItemId::new(2), None).unwrap(), json!("b"));
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_variants() {
        let cache = cache_with_max(10);
        cache.set(ItemId::new(1), json!(1), CacheCategory::Widget);
        cache.set(ItemId::new(2), json!(2), CacheCategory::Detail);
        cache.set(ItemId::new(3), json!(3), CacheCategory::Detail);
        cache.set(ItemId::new(4), json!(4), CacheCategory::Sync);

        cache.invalidate(ItemId::new(1));
        assert!(!cache.contains(ItemId::new(1)));

        cache.invalidate_batch(&[ItemId::new(2), ItemId::new(99)]);
        assert!(!cache.contains(ItemId::new(2)));

        cache.invalidate_by_type(CacheCategory::Detail);
        assert!(!cache.contains(ItemId::new(3)));
        assert!(cache.contains(ItemId::new(4)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cleanup_sweeps_expired_entries() {
        let cache = MetadataCache::with_limits(10, SHORT, LONG, LONG);
        cache.set(ItemId::new(1), json!(1), CacheCategory::Widget);
        cache.set(ItemId::new(2), json!(2), CacheCategory::Detail);

        std::thread::sleep(SHORT + Duration::from_millis(30));
        cache.cleanup();

        assert_eq!(cache.len(), 1);
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert!(cache.contains(ItemId::new(2)));
    }

    #[test]
    fn clear_removes_everything_but_keeps_counters() {
        let cache = cache_with_max(10);
        cache.set(ItemId::new(1), json!(1), CacheCategory::Widget);
        cache.get(ItemId::new(1), None).unwrap();
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn stats_report_categories_and_hit_rate() {
        let cache = cache_with_max(10);
        cache.set(ItemId::new(1), json!(1), CacheCategory::Widget);
        cache.set(ItemId::new(2), json!(2), CacheCategory::Widget);
        cache.set(ItemId::new(3), json!(3), CacheCategory::Sync);

        cache.get(ItemId::new(1), None);
        cache.get(ItemId::new(99), None);

        let stats = cache.stats();
        assert_eq!(stats.size, 3);
        assert_eq!(stats.max_size, 10);
        assert_eq!(stats.by_category.widget, 2);
        assert_eq!(stats.by_category.detail, 0);
        assert_eq!(stats.by_category.sync, 1);
        assert_eq!(stats.hit_rate, 50.0);
    }

    #[test]
    fn contains_does_not_touch_recency_or_counters() {
        let cache = cache_with_max(2);
        cache.set(ItemId::new(1), json!(1), CacheCategory::Widget);
        cache.set(ItemId::new(2), json!(2), CacheCategory::Widget);

        // `contains` must not promote key 1; key 1 stays LRU and gets
        // evicted by the next insert.
        assert!(cache.contains(ItemId::new(1)));
        cache.set(ItemId::new(3), json!(3), CacheCategory::Widget);

        assert!(!cache.contains(ItemId::new(1)));
        assert!(cache.contains(ItemId::new(2)));
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn concurrent_access_is_safe() {
        use std::sync::Arc;

        let cache = Arc::new(cache_with_max(100));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50u64 {
                    let key = ItemId::new(t * 1000 + i);
                    cache.set(key, json!(i), CacheCategory::Sync);
                    assert!(cache.get(key, Some(CacheCategory::Sync)).is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 100);
    }
}
