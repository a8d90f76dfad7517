// Availability cache: keeps fetched availability maps per destination so repeat page
// visits and calendar refreshes do not hit the availability endpoint every time.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::availability::AvailabilityMap;
use crate::availability_client::AvailabilitySource;
use crate::error::AvailabilityError;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub items_count: AtomicUsize,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub invalidated_count: AtomicUsize,
    pub average_lookup_time_ns: AtomicU64,
    pub total_lookups: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
    pub invalidated_count: usize,
    pub average_lookup_time_ns: u64,
    pub total_lookups: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl_seconds: u64,
    pub eviction_policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            default_ttl_seconds: 300,
            eviction_policy: EvictionPolicy::LeastRecentlyUsed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
    LeastRecentlyUsed,
    LeastFrequentlyUsed,
    TimeToLive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Evicted,
    Expired,
    Invalidated,
}

struct CacheEntry {
    map: Arc<AvailabilityMap>,
    created_at: Instant,
    ttl: Duration,
    access_count: usize,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct AvailabilityCache {
    entries: DashMap<String, CacheEntry>,
    config: RwLock<CacheConfig>,
    stats: CacheStats,
}

impl AvailabilityCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config: RwLock::new(config),
            stats: CacheStats::default(),
        }
    }

    // Store a map for a destination. TTL of None uses the configured default.
    pub fn store(
        &self,
        destination_id: &str,
        map: AvailabilityMap,
        ttl: Option<Duration>,
    ) -> Arc<AvailabilityMap> {
        let (default_ttl_seconds, max_entries) = {
            let config = self.config.read();
            (config.default_ttl_seconds, config.max_entries)
        };
        let ttl = ttl.unwrap_or_else(|| Duration::from_secs(default_ttl_seconds));

        if !self.entries.contains_key(destination_id) {
            while max_entries > 0 && self.entries.len() >= max_entries {
                if !self.evict_one() {
                    break;
                }
            }
        }

        debug!(destination_id, dates = map.len(), ?ttl, "Caching availability");

        let now = Instant::now();
        let map = Arc::new(map);
        let previous = self.entries.insert(
            destination_id.to_string(),
            CacheEntry {
                map: Arc::clone(&map),
                created_at: now,
                ttl,
                access_count: 0,
                last_accessed: now,
            },
        );
        if previous.is_none() {
            self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        }
        map
    }

    // Fresh map for the destination, if cached and not expired
    pub fn get(&self, destination_id: &str) -> Option<Arc<AvailabilityMap>> {
        let now = Instant::now();
        self.stats.total_lookups.fetch_add(1, Ordering::SeqCst);

        let result = match self.entries.get_mut(destination_id) {
            Some(mut entry) if !entry.is_expired() => {
                entry.access_count += 1;
                entry.last_accessed = Instant::now();
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                Some(Arc::clone(&entry.map))
            }
            Some(entry) => {
                // Release the shard lock before removing
                drop(entry);
                self.remove_entry(destination_id, Removal::Expired);
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
            None => {
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
        };

        self.store_lookup_time(now);
        result
    }

    // Return the cached map or fetch, cache and return a fresh one
    pub async fn get_or_fetch<S: AvailabilitySource + ?Sized>(
        &self,
        source: &S,
        destination_id: &str,
    ) -> Result<Arc<AvailabilityMap>, AvailabilityError> {
        if let Some(map) = self.get(destination_id) {
            return Ok(map);
        }
        let map = source.fetch(destination_id).await?;
        Ok(self.store(destination_id, map, None))
    }

    // Warm the cache for several destinations concurrently; returns how many were stored
    pub async fn prefetch<S: AvailabilitySource + ?Sized>(
        &self,
        source: &S,
        destination_ids: &[String],
        ttl: Option<Duration>,
    ) -> usize {
        let fetches = destination_ids.iter().map(|id| async move {
            (id, source.fetch(id).await)
        });

        let mut stored = 0;
        for (id, result) in join_all(fetches).await {
            match result {
                Ok(map) => {
                    let _ = self.store(id, map, ttl);
                    stored += 1;
                }
                Err(err) => warn!(destination_id = %id, "Prefetch failed: {}", err),
            }
        }
        stored
    }

    // Drop one destination, or everything when None
    pub fn invalidate(&self, destination_id: Option<&str>) -> usize {
        let keys: Vec<String> = match destination_id {
            Some(id) => self
                .entries
                .get(id)
                .map(|entry| entry.key().clone())
                .into_iter()
                .collect(),
            None => self.entries.iter().map(|entry| entry.key().clone()).collect(),
        };

        let count = keys.len();
        for key in keys {
            self.remove_entry(&key, Removal::Invalidated);
        }
        count
    }

    pub fn set_eviction_policy(&self, policy: EvictionPolicy) {
        self.config.write().eviction_policy = policy;
    }

    // Change capacity, evicting down to it if needed
    pub fn resize(&self, max_entries: usize) {
        self.config.write().max_entries = max_entries;
        while max_entries > 0 && self.entries.len() > max_entries {
            if !self.evict_one() {
                break;
            }
        }
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            invalidated_count: self.stats.invalidated_count.load(Ordering::SeqCst),
            average_lookup_time_ns: self.stats.average_lookup_time_ns.load(Ordering::SeqCst),
            total_lookups: self.stats.total_lookups.load(Ordering::SeqCst),
        }
    }

    fn evict_one(&self) -> bool {
        let policy = self.config.read().eviction_policy;

        let victim = match policy {
            EvictionPolicy::LeastRecentlyUsed => self
                .entries
                .iter()
                .min_by_key(|entry| entry.last_accessed)
                .map(|entry| entry.key().clone()),
            EvictionPolicy::LeastFrequentlyUsed => self
                .entries
                .iter()
                .min_by_key(|entry| entry.access_count)
                .map(|entry| entry.key().clone()),
            EvictionPolicy::TimeToLive => self
                .entries
                .iter()
                .min_by_key(|entry| entry.created_at + entry.ttl)
                .map(|entry| entry.key().clone()),
        };

        match victim {
            Some(key) => {
                debug!(destination_id = %key, ?policy, "Evicting availability");
                self.remove_entry(&key, Removal::Evicted);
                true
            }
            None => false,
        }
    }

    fn remove_entry(&self, key: &str, reason: Removal) {
        if self.entries.remove(key).is_some() {
            self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
            let counter = match reason {
                Removal::Evicted => &self.stats.eviction_count,
                Removal::Expired => &self.stats.expired_count,
                Removal::Invalidated => &self.stats.invalidated_count,
            };
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn store_lookup_time(&self, started: Instant) {
        let duration_ns = started.elapsed().as_nanos() as u64;
        let total_lookups = self.stats.total_lookups.load(Ordering::SeqCst) as u64;
        let current_avg = self.stats.average_lookup_time_ns.load(Ordering::SeqCst);

        let new_avg = if total_lookups <= 1 {
            duration_ns
        } else {
            (current_avg * (total_lookups - 1) + duration_ns) / total_lookups
        };

        self.stats
            .average_lookup_time_ns
            .store(new_avg, Ordering::SeqCst);
    }
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability_client::mock_source::MockSource;
    use chrono::NaiveDate;
    use std::thread;

    fn map(slots: i64) -> AvailabilityMap {
        let date = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        AvailabilityMap::from_iter([(date, slots)])
    }

    #[test]
    fn test_store_and_get() {
        let cache = AvailabilityCache::default();
        cache.store("goa", map(5), None);

        let cached = cache.get("goa").unwrap();
        assert_eq!(*cached, map(5));
        assert!(cache.get("manali").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.items_count, 1);
    }

    #[test]
    fn test_expiration_and_ttl() {
        let cache = AvailabilityCache::new(CacheConfig {
            default_ttl_seconds: 5,
            ..CacheConfig::default()
        });

        cache.store("goa", map(5), None);
        cache.store("kerala", map(2), Some(Duration::from_millis(50)));

        assert!(cache.get("goa").is_some());
        assert!(cache.get("kerala").is_some());

        thread::sleep(Duration::from_millis(100));

        assert!(cache.get("goa").is_some());
        assert!(cache.get("kerala").is_none());
        assert_eq!(cache.stats().expired_count, 1);
        assert_eq!(cache.stats().items_count, 1);
    }

    #[test]
    fn test_eviction_policy_lru() {
        let cache = AvailabilityCache::new(CacheConfig {
            max_entries: 3,
            ..CacheConfig::default()
        });

        for id in ["d0", "d1", "d2"] {
            cache.store(id, map(1), None);
            thread::sleep(Duration::from_millis(2));
        }

        // Touch d0 and d2 so d1 is least recently used
        assert!(cache.get("d0").is_some());
        assert!(cache.get("d2").is_some());

        cache.store("d3", map(1), None);

        assert!(cache.get("d1").is_none());
        assert!(cache.get("d0").is_some());
        assert!(cache.get("d2").is_some());
        assert!(cache.get("d3").is_some());
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[test]
    fn test_eviction_policy_lfu() {
        let cache = AvailabilityCache::new(CacheConfig {
            max_entries: 2,
            eviction_policy: EvictionPolicy::LeastFrequentlyUsed,
            ..CacheConfig::default()
        });

        cache.store("popular", map(1), None);
        cache.store("rare", map(1), None);
        for _ in 0..3 {
            cache.get("popular");
        }
        cache.get("rare");

        cache.store("new", map(1), None);
        assert!(cache.get("popular").is_some());
        assert!(cache.get("rare").is_none());
    }

    #[test]
    fn test_replacing_entry_does_not_evict() {
        let cache = AvailabilityCache::new(CacheConfig {
            max_entries: 1,
            ..CacheConfig::default()
        });
        cache.store("goa", map(1), None);
        cache.store("goa", map(9), None);

        assert_eq!(*cache.get("goa").unwrap(), map(9));
        assert_eq!(cache.stats().eviction_count, 0);
        assert_eq!(cache.stats().items_count, 1);
    }

    #[test]
    fn test_invalidate_and_resize() {
        let cache = AvailabilityCache::default();
        for i in 0..10 {
            cache.store(&format!("d{}", i), map(i), None);
        }

        assert_eq!(cache.invalidate(Some("d3")), 1);
        assert_eq!(cache.invalidate(Some("missing")), 0);
        assert!(cache.get("d3").is_none());
        assert_eq!(cache.stats().invalidated_count, 1);
        assert_eq!(cache.stats().eviction_count, 0);

        cache.resize(4);
        assert_eq!(cache.stats().items_count, 4);
        assert_eq!(cache.stats().eviction_count, 5);

        assert_eq!(cache.invalidate(None), 4);
        let stats = cache.stats();
        assert_eq!(stats.items_count, 0);
        assert_eq!(stats.invalidated_count, 5);
        assert_eq!(stats.eviction_count, 5);
    }

    #[test]
    fn test_switching_eviction_policy() {
        let cache = AvailabilityCache::new(CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        });

        cache.store("short", map(1), Some(Duration::from_secs(10)));
        thread::sleep(Duration::from_millis(2));
        cache.store("long", map(1), Some(Duration::from_secs(600)));
        // Most recently used, but closest to expiry
        assert!(cache.get("short").is_some());

        cache.set_eviction_policy(EvictionPolicy::TimeToLive);
        cache.store("new", map(1), None);

        assert!(cache.get("short").is_none());
        assert!(cache.get("long").is_some());
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[tokio::test]
    async fn test_prefetch_and_get_or_fetch() {
        let cache = AvailabilityCache::default();
        let source = MockSource::new(vec![
            Ok(map(3)),
            Err(AvailabilityError::NetworkError("down".to_string())),
            Ok(map(7)),
        ]);

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let stored = cache.prefetch(&source, &ids, None).await;
        assert_eq!(stored, 2);
        assert_eq!(source.requests(), 3);

        // Cached entries do not hit the source again
        let before = source.requests();
        let cached = cache.get_or_fetch(&source, "a").await.unwrap();
        assert!(cached.len() == 1);
        assert_eq!(source.requests(), before);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(AvailabilityCache::new(CacheConfig {
            max_entries: 50,
            ..CacheConfig::default()
        }));

        let mut handles = vec![];
        for t in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..500 {
                    let id = format!("d{}", (t * 7 + j) % 80);
                    match j % 10 {
                        0..=7 => {
                            cache.get(&id);
                        }
                        8 => {
                            cache.store(&id, map(j as i64), None);
                        }
                        _ => {
                            cache.invalidate(Some(&id));
                        }
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert!(stats.items_count <= 50 + 8);
        assert_eq!(stats.total_lookups, 8 * 400);
    }
}
