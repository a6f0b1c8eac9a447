//! SharedCache: thread-safe wrapper around `KeyedLru`

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::lru::{Key, KeyedLru, PutOutcome};
use crate::observer::{CacheEvent, CacheObserver, TracingObserver};
use crate::stats::CacheStats;

/// `KeyedLru` behind a single lock, with statistics and event reporting
///
/// The index and the recency list are always mutated under the same write
/// lock. `get` takes the write lock too, since a hit reorders the list.
/// Clones share the same underlying cache.
pub struct SharedCache<T> {
    /// Recency engine
    cache: Arc<RwLock<KeyedLru<T>>>,

    /// Cache statistics
    stats: Arc<CacheStats>,

    /// Receives an event for every operation
    observer: Arc<dyn CacheObserver>,

    /// Cache capacity
    capacity: usize,
}

impl<T> Clone for SharedCache<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            stats: Arc::clone(&self.stats),
            observer: Arc::clone(&self.observer),
            capacity: self.capacity,
        }
    }
}

impl<T> SharedCache<T> {
    /// Create a cache with the default key domain that logs through `tracing`
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of items in cache
    ///
    /// # Returns
    /// * `Result<SharedCache<T>>` - `Err(InvalidCapacity)` if `capacity <= 0`
    pub fn new(capacity: i64) -> Result<Self> {
        Self::from_config(&CacheConfig::new(capacity))
    }

    /// Create a cache from an explicit config
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Create a cache that reports to the given observer
    pub fn with_observer(config: &CacheConfig, observer: Arc<dyn CacheObserver>) -> Result<Self> {
        let lru = config.build()?;
        let capacity = lru.capacity();

        Ok(Self {
            cache: Arc::new(RwLock::new(lru)),
            stats: Arc::new(CacheStats::new()),
            observer,
            capacity,
        })
    }

    /// Insert or update a key
    pub fn put(&self, key: i64, value: T) -> Result<()> {
        let result = {
            let mut cache = self.cache.write();
            match cache.validate_key(key) {
                Ok(stored) => cache.upsert(key, value).map(|outcome| (stored, outcome)),
                Err(err) => Err(err),
            }
        };

        match &result {
            Ok((stored, PutOutcome::Inserted)) => {
                self.stats.record_insert();
                self.notify(CacheEvent::Inserted { key: *stored });
            }
            Ok((stored, PutOutcome::Updated)) => {
                self.stats.record_update();
                self.notify(CacheEvent::Updated { key: *stored });
            }
            Ok((stored, PutOutcome::Replaced { evicted: (evicted, _) })) => {
                self.stats.record_eviction();
                self.stats.record_insert();
                self.notify(CacheEvent::Evicted {
                    key: *evicted,
                    replaced_by: *stored,
                });
                self.notify(CacheEvent::Inserted { key: *stored });
            }
            Err(err) => self.record_error(err),
        }

        result.map(|_| ())
    }

    /// Get a copy of a value, marking it most recently used
    pub fn get(&self, key: i64) -> Result<T>
    where
        T: Clone,
    {
        let result = {
            let mut cache = self.cache.write();
            match cache.validate_key(key) {
                Ok(stored) => cache.get(key).cloned().map(|value| (stored, value)),
                Err(err) => Err(err),
            }
        };

        match &result {
            Ok((stored, _)) => {
                self.stats.record_hit();
                self.notify(CacheEvent::Hit { key: *stored });
            }
            Err(err) => self.record_error(err),
        }

        result.map(|(_, value)| value)
    }

    /// Remove a key, returning its value if it was present
    pub fn remove(&self, key: i64) -> Result<Option<T>> {
        let result = {
            let mut cache = self.cache.write();
            match cache.validate_key(key) {
                Ok(stored) => cache.remove(key).map(|value| (stored, value)),
                Err(err) => Err(err),
            }
        };

        match &result {
            Ok((stored, Some(_))) => self.notify(CacheEvent::Removed { key: *stored }),
            Ok((_, None)) => {}
            Err(err) => self.record_error(err),
        }

        result.map(|(_, value)| value)
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&self) -> Option<(Key, T)> {
        let popped = self.cache.write().pop_lru();

        if let Some((key, _)) = &popped {
            self.notify(CacheEvent::Removed { key: *key });
        }

        popped
    }

    /// Drop every entry (statistics are kept)
    pub fn clear(&self) {
        let dropped = {
            let mut cache = self.cache.write();
            let dropped = cache.len();
            cache.clear();
            dropped
        };

        self.notify(CacheEvent::Cleared { dropped });
    }

    /// Snapshot of `(key, value)` pairs, most recently used first
    pub fn dump_sequence(&self) -> Vec<(Key, T)>
    where
        T: Clone,
    {
        self.cache.read().dump_sequence()
    }

    /// Raw `(key, slot)` index table, sorted by key
    pub fn dump_index(&self) -> Vec<(Key, usize)> {
        self.cache.read().dump_index()
    }

    /// Whether the key is currently held (does not affect recency)
    pub fn contains(&self, key: i64) -> bool {
        self.cache.read().contains(key)
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get current cache size
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the exclusive key bound
    pub fn key_limit(&self) -> u32 {
        self.cache.read().key_limit()
    }

    fn record_error(&self, err: &Error) {
        match *err {
            Error::CacheMiss(key) => {
                self.stats.record_miss();
                self.notify(CacheEvent::Miss { key });
            }
            Error::KeyOutOfRange { key, .. } => {
                self.stats.record_rejection();
                self.notify(CacheEvent::Rejected { key });
            }
            Error::InvalidCapacity(_) => {}
        }
    }

    fn notify(&self, event: CacheEvent) {
        self.observer.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{NoopObserver, RecordingObserver};
    use std::thread;

    fn recorded(capacity: i64) -> (SharedCache<String>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        let cache =
            SharedCache::with_observer(&CacheConfig::new(capacity), observer.clone()).unwrap();
        (cache, observer)
    }

    #[test]
    fn test_cache_basic() {
        let cache = SharedCache::new(2).unwrap();

        cache.put(1, "foo".to_string()).unwrap();
        cache.put(2, "bar".to_string()).unwrap();

        assert_eq!(cache.get(1).unwrap(), "foo");
        assert_eq!(cache.get(5), Err(Error::CacheMiss(5)));
        assert_eq!(
            cache.dump_sequence(),
            vec![(1, "foo".to_string()), (2, "bar".to_string())]
        );
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn test_cache_invalid_capacity() {
        assert!(matches!(
            SharedCache::<String>::new(0),
            Err(Error::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_cache_eviction_events() {
        let (cache, observer) = recorded(2);

        cache.put(1, "a".to_string()).unwrap();
        cache.put(2, "b".to_string()).unwrap();
        cache.put(2, "bb".to_string()).unwrap();
        cache.put(3, "c".to_string()).unwrap();

        assert_eq!(
            observer.events(),
            vec![
                CacheEvent::Inserted { key: 1 },
                CacheEvent::Inserted { key: 2 },
                CacheEvent::Updated { key: 2 },
                CacheEvent::Evicted {
                    key: 1,
                    replaced_by: 3
                },
                CacheEvent::Inserted { key: 3 },
            ]
        );
        assert_eq!(cache.stats().evictions(), 1);
        assert_eq!(cache.stats().inserts(), 3);
        assert_eq!(cache.stats().updates(), 1);
    }

    #[test]
    fn test_cache_rejects_and_misses() {
        let (cache, observer) = recorded(2);

        assert!(cache.put(256, "x".to_string()).is_err());
        assert!(cache.get(-4).is_err());
        assert!(cache.get(7).is_err());

        assert_eq!(
            observer.events(),
            vec![
                CacheEvent::Rejected { key: 256 },
                CacheEvent::Rejected { key: -4 },
                CacheEvent::Miss { key: 7 },
            ]
        );
        assert_eq!(cache.stats().rejections(), 2);
        assert_eq!(cache.stats().misses(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_events_carry_wide_keys() {
        let observer = Arc::new(RecordingObserver::new());
        let config = CacheConfig::new(1).key_limit(std::num::NonZeroU32::MAX);
        let cache = SharedCache::with_observer(&config, observer.clone()).unwrap();
        let top = i64::from(u32::MAX) - 1;
        let past = i64::from(u32::MAX) + 5;

        cache.put(top, "hi".to_string()).unwrap();
        assert_eq!(cache.get(top).unwrap(), "hi");
        assert!(cache.put(past, "no".to_string()).is_err());
        assert_eq!(cache.remove(top), Ok(Some("hi".to_string())));

        assert_eq!(
            observer.events(),
            vec![
                CacheEvent::Inserted { key: u32::MAX - 1 },
                CacheEvent::Hit { key: u32::MAX - 1 },
                CacheEvent::Rejected { key: past },
                CacheEvent::Removed { key: u32::MAX - 1 },
            ]
        );
    }

    #[test]
    fn test_cache_with_noop_observer() {
        let cache: SharedCache<u8> =
            SharedCache::with_observer(&CacheConfig::new(1), Arc::new(NoopObserver)).unwrap();

        cache.put(1, 1).unwrap();
        cache.put(2, 2).unwrap();

        assert_eq!(cache.dump_sequence(), vec![(2, 2)]);
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let (cache, observer) = recorded(4);

        cache.put(1, "a".to_string()).unwrap();
        cache.put(2, "b".to_string()).unwrap();
        cache.clear();
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.dump_index().is_empty());
        assert_eq!(cache.get(1), Err(Error::CacheMiss(1)));
        assert!(observer
            .events()
            .contains(&CacheEvent::Cleared { dropped: 2 }));
        assert!(observer
            .events()
            .contains(&CacheEvent::Cleared { dropped: 0 }));
    }

    #[test]
    fn test_cache_remove_and_pop() {
        let cache = SharedCache::new(3).unwrap();

        cache.put(1, 1.5f32).unwrap();
        cache.put(2, 2.5f32).unwrap();
        cache.put(3, 3.5f32).unwrap();

        assert_eq!(cache.remove(2), Ok(Some(2.5)));
        assert_eq!(cache.pop_lru(), Some((1, 1.5)));
        assert!(cache.contains(3));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let cache = SharedCache::<u64>::new(16).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..200i64 {
                        let key = (t * 64 + i) % 256;
                        cache.put(key, i as u64).unwrap();
                        let _ = cache.get((key + 1) % 256);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 16);
        assert_eq!(cache.dump_index().len(), 16);
        assert_eq!(cache.stats().inserts(), cache.stats().evictions() + 16);
    }
}
