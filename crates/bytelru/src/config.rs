//! Construction parameters

use std::num::NonZeroU32;

use crate::error::Result;
use crate::lru::{KeyedLru, DEFAULT_KEY_LIMIT};

/// Capacity and key domain for a cache
///
/// Capacity is validated when the cache is built, not here, so a config can
/// carry whatever the caller parsed and report `InvalidCapacity` at `build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub capacity: i64,
    /// Keys must be below this bound
    pub key_limit: NonZeroU32,
}

impl CacheConfig {
    /// Config with the default `0..256` key domain
    pub fn new(capacity: i64) -> Self {
        Self {
            capacity,
            key_limit: DEFAULT_KEY_LIMIT,
        }
    }

    /// Override the key domain
    pub fn key_limit(mut self, key_limit: NonZeroU32) -> Self {
        self.key_limit = key_limit;
        self
    }

    /// Validate and construct an empty cache
    pub fn build<T>(&self) -> Result<KeyedLru<T>> {
        KeyedLru::with_key_limit(self.capacity, self.key_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::new(8);
        assert_eq!(config.key_limit.get(), 256);

        let cache = config.build::<String>().unwrap();
        assert_eq!(cache.capacity(), 8);
        assert_eq!(cache.key_limit(), 256);
    }

    #[test]
    fn test_config_key_limit() {
        let cache = CacheConfig::new(2)
            .key_limit(NonZeroU32::new(1024).unwrap())
            .build::<u8>()
            .unwrap();
        assert_eq!(cache.key_limit(), 1024);
    }

    #[test]
    fn test_config_rejects_capacity() {
        let err = CacheConfig::new(-1).build::<u8>().unwrap_err();
        assert_eq!(err, Error::InvalidCapacity(-1));
    }
}
