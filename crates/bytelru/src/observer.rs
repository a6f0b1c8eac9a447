//! Hooks for watching cache activity from outside the engine
//!
//! The engine itself never logs. [`SharedCache`](crate::SharedCache) reports
//! each operation to a [`CacheObserver`] once its lock has been released.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::lru::Key;

/// Something that happened to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// New key stored
    Inserted {
        /// Key stored
        key: Key,
    },
    /// Existing key overwritten and promoted
    Updated {
        /// Key overwritten
        key: Key,
    },
    /// Least recently used entry dropped to make room
    Evicted {
        /// Key that was dropped
        key: Key,
        /// Key whose insertion forced the eviction
        replaced_by: Key,
    },
    /// Lookup found the key
    Hit {
        /// Key read
        key: Key,
    },
    /// Lookup did not find the key
    Miss {
        /// Key read
        key: Key,
    },
    /// Key outside the configured domain
    Rejected {
        /// Key as supplied by the caller
        key: i64,
    },
    /// Key removed explicitly
    Removed {
        /// Key removed
        key: Key,
    },
    /// Cache emptied
    Cleared {
        /// Number of entries dropped
        dropped: usize,
    },
}

/// Receives cache events
pub trait CacheObserver: Send + Sync {
    /// Called once per event, outside the cache lock
    fn on_event(&self, event: &CacheEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {
    fn on_event(&self, _event: &CacheEvent) {}
}

/// Logs events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_event(&self, event: &CacheEvent) {
        match *event {
            CacheEvent::Inserted { key } => debug!(key, "inserted new entry"),
            CacheEvent::Updated { key } => debug!(key, "updated existing entry"),
            CacheEvent::Evicted { key, replaced_by } => {
                info!(key, replaced_by, "evicted least recently used entry")
            }
            CacheEvent::Hit { key } => debug!(key, "cache hit"),
            CacheEvent::Miss { key } => debug!(key, "cache miss"),
            CacheEvent::Rejected { key } => warn!(key, "key out of range"),
            CacheEvent::Removed { key } => debug!(key, "removed entry"),
            CacheEvent::Cleared { dropped } => info!(dropped, "cache cleared"),
        }
    }
}

/// Keeps every event in memory, mostly useful in tests
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far, oldest first
    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.lock().clone()
    }
}

impl CacheObserver for RecordingObserver {
    fn on_event(&self, event: &CacheEvent) {
        self.events.lock().push(*event);
    }
}
