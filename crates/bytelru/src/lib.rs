//! # bytelru
//!
//! Fixed-capacity LRU cache over a bounded integer key domain (`0..256` by
//! default).
//!
//! ## Architecture
//! - **Key index**: AHash map from key to arena slot (O(1))
//! - **Recency list**: Doubly-linked list of arena slots, MRU at the head (O(1))
//! - **SharedCache**: One `parking_lot` lock over both, plus stats and events
//!
//! ```
//! use bytelru::{Error, KeyedLru};
//!
//! let mut cache = KeyedLru::new(2)?;
//! cache.put(1, "foo")?;
//! cache.put(2, "bar")?;
//!
//! assert_eq!(cache.get(1)?, &"foo");
//! assert_eq!(cache.get(5), Err(Error::CacheMiss(5)));
//! # Ok::<(), Error>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod lru;
mod observer;
mod stats;

pub use cache::SharedCache;
pub use config::CacheConfig;
pub use error::{Error, InvariantError, Result};
pub use lru::{Iter, Key, KeyedLru, PutOutcome, DEFAULT_KEY_LIMIT};
pub use observer::{CacheEvent, CacheObserver, NoopObserver, RecordingObserver, TracingObserver};
pub use stats::{CacheStats, StatsSnapshot};
