//! Key-bounded LRU engine
//!
//! Entries live in a slot arena and are linked into a doubly-linked recency
//! list by slot handle (head = most recently used). The key index maps every
//! present key to its slot, so lookup, promotion and eviction are all O(1).

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;

use ahash::RandomState;

use crate::error::{Error, InvariantError, Result};

/// Key as stored by the cache, always below the configured key limit
pub type Key = u32;

/// Default key domain: `0..256`
pub const DEFAULT_KEY_LIMIT: NonZeroU32 = match NonZeroU32::new(256) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// Upper bound on slots allocated up front; larger caches grow on demand
const MAX_PREALLOCATED: usize = 1024;

/// Node in the recency list
struct Node<T> {
    key: Key,
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Which branch a successful `upsert` took
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome<T> {
    /// New key stored without evicting anything
    Inserted,
    /// Existing key had its value replaced
    Updated,
    /// New key stored after evicting the least recently used entry
    Replaced {
        /// Key and value that were evicted
        evicted: (Key, T),
    },
}

/// Fixed-capacity LRU cache over a bounded integer key domain
pub struct KeyedLru<T> {
    index: HashMap<Key, usize, RandomState>,
    nodes: Vec<Option<Node<T>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
    key_limit: NonZeroU32,
}

impl<T> KeyedLru<T> {
    /// Create a cache holding at most `capacity` entries, keys in `0..256`
    ///
    /// # Returns
    /// * `Err(Error::InvalidCapacity)` if `capacity` is zero or negative
    pub fn new(capacity: i64) -> Result<Self> {
        Self::with_key_limit(capacity, DEFAULT_KEY_LIMIT)
    }

    /// Create a cache whose keys must lie in `0..key_limit`
    pub fn with_key_limit(capacity: i64, key_limit: NonZeroU32) -> Result<Self> {
        let capacity = usize::try_from(capacity)
            .ok()
            .filter(|&c| c > 0)
            .ok_or(Error::InvalidCapacity(capacity))?;

        // Never more live entries than distinct keys
        let reserve = capacity
            .min(key_limit.get() as usize)
            .min(MAX_PREALLOCATED);

        Ok(Self {
            index: HashMap::with_capacity_and_hasher(reserve, RandomState::new()),
            nodes: Vec::with_capacity(reserve),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
            key_limit,
        })
    }

    /// Insert or update a key, promoting it to most recently used
    pub fn put(&mut self, key: i64, value: T) -> Result<()> {
        self.upsert(key, value).map(|_| ())
    }

    /// Same as [`put`](Self::put), reporting whether the key was inserted,
    /// updated, or displaced the least recently used entry
    pub fn upsert(&mut self, key: i64, value: T) -> Result<PutOutcome<T>> {
        let key = self.validate_key(key)?;

        if let Some(&idx) = self.index.get(&key) {
            if let Some(node) = &mut self.nodes[idx] {
                node.value = value;
            }
            self.move_to_front(idx);
            return Ok(PutOutcome::Updated);
        }

        let evicted = if self.index.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key,
            value,
            prev: None,
            next: None,
        });
        self.push_front(idx);
        self.index.insert(key, idx);

        Ok(match evicted {
            Some(evicted) => PutOutcome::Replaced { evicted },
            None => PutOutcome::Inserted,
        })
    }

    /// Look up a key and mark it most recently used
    ///
    /// Reads count as uses: a hit moves the entry to the head of the list.
    pub fn get(&mut self, key: i64) -> Result<&T> {
        let key = self.validate_key(key)?;
        let idx = *self.index.get(&key).ok_or(Error::CacheMiss(key))?;

        self.move_to_front(idx);
        self.nodes[idx]
            .as_ref()
            .map(|node| &node.value)
            .ok_or(Error::CacheMiss(key))
    }

    /// Look up a key without touching recency order
    pub fn peek(&self, key: i64) -> Option<&T> {
        let key = self.validate_key(key).ok()?;
        let idx = *self.index.get(&key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Whether the key is currently held
    pub fn contains(&self, key: i64) -> bool {
        self.validate_key(key)
            .map(|key| self.index.contains_key(&key))
            .unwrap_or(false)
    }

    /// Remove a key, returning its value if it was present
    pub fn remove(&mut self, key: i64) -> Result<Option<T>> {
        let key = self.validate_key(key)?;
        Ok(match self.index.get(&key) {
            Some(&idx) => self.remove_slot(idx).map(|(_, value)| value),
            None => None,
        })
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(Key, T)> {
        let idx = self.tail?;
        self.remove_slot(idx)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Exclusive upper bound of the key domain
    pub fn key_limit(&self) -> u32 {
        self.key_limit.get()
    }

    /// Entries from most to least recently used
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            cursor: self.head,
            remaining: self.index.len(),
        }
    }

    /// Snapshot of `(key, value)` pairs in recency order, head first
    pub fn dump_sequence(&self) -> Vec<(Key, T)>
    where
        T: Clone,
    {
        self.iter().map(|(key, value)| (key, value.clone())).collect()
    }

    /// Raw index table as `(key, slot)` pairs, sorted by key
    pub fn dump_index(&self) -> Vec<(Key, usize)> {
        let mut table: Vec<_> = self.index.iter().map(|(&key, &idx)| (key, idx)).collect();
        table.sort_unstable_by_key(|&(key, _)| key);
        table
    }

    /// Walk the recency list and verify it agrees with the key index
    pub fn check_invariants(&self) -> std::result::Result<(), InvariantError> {
        let mut seen = 0usize;
        let mut prev = None;
        let mut cursor = self.head;

        while let Some(idx) = cursor {
            let node = self
                .nodes
                .get(idx)
                .and_then(Option::as_ref)
                .ok_or_else(|| InvariantError::new(format!("slot {} is linked but empty", idx)))?;

            if node.prev != prev {
                return Err(InvariantError::new(format!(
                    "slot {} has prev {:?}, expected {:?}",
                    idx, node.prev, prev
                )));
            }

            match self.index.get(&node.key) {
                Some(&slot) if slot == idx => {}
                other => {
                    return Err(InvariantError::new(format!(
                        "key {} is linked at slot {} but indexed at {:?}",
                        node.key, idx, other
                    )));
                }
            }

            seen += 1;
            if seen > self.index.len() {
                return Err(InvariantError::new(
                    "recency list holds more entries than the index",
                ));
            }

            prev = Some(idx);
            cursor = node.next;
        }

        if self.tail != prev {
            return Err(InvariantError::new(format!(
                "tail is {:?} but the list ends at {:?}",
                self.tail, prev
            )));
        }
        if seen != self.index.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but the list links {}",
                self.index.len(),
                seen
            )));
        }
        if seen > self.capacity {
            return Err(InvariantError::new(format!(
                "{} entries exceed capacity {}",
                seen, self.capacity
            )));
        }
        if let Some(&idx) = self.free_list.iter().find(|&&idx| self.nodes[idx].is_some()) {
            return Err(InvariantError::new(format!("free slot {} still holds an entry", idx)));
        }
        if seen + self.free_list.len() != self.nodes.len() {
            return Err(InvariantError::new("arena slots leaked"));
        }

        Ok(())
    }

    /// Check a caller-supplied key against the domain, returning it as stored
    pub fn validate_key(&self, key: i64) -> Result<Key> {
        let limit = self.key_limit.get();
        match Key::try_from(key) {
            Ok(k) if k < limit => Ok(k),
            _ => Err(Error::KeyOutOfRange { key, limit }),
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return; // Already at front
        }

        self.unlink(idx);
        self.push_front(idx);
    }

    fn push_front(&mut self, idx: usize) {
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn remove_slot(&mut self, idx: usize) -> Option<(Key, T)> {
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.index.remove(&node.key);
        self.free_list.push(idx);
        Some((node.key, node.value))
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for KeyedLru<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over cache entries from most to least recently used
pub struct Iter<'a, T> {
    nodes: &'a [Option<Node<T>>],
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Key, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes[self.cursor?].as_ref()?;
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a KeyedLru<T> {
    type Item = (Key, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
