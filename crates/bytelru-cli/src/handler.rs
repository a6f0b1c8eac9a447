//! Executes script commands against a shared cache

use bytelru::{SharedCache, StatsSnapshot};
use serde::Serialize;
use std::fmt;

use crate::script::Command;

/// One `(key, value)` pair from the recency list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub key: u32,
    pub value: String,
}

/// One row of the raw key index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub key: u32,
    pub slot: usize,
}

/// Result of a single command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Ok,
    Value { value: String },
    Removed { value: Option<String> },
    Popped { entry: Option<Entry> },
    Entries { entries: Vec<Entry> },
    Index { slots: Vec<Slot> },
    Stats { stats: StatsSnapshot },
    Error { message: String },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("OK"),
            Reply::Value { value } => f.write_str(value),
            Reply::Removed { value: Some(value) } => write!(f, "removed {}", value),
            Reply::Removed { value: None } => f.write_str("(not present)"),
            Reply::Popped { entry: Some(entry) } => {
                write!(f, "popped key {} value {}", entry.key, entry.value)
            }
            Reply::Popped { entry: None } => f.write_str("(empty)"),
            Reply::Entries { entries } if entries.is_empty() => f.write_str("(empty)"),
            Reply::Entries { entries } => {
                let lines: Vec<String> = entries
                    .iter()
                    .map(|e| format!("key {} value {}", e.key, e.value))
                    .collect();
                f.write_str(&lines.join("\n"))
            }
            Reply::Index { slots } if slots.is_empty() => f.write_str("(empty)"),
            Reply::Index { slots } => {
                let lines: Vec<String> = slots
                    .iter()
                    .map(|s| format!("key {} slot {}", s.key, s.slot))
                    .collect();
                f.write_str(&lines.join("\n"))
            }
            Reply::Stats { stats } => write!(
                f,
                "hits {} misses {} inserts {} updates {} evictions {} rejections {} hit_ratio {:.2}",
                stats.hits,
                stats.misses,
                stats.inserts,
                stats.updates,
                stats.evictions,
                stats.rejections,
                stats.hit_ratio
            ),
            Reply::Error { message } => write!(f, "ERR {}", message),
        }
    }
}

pub struct CommandHandler {
    cache: SharedCache<String>,
}

impl CommandHandler {
    pub fn new(cache: SharedCache<String>) -> Self {
        Self { cache }
    }

    pub fn handle(&self, cmd: &Command) -> Reply {
        match cmd {
            Command::Put { key, value } => match self.cache.put(*key, value.clone()) {
                Ok(()) => Reply::Ok,
                Err(e) => error(e),
            },
            Command::Get { key } => match self.cache.get(*key) {
                Ok(value) => Reply::Value { value },
                Err(e) => error(e),
            },
            Command::Remove { key } => match self.cache.remove(*key) {
                Ok(value) => Reply::Removed { value },
                Err(e) => error(e),
            },
            Command::Pop => Reply::Popped {
                entry: self.cache.pop_lru().map(|(key, value)| Entry { key, value }),
            },
            Command::Clear => {
                self.cache.clear();
                Reply::Ok
            }
            Command::Dump => Reply::Entries {
                entries: self
                    .cache
                    .dump_sequence()
                    .into_iter()
                    .map(|(key, value)| Entry { key, value })
                    .collect(),
            },
            Command::Keys => Reply::Index {
                slots: self
                    .cache
                    .dump_index()
                    .into_iter()
                    .map(|(key, slot)| Slot { key, slot })
                    .collect(),
            },
            Command::Stats => Reply::Stats {
                stats: self.cache.stats().snapshot(),
            },
        }
    }
}

fn error(err: bytelru::Error) -> Reply {
    Reply::Error {
        message: err.to_string(),
    }
}
