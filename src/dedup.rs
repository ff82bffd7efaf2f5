//! Time-windowed suppression of redelivered un-reactions.
//!
//! Entries are swept inline on every write, so memory stays bounded by the
//! distinct message/actor pairs seen within the retention horizon.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::config::{DEFAULT_DEDUP_RETENTION, DEFAULT_UNREACTION_WINDOW};

/// Natural identity of an un-reaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub message_id: String,
    pub actor_id: i64,
}

impl DedupKey {
    pub fn new(message_id: impl Into<String>, actor_id: i64) -> Self {
        Self {
            message_id: message_id.into(),
            actor_id,
        }
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.message_id, self.actor_id)
    }
}

#[derive(Debug)]
pub struct DedupCache {
    window_ms: i64,
    retention_ms: i64,
    last_seen: RwLock<HashMap<DedupKey, i64>>,
}

impl DedupCache {
    pub fn new(window: Duration, retention: Duration) -> Self {
        Self {
            window_ms: duration_ms(window),
            retention_ms: duration_ms(retention),
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `true` when `key` was recorded less than one window before
    /// `now_ms`. Otherwise records `now_ms` for the key, sweeps entries older
    /// than the retention horizon, and returns `false`.
    pub fn should_suppress(&self, key: &DedupKey, now_ms: i64) -> bool {
        {
            let last_seen = self.last_seen.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&seen_at) = last_seen.get(key) {
                if now_ms - seen_at < self.window_ms {
                    return true;
                }
            }
        }

        let mut last_seen = self
            .last_seen
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another writer may have recorded the key since the read
        if let Some(&seen_at) = last_seen.get(key) {
            if now_ms - seen_at < self.window_ms {
                return true;
            }
        }
        last_seen.insert(key.clone(), now_ms);
        let retention_ms = self.retention_ms;
        last_seen.retain(|_, seen_at| now_ms - *seen_at <= retention_ms);
        false
    }

    pub fn len(&self) -> usize {
        self.last_seen
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_UNREACTION_WINDOW, DEFAULT_DEDUP_RETENTION)
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
