//! In-memory thread metadata fed by every batch, backfill included.

use dashmap::DashMap;

use super::types::{MessageRow, ThreadRow};
use crate::types::{Thread, ThreadType, UNKNOWN_THREAD_ID};

#[derive(Debug, Default)]
pub struct ThreadDirectory {
    threads: DashMap<i64, Thread>,
}

impl ThreadDirectory {
    pub fn new() -> Self {
        Self {
            threads: DashMap::new(),
        }
    }

    /// Applies a thread row. Last activity never moves backwards.
    pub fn apply_thread_row(&self, row: &ThreadRow) {
        if row.thread_key == UNKNOWN_THREAD_ID {
            return;
        }
        self.threads
            .entry(row.thread_key)
            .and_modify(|thread| {
                thread.thread_type = ThreadType::from(row.thread_type);
                if !row.thread_name.is_empty() {
                    thread.name = row.thread_name.clone();
                }
                if row.last_activity_timestamp_ms >= thread.last_activity_timestamp_ms {
                    thread.last_activity_timestamp_ms = row.last_activity_timestamp_ms;
                    thread.snippet = row.snippet.clone();
                }
            })
            .or_insert_with(|| Thread {
                id: row.thread_key,
                thread_type: ThreadType::from(row.thread_type),
                name: row.thread_name.clone(),
                last_activity_timestamp_ms: row.last_activity_timestamp_ms,
                snippet: row.snippet.clone(),
            });
    }

    /// Bumps the thread's activity and snippet from a message row.
    pub fn observe_message(&self, row: &MessageRow) {
        if row.thread_key == UNKNOWN_THREAD_ID {
            return;
        }
        self.threads
            .entry(row.thread_key)
            .and_modify(|thread| {
                if row.timestamp_ms >= thread.last_activity_timestamp_ms {
                    thread.last_activity_timestamp_ms = row.timestamp_ms;
                    thread.snippet = row.text.clone();
                }
            })
            .or_insert_with(|| Thread {
                id: row.thread_key,
                thread_type: ThreadType::Other(0),
                name: String::new(),
                last_activity_timestamp_ms: row.timestamp_ms,
                snippet: row.text.clone(),
            });
    }

    pub fn get(&self, thread_id: i64) -> Option<Thread> {
        self.threads.get(&thread_id).map(|entry| entry.value().clone())
    }

    /// All known threads, most recently active first.
    pub fn snapshot(&self) -> Vec<Thread> {
        let mut threads: Vec<Thread> = self
            .threads
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        threads.sort_by(|a, b| {
            b.last_activity_timestamp_ms
                .cmp(&a.last_activity_timestamp_ms)
                .then(a.id.cmp(&b.id))
        });
        threads
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_row(key: i64, name: &str, activity: i64) -> ThreadRow {
        ThreadRow {
            thread_key: key,
            thread_type: 2,
            thread_name: name.to_string(),
            last_activity_timestamp_ms: activity,
            snippet: format!("snippet {}", activity),
        }
    }

    fn message_row(key: i64, text: &str, ts: i64) -> MessageRow {
        MessageRow {
            message_id: format!("mid.{}", ts),
            thread_key: key,
            text: text.to_string(),
            timestamp_ms: ts,
            ..Default::default()
        }
    }

    #[test]
    fn thread_rows_create_and_update() {
        let directory = ThreadDirectory::new();
        directory.apply_thread_row(&thread_row(1, "Book club", 100));
        directory.apply_thread_row(&thread_row(1, "", 200));

        let thread = directory.get(1).unwrap();
        assert_eq!(thread.thread_type, ThreadType::Group);
        assert_eq!(thread.name, "Book club");
        assert_eq!(thread.last_activity_timestamp_ms, 200);
        assert_eq!(thread.snippet, "snippet 200");
    }

    #[test]
    fn activity_never_moves_backwards() {
        let directory = ThreadDirectory::new();
        directory.observe_message(&message_row(5, "newer", 500));
        directory.observe_message(&message_row(5, "older", 100));

        let thread = directory.get(5).unwrap();
        assert_eq!(thread.last_activity_timestamp_ms, 500);
        assert_eq!(thread.snippet, "newer");
        assert_eq!(thread.thread_type, ThreadType::Other(0));
    }

    #[test]
    fn unknown_thread_is_ignored() {
        let directory = ThreadDirectory::new();
        directory.observe_message(&message_row(UNKNOWN_THREAD_ID, "x", 1));
        assert!(directory.is_empty());
    }

    #[test]
    fn snapshot_orders_by_recent_activity() {
        let directory = ThreadDirectory::new();
        directory.apply_thread_row(&thread_row(1, "a", 100));
        directory.apply_thread_row(&thread_row(2, "b", 300));
        directory.observe_message(&message_row(3, "c", 200));

        let ids: Vec<i64> = directory.snapshot().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(directory.len(), 3);
    }
}
