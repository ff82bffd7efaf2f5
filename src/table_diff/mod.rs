//! Table-Diff Module
//!
//! Normalizes batches of the row-oriented table stream into canonical events.
//! Real-time inserts become `message` events; backfill upserts only update the
//! thread directory. Un-reactions pass through a time-windowed dedup cache
//! because the source redelivers them.

mod processor;
mod thread_directory;
pub mod types;


pub use processor::{BatchSummary, convert_simple_message, convert_wrapped_message};
pub use thread_directory::ThreadDirectory;
pub use types::{TableDiff, WrappedMessage};

use crate::dedup::DedupCache;
use crate::event_stream::EventEmitter;

/// Translates table batches into events on the shared emitter.
///
/// Holds the un-reaction dedup cache and the thread directory for the
/// lifetime of the process.
#[derive(Debug)]
pub struct TableDiffProcessor {
    self_id: i64,
    emitter: EventEmitter,
    unreactions: DedupCache,
    threads: ThreadDirectory,
}

impl TableDiffProcessor {
    /// `self_id` is the local account, reported as reader of self-read markers.
    pub fn new(self_id: i64, emitter: EventEmitter, unreactions: DedupCache) -> Self {
        Self {
            self_id,
            emitter,
            unreactions,
            threads: ThreadDirectory::new(),
        }
    }

    pub fn self_id(&self) -> i64 {
        self.self_id
    }

    pub fn threads(&self) -> &ThreadDirectory {
        &self.threads
    }
}
