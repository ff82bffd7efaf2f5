//! Event normalization for a messaging bridge.
//!
//! Two source streams, a batched table-diff stream and an end-to-end encrypted
//! protocol stream, are translated into one ordered stream of canonical
//! [`Event`]s delivered over a bounded, non-blocking channel.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt::Layer, prelude::*, registry::Registry};

pub mod attachments;
pub mod bridge;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod e2ee;
pub mod error;
pub mod event_stream;
pub mod mentions;
pub mod table_diff;
pub mod types;

pub use crate::bridge::{ClientEvent, EventBridge};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::BridgeConfig;
pub use crate::e2ee::ProtocolEvent;
pub use crate::error::{BridgeError, Result};
pub use crate::event_stream::{Delivery, EventReceiver};
pub use crate::mentions::parse_mentions;
pub use crate::table_diff::{BatchSummary, TableDiff};
pub use crate::types::{Event, EventPayload, EventType};

static TRACING_GUARDS: OnceLock<Mutex<Option<(WorkerGuard, WorkerGuard)>>> = OnceLock::new();
static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the process-wide subscriber: stdout plus a daily rolling file in
/// `logs_dir`, filtered by `RUST_LOG` (default `info`).
///
/// Only the first call has an effect.
pub fn init_tracing(logs_dir: &Path) -> Result<()> {
    if TRACING_INIT.get().is_some() {
        return Ok(());
    }

    std::fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("bridge-events")
        .filename_suffix("log")
        .build(logs_dir)
        .map_err(|e| BridgeError::LoggingSetup(e.to_string()))?;

    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = Layer::new()
        .with_writer(non_blocking_stdout)
        .with_ansi(true)
        .with_target(true);

    let file_layer = Layer::new()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BridgeError::LoggingSetup(e.to_string()))?;

    TRACING_GUARDS
        .set(Mutex::new(Some((file_guard, stdout_guard))))
        .ok();
    TRACING_INIT.set(()).ok();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_creates_rolling_log() {
        let temp = tempfile::TempDir::new().unwrap();
        let logs_dir = temp.path().join("logs");

        init_tracing(&logs_dir).unwrap();
        assert!(logs_dir.is_dir());

        // Second call is a no-op
        assert!(init_tracing(&logs_dir).is_ok());
    }
}
