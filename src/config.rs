use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BridgeError, Result};

pub const DEFAULT_EVENT_BUFFER: usize = 1000;
pub const DEFAULT_UNREACTION_WINDOW: Duration = Duration::from_millis(500);
pub const DEFAULT_DEDUP_RETENTION: Duration = Duration::from_millis(5000);

const ENV_SELF_ID: &str = "BRIDGE_SELF_ID";
const ENV_EVENT_BUFFER: &str = "BRIDGE_EVENT_BUFFER";
const ENV_UNREACTION_WINDOW_MS: &str = "BRIDGE_UNREACTION_WINDOW_MS";
const ENV_DEDUP_RETENTION_MS: &str = "BRIDGE_DEDUP_RETENTION_MS";
const ENV_LOGS_DIR: &str = "BRIDGE_LOGS_DIR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Account id of the logged-in user, used as reader for self-read markers
    pub self_id: i64,

    /// Capacity of the outbound event channel
    pub event_buffer: usize,

    /// Repeated un-reactions for the same message and actor inside this window are dropped
    pub unreaction_window: Duration,

    /// How long un-reaction entries are remembered before being swept
    pub dedup_retention: Duration,

    /// Directory for rolling log files, if the bridge should install logging
    pub logs_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            self_id: 0,
            event_buffer: DEFAULT_EVENT_BUFFER,
            unreaction_window: DEFAULT_UNREACTION_WINDOW,
            dedup_retention: DEFAULT_DEDUP_RETENTION,
            logs_dir: None,
        }
    }
}

impl BridgeConfig {
    pub fn new(self_id: i64) -> Self {
        Self {
            self_id,
            ..Default::default()
        }
    }

    /// Loads configuration from the process environment, reading a `.env`
    /// file first when one exists. Unset keys keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_SELF_ID) {
            config.self_id = parse_value(ENV_SELF_ID, &value)?;
        }
        if let Some(value) = lookup(ENV_EVENT_BUFFER) {
            config.event_buffer = parse_value(ENV_EVENT_BUFFER, &value)?;
        }
        if let Some(value) = lookup(ENV_UNREACTION_WINDOW_MS) {
            config.unreaction_window =
                Duration::from_millis(parse_value(ENV_UNREACTION_WINDOW_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_DEDUP_RETENTION_MS) {
            config.dedup_retention =
                Duration::from_millis(parse_value(ENV_DEDUP_RETENTION_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_LOGS_DIR) {
            if !value.trim().is_empty() {
                config.logs_dir = Some(PathBuf::from(value));
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_buffer == 0 {
            return Err(BridgeError::Configuration(
                "event buffer must hold at least one event".to_string(),
            ));
        }
        if self.unreaction_window > self.dedup_retention {
            return Err(BridgeError::Configuration(format!(
                "un-reaction window ({:?}) exceeds dedup retention ({:?})",
                self.unreaction_window, self.dedup_retention
            )));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BridgeError::Configuration(format!("invalid value for {}: {:?}", key, value)))
}
