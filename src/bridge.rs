//! Bridge Module
//!
//! Single entry point that wires both source streams onto one event channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::BridgeConfig;
use crate::dedup::DedupCache;
use crate::e2ee::{E2eeHandler, ProtocolEvent};
use crate::error::Result;
use crate::event_stream::{self, Delivery, EventEmitter, EventReceiver};
use crate::table_diff::{BatchSummary, TableDiff, TableDiffProcessor, ThreadDirectory};
use crate::types::{ErrorEvent, EventPayload, InitialData, PERMANENT_ERROR_CODE, ReadyEvent};

/// Notifications from the table-stream client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Ready {
        is_new_session: bool,
    },
    Reconnected,
    SocketError(String),
    PermanentError(String),
    PublishResponse(Box<TableDiff>),
}

pub struct EventBridge {
    config: BridgeConfig,
    emitter: EventEmitter,
    table_diff: TableDiffProcessor,
    e2ee: E2eeHandler,
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("config", &self.config)
            .field("emitter", &self.emitter)
            .field("threads", &self.table_diff.threads().len())
            .finish()
    }
}

impl EventBridge {
    /// Validates `config` and creates the bridge with the receiving end of
    /// its event channel.
    pub fn new(config: BridgeConfig, clock: Arc<dyn Clock>) -> Result<(Self, EventReceiver)> {
        config.validate()?;

        let (emitter, receiver) = event_stream::channel(config.event_buffer, clock);
        let unreactions = DedupCache::new(config.unreaction_window, config.dedup_retention);
        let table_diff = TableDiffProcessor::new(config.self_id, emitter.clone(), unreactions);
        let e2ee = E2eeHandler::new(emitter.clone());

        tracing::info!(
            target: "bridge_events::bridge::new",
            "Event bridge ready for account {} (buffer {})",
            config.self_id,
            config.event_buffer
        );

        Ok((
            Self {
                config,
                emitter,
                table_diff,
                e2ee,
            },
            receiver,
        ))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handles a table-stream client notification.
    pub fn handle_client_event(&self, event: &ClientEvent) -> BatchSummary {
        let payload = match event {
            ClientEvent::Ready { is_new_session } => EventPayload::Ready(ReadyEvent {
                is_new_session: *is_new_session,
            }),
            ClientEvent::Reconnected => EventPayload::Reconnected,
            ClientEvent::SocketError(message) => {
                tracing::warn!(
                    target: "bridge_events::bridge::handle_client_event",
                    "Socket error: {}",
                    message
                );
                EventPayload::Error(ErrorEvent {
                    message: message.clone(),
                    code: None,
                })
            }
            ClientEvent::PermanentError(message) => {
                tracing::error!(
                    target: "bridge_events::bridge::handle_client_event",
                    "Permanent error: {}",
                    message
                );
                EventPayload::Error(ErrorEvent {
                    message: message.clone(),
                    code: Some(PERMANENT_ERROR_CODE),
                })
            }
            ClientEvent::PublishResponse(table) => return self.handle_table(table),
        };

        let mut summary = BatchSummary::default();
        summary.record(self.emitter.emit(payload));
        summary
    }

    pub fn handle_table(&self, table: &TableDiff) -> BatchSummary {
        self.table_diff.handle_table(table)
    }

    /// Returns `None` when the notification produced no event.
    pub fn handle_protocol_event(&self, event: &ProtocolEvent) -> Option<Delivery> {
        self.e2ee.handle(event)
    }

    pub fn device_data_changed(&self, device_data: &str) -> Delivery {
        self.e2ee.device_data_changed(device_data)
    }

    pub fn thread_directory(&self) -> &ThreadDirectory {
        self.table_diff.threads()
    }

    pub fn initial_data(&self, table: &TableDiff) -> InitialData {
        self.table_diff.initial_data(table)
    }

    /// Events discarded because the consumer fell behind or went away.
    pub fn dropped_count(&self) -> u64 {
        self.emitter.dropped_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::table_diff::types::{DeleteReactionRow, MessageRow};
    use crate::types::EventType;

    fn bridge(buffer: usize) -> (EventBridge, EventReceiver, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let config = BridgeConfig {
            event_buffer: buffer,
            ..BridgeConfig::new(555)
        };
        let (bridge, rx) = EventBridge::new(config, clock.clone()).unwrap();
        (bridge, rx, clock)
    }

    #[tokio::test]
    async fn test_client_lifecycle_events() {
        let (bridge, mut rx, _clock) = bridge(16);

        bridge.handle_client_event(&ClientEvent::Ready {
            is_new_session: true,
        });
        bridge.handle_client_event(&ClientEvent::Reconnected);
        bridge.handle_client_event(&ClientEvent::SocketError("reset by peer".to_string()));
        bridge.handle_client_event(&ClientEvent::PermanentError("logged out".to_string()));

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events[0].payload,
            EventPayload::Ready(ReadyEvent {
                is_new_session: true
            })
        );
        assert_eq!(events[1].event_type(), EventType::Reconnected);
        assert_eq!(
            events[2].payload,
            EventPayload::Error(ErrorEvent {
                message: "reset by peer".to_string(),
                code: None
            })
        );
        assert_eq!(
            events[3].payload,
            EventPayload::Error(ErrorEvent {
                message: "logged out".to_string(),
                code: Some(PERMANENT_ERROR_CODE)
            })
        );
    }

    #[tokio::test]
    async fn test_publish_response_runs_table_processor() {
        let (bridge, mut rx, _clock) = bridge(16);
        let table = TableDiff {
            insert_message: vec![MessageRow {
                message_id: "mid.1".to_string(),
                thread_key: 8,
                text: "hi".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let summary = bridge.handle_client_event(&ClientEvent::PublishResponse(Box::new(table)));

        assert_eq!(summary.emitted, 1);
        assert_eq!(rx.try_recv().unwrap().event_type(), EventType::Message);
        assert!(bridge.thread_directory().get(8).is_some());
    }

    #[tokio::test]
    async fn test_both_streams_share_one_channel() {
        let (bridge, mut rx, _clock) = bridge(16);

        bridge.handle_protocol_event(&ProtocolEvent::Connected);
        bridge.handle_client_event(&ClientEvent::Reconnected);
        bridge.device_data_changed("blob");

        let types: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            types,
            vec![
                EventType::E2eeConnected,
                EventType::Reconnected,
                EventType::DeviceDataChanged
            ]
        );
    }

    #[tokio::test]
    async fn test_dropped_events_are_counted() {
        let (bridge, _rx, _clock) = bridge(1);

        bridge.handle_client_event(&ClientEvent::Reconnected);
        let summary = bridge.handle_client_event(&ClientEvent::Reconnected);

        assert_eq!(summary.dropped, 1);
        assert_eq!(bridge.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_configured_window_applies_to_unreactions() {
        let clock = Arc::new(ManualClock::new(0));
        let config = BridgeConfig {
            unreaction_window: std::time::Duration::from_millis(50),
            ..BridgeConfig::new(1)
        };
        let (bridge, mut rx) = EventBridge::new(config, clock.clone()).unwrap();
        let table = TableDiff {
            delete_reaction: vec![DeleteReactionRow {
                thread_key: 1,
                message_id: "m".to_string(),
                actor_id: 2,
            }],
            ..Default::default()
        };

        bridge.handle_table(&table);
        clock.advance_ms(100);
        bridge.handle_table(&table);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = BridgeConfig {
            event_buffer: 0,
            ..BridgeConfig::default()
        };
        let result = EventBridge::new(config, Arc::new(ManualClock::new(0)));
        assert!(matches!(
            result,
            Err(crate::error::BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_client_event_json_shape() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"ready","data":{"isNewSession":false}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Ready {
                is_new_session: false
            }
        );

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"permanentError","data":"banned"}"#).unwrap();
        assert_eq!(event, ClientEvent::PermanentError("banned".to_string()));
    }
}
