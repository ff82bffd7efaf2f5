//! E2EE Module
//!
//! Turns notifications of the end-to-end encrypted protocol client into
//! canonical events. Lifecycle notifications and receipts map one to one;
//! messages go through [`classify`] and, when plain, [`extract_message`].

mod classifier;
mod extract;
pub mod types;


pub use classifier::{MessageCategory, classify};
pub use extract::extract_message;
pub use types::{FbMessage, Jid, ProtocolEvent, Receipt};

use crate::event_stream::{Delivery, EventEmitter};
use crate::types::{
    DeviceDataChangedEvent, DisconnectedEvent, E2eeReactionEvent, E2eeReceiptEvent, EventPayload,
    MessageEditEvent, MessageUnsendEvent, UNKNOWN_THREAD_ID,
};

/// Maps protocol notifications onto the shared emitter.
#[derive(Debug, Clone)]
pub struct E2eeHandler {
    emitter: EventEmitter,
}

impl E2eeHandler {
    pub fn new(emitter: EventEmitter) -> Self {
        Self { emitter }
    }

    /// Handles one notification. Returns `None` when nothing was emitted.
    pub fn handle(&self, event: &ProtocolEvent) -> Option<Delivery> {
        match event {
            ProtocolEvent::Connected => Some(self.emitter.emit(EventPayload::E2eeConnected)),
            ProtocolEvent::Disconnected => Some(self.emitter.emit(EventPayload::Disconnected(
                DisconnectedEvent { is_e2ee: true },
            ))),
            ProtocolEvent::Message(message) => self.handle_message(message),
            ProtocolEvent::Receipt(receipt) => Some(self.handle_receipt(receipt)),
            ProtocolEvent::DeviceDataChanged { device_data } => {
                Some(self.device_data_changed(device_data))
            }
        }
    }

    pub fn device_data_changed(&self, device_data: &str) -> Delivery {
        self.emitter
            .emit(EventPayload::DeviceDataChanged(DeviceDataChangedEvent {
                device_data: device_data.to_string(),
            }))
    }

    fn handle_message(&self, message: &FbMessage) -> Option<Delivery> {
        let info = &message.info;

        let payload = match classify(message) {
            MessageCategory::Reaction(reaction) => {
                let target = reaction
                    .key
                    .as_ref()
                    .map(|key| key.id.clone())
                    .unwrap_or_default();
                EventPayload::E2eeReaction(E2eeReactionEvent {
                    message_id: target,
                    chat_jid: info.chat.to_string(),
                    sender_jid: info.sender.to_string(),
                    sender_id: info.sender.numeric_user().unwrap_or(0),
                    reaction: reaction.text.clone(),
                })
            }
            MessageCategory::Edit(edit) => EventPayload::MessageEdit(MessageEditEvent {
                message_id: edit
                    .key
                    .as_ref()
                    .map(|key| key.id.clone())
                    .unwrap_or_default(),
                thread_id: UNKNOWN_THREAD_ID,
                new_text: edit
                    .message
                    .as_ref()
                    .map(|body| body.text.clone())
                    .unwrap_or_default(),
                // No running counter on this transport
                edit_count: 1,
                timestamp_ms: info.timestamp.timestamp_millis(),
            }),
            MessageCategory::Revoke(revoke) => {
                let Some(target) = revoke
                    .key
                    .as_ref()
                    .map(|key| key.id.as_str())
                    .filter(|id| !id.is_empty())
                else {
                    tracing::debug!(
                        target: "bridge_events::e2ee::handle_message",
                        "Dropping revoke without target from {}",
                        info.sender
                    );
                    return None;
                };
                EventPayload::MessageUnsend(MessageUnsendEvent {
                    message_id: target.to_string(),
                    thread_id: info.chat.numeric_user().unwrap_or(UNKNOWN_THREAD_ID),
                    chat_jid: Some(info.chat.to_string()),
                    is_e2ee: true,
                })
            }
            MessageCategory::Plain => EventPayload::E2eeMessage(extract_message(message)),
        };

        Some(self.emitter.emit(payload))
    }

    fn handle_receipt(&self, receipt: &Receipt) -> Delivery {
        self.emitter.emit(EventPayload::E2eeReceipt(E2eeReceiptEvent {
            receipt_type: receipt.receipt_type.clone(),
            chat: receipt.chat.to_string(),
            sender: receipt.sender.to_string(),
            message_ids: receipt.message_ids.clone(),
        }))
    }
}
