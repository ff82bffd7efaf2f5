//! Per-batch translation of table rows into canonical events.

use std::collections::HashSet;

use super::TableDiffProcessor;
use super::types::{MessageRow, TableDiff, WrappedMessage};
use crate::attachments::{classify_blob, sticker_attachment, xma_attachment};
use crate::dedup::DedupKey;
use crate::event_stream::Delivery;
use crate::mentions::parse_mentions_with_kinds;
use crate::types::{
    EventPayload, InitialData, Message, MessageEditEvent, MessageUnsendEvent, ReactionEvent,
    ReadReceiptEvent, ReplyTo, TypingEvent, UNKNOWN_THREAD_ID,
};

/// Counters for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub backfilled: usize,
    pub emitted: usize,
    pub dropped: usize,
    pub suppressed: usize,
}

impl BatchSummary {
    pub(crate) fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Sent => self.emitted += 1,
            Delivery::Dropped => self.dropped += 1,
        }
    }
}

impl TableDiffProcessor {
    /// Processes one batch, emitting events in row-kind order.
    ///
    /// Backfill upserts never emit. A message id emitted from a wrapped row is
    /// not emitted again by the plain insert rows of the same batch.
    pub fn handle_table(&self, table: &TableDiff) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for row in &table.upsert_thread {
            self.threads.apply_thread_row(row);
        }

        let (historical, real_time) = table.wrap_messages();

        for wrapped in &historical {
            self.threads.observe_message(&wrapped.message);
        }
        summary.backfilled = historical.len();
        if !historical.is_empty() {
            tracing::debug!(
                target: "bridge_events::table_diff::handle_table",
                "Skipping events for {} backfilled messages",
                historical.len()
            );
        }

        let mut handled: HashSet<&str> = HashSet::new();

        for wrapped in &real_time {
            if !handled.insert(wrapped.message.message_id.as_str()) {
                continue;
            }
            self.threads.observe_message(&wrapped.message);
            summary.record(
                self.emitter
                    .emit(EventPayload::Message(convert_wrapped_message(wrapped))),
            );
        }

        // Rows the aggregate pass could not join
        for row in &table.insert_message {
            if handled.contains(row.message_id.as_str()) {
                continue;
            }
            self.threads.observe_message(row);
            summary.record(
                self.emitter
                    .emit(EventPayload::Message(convert_simple_message(row))),
            );
        }

        for edit in &table.edit_message {
            summary.record(self.emitter.emit(EventPayload::MessageEdit(MessageEditEvent {
                message_id: edit.message_id.clone(),
                thread_id: UNKNOWN_THREAD_ID,
                new_text: edit.text.clone(),
                edit_count: edit.edit_count,
                timestamp_ms: self.emitter.now_ms(),
            })));
        }

        for delete in &table.delete_message {
            summary.record(self.emit_unsend(&delete.message_id, delete.thread_key));
        }

        for replaced in &table.delete_then_insert_message {
            // The same row kind also carries edit-by-replace
            if replaced.is_unsent {
                summary.record(self.emit_unsend(&replaced.message_id, replaced.thread_key));
            }
        }

        for receipt in &table.update_read_receipt {
            summary.record(self.emitter.emit(EventPayload::ReadReceipt(ReadReceiptEvent {
                thread_id: receipt.thread_key,
                reader_id: receipt.contact_id,
                read_watermark_timestamp_ms: receipt.read_watermark_timestamp_ms,
                timestamp_ms: (receipt.read_action_timestamp_ms != 0)
                    .then_some(receipt.read_action_timestamp_ms),
            })));
        }

        for read in &table.mark_thread_read {
            summary.record(self.emitter.emit(EventPayload::ReadReceipt(ReadReceiptEvent {
                thread_id: read.thread_key,
                reader_id: self.self_id,
                read_watermark_timestamp_ms: read.last_read_watermark_timestamp_ms,
                timestamp_ms: Some(self.emitter.now_ms()),
            })));
        }

        for reaction in &table.upsert_reaction {
            summary.record(self.emitter.emit(EventPayload::Reaction(ReactionEvent {
                message_id: reaction.message_id.clone(),
                thread_id: reaction.thread_key,
                actor_id: reaction.actor_id,
                reaction: reaction.reaction.clone(),
                timestamp_ms: reaction.timestamp_ms,
            })));
        }

        for removed in &table.delete_reaction {
            let key = DedupKey::new(removed.message_id.clone(), removed.actor_id);
            if self.unreactions.should_suppress(&key, self.emitter.now_ms()) {
                tracing::debug!(
                    target: "bridge_events::table_diff::handle_table",
                    "Suppressing repeated un-reaction {}",
                    key
                );
                summary.suppressed += 1;
                continue;
            }
            summary.record(self.emitter.emit(EventPayload::Reaction(ReactionEvent {
                message_id: removed.message_id.clone(),
                thread_id: removed.thread_key,
                actor_id: removed.actor_id,
                reaction: String::new(),
                timestamp_ms: 0,
            })));
        }

        for typing in &table.update_typing_indicator {
            summary.record(self.emitter.emit(EventPayload::Typing(TypingEvent {
                thread_id: typing.thread_key,
                sender_id: typing.sender_id,
                is_typing: typing.is_typing,
            })));
        }

        tracing::trace!(
            target: "bridge_events::table_diff::handle_table",
            "Batch processed: {:?}",
            summary
        );

        summary
    }

    /// Converts a snapshot table into initial data without emitting events.
    /// Thread rows and messages still update the thread directory.
    pub fn initial_data(&self, table: &TableDiff) -> InitialData {
        for row in &table.upsert_thread {
            self.threads.apply_thread_row(row);
        }

        let (historical, real_time) = table.wrap_messages();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut messages = Vec::with_capacity(historical.len() + real_time.len());

        for wrapped in historical.iter().chain(real_time.iter()) {
            let id = wrapped.message.message_id.as_str();
            if !id.is_empty() && !seen.insert(id) {
                continue;
            }
            self.threads.observe_message(&wrapped.message);
            messages.push(convert_wrapped_message(wrapped));
        }

        InitialData {
            threads: self.threads.snapshot(),
            messages,
        }
    }

    fn emit_unsend(&self, message_id: &str, thread_id: i64) -> Delivery {
        self.emitter
            .emit(EventPayload::MessageUnsend(MessageUnsendEvent {
                message_id: message_id.to_string(),
                thread_id,
                chat_jid: None,
                is_e2ee: false,
            }))
    }
}

/// Builds a canonical message from a wrapped row.
///
/// Attachments keep a fixed order: blobs, then stickers, then link previews.
pub fn convert_wrapped_message(wrapped: &WrappedMessage) -> Message {
    let row = &wrapped.message;
    let mut message = convert_simple_message(row);
    message.is_admin_msg = row.is_admin_message;

    if !row.reply_source_id.is_empty() {
        message.reply_to = Some(ReplyTo {
            message_id: row.reply_source_id.clone(),
            sender_id: (row.reply_to_user_id != 0).then_some(row.reply_to_user_id),
            text: (!row.reply_snippet.is_empty()).then(|| row.reply_snippet.clone()),
        });
    }

    message.mentions = parse_mentions_with_kinds(
        &row.mention_offsets,
        &row.mention_lengths,
        &row.mention_ids,
        &row.mention_types,
    );

    message
        .attachments
        .extend(wrapped.blob_attachments.iter().map(classify_blob));
    message
        .attachments
        .extend(wrapped.stickers.iter().map(sticker_attachment));
    message
        .attachments
        .extend(wrapped.xma_attachments.iter().filter_map(xma_attachment));

    message
}

/// Builds a canonical message from a bare insert row, without attachments.
pub fn convert_simple_message(row: &MessageRow) -> Message {
    Message {
        id: row.message_id.clone(),
        thread_id: row.thread_key,
        sender_id: row.sender_id,
        text: row.text.clone(),
        timestamp_ms: row.timestamp_ms,
        attachments: Vec::new(),
        mentions: Vec::new(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table_diff::types::{BlobAttachmentRow, StickerRow, XmaRow};
    use crate::types::AttachmentKind;

    fn wrapped_row() -> WrappedMessage {
        WrappedMessage {
            message: MessageRow {
                message_id: "mid.$abc".to_string(),
                thread_key: 77,
                sender_id: 1001,
                text: "hey @bob".to_string(),
                timestamp_ms: 1_700_000_000_123,
                is_admin_message: false,
                reply_source_id: "mid.$parent".to_string(),
                reply_to_user_id: 1002,
                reply_snippet: "earlier".to_string(),
                mention_offsets: "4".to_string(),
                mention_lengths: "4".to_string(),
                mention_ids: "1002".to_string(),
                mention_types: String::new(),
            },
            blob_attachments: vec![BlobAttachmentRow {
                message_id: "mid.$abc".to_string(),
                attachment_type: 2,
                preview_url: "https://cdn/img".to_string(),
                ..Default::default()
            }],
            stickers: vec![StickerRow {
                message_id: "mid.$abc".to_string(),
                target_id: 55,
                ..Default::default()
            }],
            xma_attachments: vec![
                XmaRow {
                    message_id: "mid.$abc".to_string(),
                    preview_url: "https://cdn/thumb".to_string(),
                    action_url: "https://example.com".to_string(),
                    ..Default::default()
                },
                XmaRow {
                    message_id: "mid.$abc".to_string(),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_convert_wrapped_message_copies_fields() {
        let message = convert_wrapped_message(&wrapped_row());

        assert_eq!(message.id, "mid.$abc");
        assert_eq!(message.thread_id, 77);
        assert_eq!(message.sender_id, 1001);
        assert_eq!(message.text, "hey @bob");
        assert_eq!(message.timestamp_ms, 1_700_000_000_123);
        assert!(!message.is_e2ee);

        let reply = message.reply_to.expect("reply present");
        assert_eq!(reply.message_id, "mid.$parent");
        assert_eq!(reply.sender_id, Some(1002));
        assert_eq!(reply.text.as_deref(), Some("earlier"));

        assert_eq!(message.mentions.len(), 1);
        assert_eq!(message.mentions[0].user_id, 1002);
    }

    #[test]
    fn test_attachment_order_is_blobs_stickers_links() {
        let message = convert_wrapped_message(&wrapped_row());
        let kinds: Vec<AttachmentKind> = message.attachments.iter().map(|a| a.kind).collect();
        // The second preview row has no preview url and is omitted
        assert_eq!(
            kinds,
            vec![
                AttachmentKind::Image,
                AttachmentKind::Sticker,
                AttachmentKind::Link
            ]
        );
    }

    #[test]
    fn test_no_reply_without_source_id() {
        let mut wrapped = wrapped_row();
        wrapped.message.reply_source_id.clear();
        assert!(convert_wrapped_message(&wrapped).reply_to.is_none());
    }

    #[test]
    fn test_simple_message_has_empty_lists() {
        let message = convert_simple_message(&wrapped_row().message);
        assert!(message.attachments.is_empty());
        assert!(message.mentions.is_empty());
        assert!(message.reply_to.is_none());
    }
}
