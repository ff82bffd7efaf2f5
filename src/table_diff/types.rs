//! Row types of the table-diff stream.
//!
//! A [`TableDiff`] is one batch of row collections, one per row kind, in the
//! order the source delivered them. Field names follow the source tables so
//! a collaborator can deserialize batches directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A message row, used by both real-time inserts and backfill upserts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageRow {
    pub message_id: String,
    pub thread_key: i64,
    pub sender_id: i64,
    pub text: String,
    pub timestamp_ms: i64,
    pub is_admin_message: bool,
    pub reply_source_id: String,
    pub reply_to_user_id: i64,
    pub reply_snippet: String,
    pub mention_offsets: String,
    pub mention_lengths: String,
    pub mention_ids: String,
    pub mention_types: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlobAttachmentRow {
    pub message_id: String,
    /// Raw attachment type code, see [`crate::attachments::BlobAttachmentType`].
    pub attachment_type: i64,
    pub filename: String,
    pub attachment_mime_type: String,
    pub filesize: i64,
    pub preview_url: String,
    pub preview_width: i64,
    pub preview_height: i64,
    pub playable_url: String,
    pub playable_duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StickerRow {
    pub message_id: String,
    /// Sticker id usable for sending; may be empty or non-numeric.
    pub attachment_fbid: String,
    pub target_id: i64,
    pub preview_url: String,
    pub preview_width: i64,
    pub preview_height: i64,
}

/// Link and share preview ("XMA") row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XmaRow {
    pub message_id: String,
    pub action_url: String,
    pub preview_url: String,
    pub title_text: String,
    pub subtitle_text: String,
    pub source_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditMessageRow {
    pub message_id: String,
    pub text: String,
    pub edit_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteMessageRow {
    pub thread_key: i64,
    pub message_id: String,
}

/// Replacement row. The source uses it both for unsends and for
/// edit-by-replace, distinguished by `is_unsent`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteThenInsertMessageRow {
    pub thread_key: i64,
    pub message_id: String,
    pub text: String,
    pub is_unsent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadReceiptRow {
    pub thread_key: i64,
    pub contact_id: i64,
    pub read_watermark_timestamp_ms: i64,
    pub read_action_timestamp_ms: i64,
}

/// The local account marked a thread as read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkThreadReadRow {
    pub thread_key: i64,
    pub last_read_watermark_timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionRow {
    pub thread_key: i64,
    pub message_id: String,
    pub actor_id: i64,
    pub reaction: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteReactionRow {
    pub thread_key: i64,
    pub message_id: String,
    pub actor_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypingRow {
    pub thread_key: i64,
    pub sender_id: i64,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadRow {
    pub thread_key: i64,
    pub thread_type: i32,
    pub thread_name: String,
    pub last_activity_timestamp_ms: i64,
    pub snippet: String,
}

/// One snapshot or delta of the table stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableDiff {
    pub insert_message: Vec<MessageRow>,
    pub upsert_message: Vec<MessageRow>,
    pub insert_blob_attachment: Vec<BlobAttachmentRow>,
    pub insert_sticker_attachment: Vec<StickerRow>,
    pub insert_xma_attachment: Vec<XmaRow>,
    pub edit_message: Vec<EditMessageRow>,
    pub delete_message: Vec<DeleteMessageRow>,
    pub delete_then_insert_message: Vec<DeleteThenInsertMessageRow>,
    pub update_read_receipt: Vec<ReadReceiptRow>,
    pub mark_thread_read: Vec<MarkThreadReadRow>,
    pub upsert_reaction: Vec<ReactionRow>,
    pub delete_reaction: Vec<DeleteReactionRow>,
    pub update_typing_indicator: Vec<TypingRow>,
    pub upsert_thread: Vec<ThreadRow>,
}

/// A message row joined with the attachment rows that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WrappedMessage {
    pub message: MessageRow,
    pub blob_attachments: Vec<BlobAttachmentRow>,
    pub stickers: Vec<StickerRow>,
    pub xma_attachments: Vec<XmaRow>,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self == &TableDiff::default()
    }

    /// Joins message rows with their attachment rows, split into
    /// `(historical, real_time)`: upserts are backfill, inserts are new.
    /// Inserts without a message id cannot be joined and are left out.
    pub fn wrap_messages(&self) -> (Vec<WrappedMessage>, Vec<WrappedMessage>) {
        let mut blobs: HashMap<&str, Vec<&BlobAttachmentRow>> = HashMap::new();
        for blob in &self.insert_blob_attachment {
            blobs.entry(blob.message_id.as_str()).or_default().push(blob);
        }
        let mut stickers: HashMap<&str, Vec<&StickerRow>> = HashMap::new();
        for sticker in &self.insert_sticker_attachment {
            stickers
                .entry(sticker.message_id.as_str())
                .or_default()
                .push(sticker);
        }
        let mut xmas: HashMap<&str, Vec<&XmaRow>> = HashMap::new();
        for xma in &self.insert_xma_attachment {
            xmas.entry(xma.message_id.as_str()).or_default().push(xma);
        }

        let wrap = |row: &MessageRow| {
            let id = row.message_id.as_str();
            WrappedMessage {
                message: row.clone(),
                blob_attachments: collect_owned(blobs.get(id)),
                stickers: collect_owned(stickers.get(id)),
                xma_attachments: collect_owned(xmas.get(id)),
            }
        };

        let historical = self.upsert_message.iter().map(&wrap).collect();
        let real_time = self
            .insert_message
            .iter()
            .filter(|row| !row.message_id.is_empty())
            .map(&wrap)
            .collect();
        (historical, real_time)
    }
}

fn collect_owned<T: Clone>(rows: Option<&Vec<&T>>) -> Vec<T> {
    rows.map(|rows| rows.iter().map(|row| (*row).clone()).collect())
        .unwrap_or_default()
}
