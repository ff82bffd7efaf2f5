//! Plain encrypted message extraction.

use super::classifier::consumer_payload;
use super::types::{Content, FbMessage};
use crate::attachments::content_attachment;
use crate::types::{Message, UNKNOWN_THREAD_ID};

/// Builds a canonical message from a plain encrypted message.
///
/// The thread id is the numeric user part of the chat address, or
/// [`UNKNOWN_THREAD_ID`] when it is not numeric. Captions of image, video and
/// extended-text content replace the top-level text. Missing or unknown content
/// yields an empty message rather than an error.
pub fn extract_message(message: &FbMessage) -> Message {
    let info = &message.info;
    let mut extracted = Message {
        id: info.id.clone(),
        thread_id: info.chat.numeric_user().unwrap_or(UNKNOWN_THREAD_ID),
        sender_id: info.sender.numeric_user().unwrap_or(0),
        timestamp_ms: info.timestamp.timestamp_millis(),
        is_e2ee: true,
        chat_jid: Some(info.chat.to_string()),
        sender_jid: Some(info.sender.to_string()),
        ..Default::default()
    };

    let Some(content) = consumer_payload(message).and_then(|p| p.content.as_ref()) else {
        return extracted;
    };

    if let Some(text) = content_text(content) {
        extracted.text = text.to_string();
    }
    extracted.attachments.extend(content_attachment(content));

    extracted
}

fn content_text(content: &Content) -> Option<&str> {
    let body = match content {
        Content::MessageText(body) => Some(body),
        Content::ExtendedText(extended) => extended.text.as_ref(),
        Content::Image(image) => image.caption.as_ref(),
        Content::Video(video) => video.caption.as_ref(),
        _ => None,
    };
    body.map(|b| b.text.as_str())
}
