//! Canonical event model handed to consumers of the bridge.
//!
//! Both source streams are normalized into [`Event`]s. The event's type tag is
//! derived from its payload variant, so a tag can never be paired with the
//! wrong payload shape.

use serde::{Deserialize, Serialize};

/// Thread id used when the source row carries no thread reference.
/// Downstream collaborators are expected to resolve it from their own index.
pub const UNKNOWN_THREAD_ID: i64 = 0;

/// Error code attached to errors the source client will not recover from.
pub const PERMANENT_ERROR_CODE: i32 = 1;

/// Closed set of event type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Ready,
    Reconnected,
    Disconnected,
    Error,
    Message,
    MessageEdit,
    MessageUnsend,
    Reaction,
    Typing,
    Presence,
    ReadReceipt,
    E2eeConnected,
    E2eeMessage,
    E2eeReaction,
    E2eeReceipt,
    DeviceDataChanged,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Ready => "ready",
            EventType::Reconnected => "reconnected",
            EventType::Disconnected => "disconnected",
            EventType::Error => "error",
            EventType::Message => "message",
            EventType::MessageEdit => "messageEdit",
            EventType::MessageUnsend => "messageUnsend",
            EventType::Reaction => "reaction",
            EventType::Typing => "typing",
            EventType::Presence => "presence",
            EventType::ReadReceipt => "readReceipt",
            EventType::E2eeConnected => "e2eeConnected",
            EventType::E2eeMessage => "e2eeMessage",
            EventType::E2eeReaction => "e2eeReaction",
            EventType::E2eeReceipt => "e2eeReceipt",
            EventType::DeviceDataChanged => "deviceDataChanged",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized occurrence delivered through the event channel.
///
/// `timestamp` is the emission time in milliseconds, not the source time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: i64,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Encodes the event as a single JSON object.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload of an [`Event`], tagged by its event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EventPayload {
    Ready(ReadyEvent),
    Reconnected,
    Disconnected(DisconnectedEvent),
    Error(ErrorEvent),
    Message(Message),
    MessageEdit(MessageEditEvent),
    MessageUnsend(MessageUnsendEvent),
    Reaction(ReactionEvent),
    Typing(TypingEvent),
    Presence(PresenceEvent),
    ReadReceipt(ReadReceiptEvent),
    E2eeConnected,
    E2eeMessage(Message),
    E2eeReaction(E2eeReactionEvent),
    E2eeReceipt(E2eeReceiptEvent),
    DeviceDataChanged(DeviceDataChangedEvent),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Ready(_) => EventType::Ready,
            EventPayload::Reconnected => EventType::Reconnected,
            EventPayload::Disconnected(_) => EventType::Disconnected,
            EventPayload::Error(_) => EventType::Error,
            EventPayload::Message(_) => EventType::Message,
            EventPayload::MessageEdit(_) => EventType::MessageEdit,
            EventPayload::MessageUnsend(_) => EventType::MessageUnsend,
            EventPayload::Reaction(_) => EventType::Reaction,
            EventPayload::Typing(_) => EventType::Typing,
            EventPayload::Presence(_) => EventType::Presence,
            EventPayload::ReadReceipt(_) => EventType::ReadReceipt,
            EventPayload::E2eeConnected => EventType::E2eeConnected,
            EventPayload::E2eeMessage(_) => EventType::E2eeMessage,
            EventPayload::E2eeReaction(_) => EventType::E2eeReaction,
            EventPayload::E2eeReceipt(_) => EventType::E2eeReceipt,
            EventPayload::DeviceDataChanged(_) => EventType::DeviceDataChanged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyEvent {
    pub is_new_session: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedEvent {
    #[serde(default, rename = "isE2EE", skip_serializing_if = "is_false")]
    pub is_e2ee: bool,
}

/// Transport-surfaced error. Permanent errors carry [`PERMANENT_ERROR_CODE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

/// A normalized chat message from either source stream.
///
/// `attachments` and `mentions` are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: i64,
    pub sender_id: i64,
    pub text: String,
    pub timestamp_ms: i64,
    #[serde(default, rename = "isE2EE", skip_serializing_if = "is_false")]
    pub is_e2ee: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_jid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_jid: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_admin_msg: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTo {
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    User,
    Page,
    Group,
    Thread,
}

impl std::str::FromStr for MentionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MentionKind::User),
            "page" => Ok(MentionKind::Page),
            "group" => Ok(MentionKind::Group),
            "thread" => Ok(MentionKind::Thread),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub user_id: i64,
    pub offset: i64,
    pub length: i64,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MentionKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Voice,
    File,
    Sticker,
    Gif,
    Link,
    Location,
}

/// One media, link or location unit owned by a [`Message`].
///
/// Only the fields meaningful for `kind` are populated. For E2EE media the
/// download pointers (`direct_path`, `media_key`, hashes) are carried so the
/// consumer can fetch and decrypt the blob later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Original filename, link title, or the address of a location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    /// Seconds, truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub media_key: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub media_sha256: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub media_enc_sha256: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_path: Option<String>,
}

impl Attachment {
    /// An attachment of the given kind with every optional field unset.
    pub fn new(kind: AttachmentKind) -> Self {
        Self {
            kind,
            url: None,
            file_name: None,
            mime_type: None,
            file_size: None,
            width: None,
            height: None,
            duration: None,
            sticker_id: None,
            latitude: None,
            longitude: None,
            preview_url: None,
            description: None,
            source_text: None,
            media_key: None,
            media_sha256: None,
            media_enc_sha256: None,
            direct_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEditEvent {
    pub message_id: String,
    /// [`UNKNOWN_THREAD_ID`] unless the source conveyed the thread.
    pub thread_id: i64,
    pub new_text: String,
    pub edit_count: i64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUnsendEvent {
    pub message_id: String,
    pub thread_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_jid: Option<String>,
    #[serde(default, rename = "isE2EE", skip_serializing_if = "is_false")]
    pub is_e2ee: bool,
}

/// Reaction change. An empty `reaction` means the reaction was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEvent {
    pub message_id: String,
    pub thread_id: i64,
    pub actor_id: i64,
    pub reaction: String,
    pub timestamp_ms: i64,
}

impl ReactionEvent {
    pub fn is_removal(&self) -> bool {
        self.reaction.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub thread_id: i64,
    pub sender_id: i64,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub user_id: i64,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceiptEvent {
    pub thread_id: i64,
    pub reader_id: i64,
    pub read_watermark_timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

/// Reaction on the encrypted path. An empty `reaction` means removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct E2eeReactionEvent {
    pub message_id: String,
    pub chat_jid: String,
    pub sender_jid: String,
    pub sender_id: i64,
    pub reaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct E2eeReceiptEvent {
    #[serde(rename = "type")]
    pub receipt_type: String,
    pub chat: String,
    pub sender: String,
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDataChangedEvent {
    pub device_data: String,
}

/// Conversation kind as reported by the table stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ThreadType {
    OneToOne,
    Group,
    Page,
    Marketplace,
    EncryptedOneToOne,
    EncryptedGroup,
    Other(i32),
}

impl From<i32> for ThreadType {
    fn from(code: i32) -> Self {
        match code {
            1 => ThreadType::OneToOne,
            2 => ThreadType::Group,
            3 => ThreadType::Page,
            4 => ThreadType::Marketplace,
            7 => ThreadType::EncryptedOneToOne,
            8 => ThreadType::EncryptedGroup,
            other => ThreadType::Other(other),
        }
    }
}

impl From<ThreadType> for i32 {
    fn from(thread_type: ThreadType) -> Self {
        match thread_type {
            ThreadType::OneToOne => 1,
            ThreadType::Group => 2,
            ThreadType::Page => 3,
            ThreadType::Marketplace => 4,
            ThreadType::EncryptedOneToOne => 7,
            ThreadType::EncryptedGroup => 8,
            ThreadType::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: i64,
    #[serde(rename = "type")]
    pub thread_type: ThreadType,
    pub name: String,
    pub last_activity_timestamp_ms: i64,
    pub snippet: String,
}

/// Snapshot handed over on connect: known threads plus the messages of the
/// initial table, built without emitting events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub threads: Vec<Thread>,
    pub messages: Vec<Message>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Base64 wire encoding for optional binary fields.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
