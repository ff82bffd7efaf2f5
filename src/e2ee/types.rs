//! Inbound types of the end-to-end encrypted protocol stream.
//!
//! The content of an application message is a oneof: exactly one
//! [`Content`] variant is populated. Revokes travel separately in the
//! payload's application data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::types::base64_bytes;

/// Protocol address in `user@server` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid {
    pub user: String,
    pub server: String,
}

impl Jid {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
        }
    }

    /// The user part as a numeric id, if it is one.
    pub fn numeric_user(&self) -> Option<i64> {
        self.user.parse().ok()
    }
}

impl std::fmt::Display for Jid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.user.is_empty() {
            f.write_str(&self.server)
        } else {
            write!(f, "{}@{}", self.user, self.server)
        }
    }
}

impl std::str::FromStr for Jid {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((user, server)) if !server.is_empty() => Ok(Jid::new(user, server)),
            Some(_) => Err(BridgeError::InvalidJid(s.to_string())),
            // The empty address, as displayed by `Jid::default()`
            None => Ok(Jid::new("", s)),
        }
    }
}

impl TryFrom<String> for Jid {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}

/// Notifications delivered by the encrypted-protocol client.
///
/// Adjacently tagged so payloads may carry their own `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ProtocolEvent {
    Connected,
    Disconnected,
    Message(Box<FbMessage>),
    Receipt(Receipt),
    #[serde(rename_all = "camelCase")]
    DeviceDataChanged {
        device_data: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbMessage {
    pub info: MessageInfo,
    #[serde(default)]
    pub message: Option<ApplicationMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub id: String,
    pub chat: Jid,
    pub sender: Jid,
    pub timestamp: DateTime<Utc>,
}

/// Decrypted application message. Only consumer messages carry chat content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationMessage {
    Consumer(ConsumerApplication),
    /// Special-purpose messages that carry no chat content.
    Armadillo,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsumerApplication {
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payload {
    pub content: Option<Content>,
    pub application_data: Option<ApplicationData>,
}

/// The oneof content of a consumer message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Content {
    MessageText(TextBody),
    ExtendedText(ExtendedTextMessage),
    Image(ImageMessage),
    Video(VideoMessage),
    Audio(AudioMessage),
    Document(DocumentMessage),
    Sticker(StickerMessage),
    Location(LocationMessage),
    Reaction(ReactionMessage),
    Edit(EditMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextBody {
    pub text: String,
}

impl TextBody {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageKey {
    pub id: String,
    pub from_me: bool,
}

impl MessageKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from_me: false,
        }
    }
}

/// Download pointers for an encrypted media blob.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaTransport {
    pub direct_path: Option<String>,
    #[serde(with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub media_key: Option<Vec<u8>>,
    #[serde(with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub file_sha256: Option<Vec<u8>>,
    #[serde(with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub file_enc_sha256: Option<Vec<u8>>,
    pub mimetype: Option<String>,
    pub file_length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedTextMessage {
    pub text: Option<TextBody>,
    pub canonical_url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageMessage {
    pub caption: Option<TextBody>,
    pub media: Option<MediaTransport>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoMessage {
    pub caption: Option<TextBody>,
    pub media: Option<MediaTransport>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioMessage {
    pub media: Option<MediaTransport>,
    pub seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMessage {
    pub file_name: String,
    pub media: Option<MediaTransport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StickerMessage {
    pub media: Option<MediaTransport>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub degrees_latitude: f64,
    pub degrees_longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationMessage {
    pub location: Option<Location>,
    pub address: String,
}

/// Reaction on a target message. Empty `text` removes the reaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionMessage {
    pub key: Option<MessageKey>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditMessage {
    pub key: Option<MessageKey>,
    pub message: Option<TextBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationData {
    pub revoke: Option<Revoke>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Revoke {
    pub key: Option<MessageKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Receipt kind as reported by the protocol (`read`, `played`, ...);
    /// empty for plain delivery receipts.
    #[serde(rename = "type", default)]
    pub receipt_type: String,
    pub chat: Jid,
    pub sender: Jid,
    #[serde(default)]
    pub message_ids: Vec<String>,
}
