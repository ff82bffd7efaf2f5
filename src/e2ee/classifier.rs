//! Oneof classification of decrypted consumer messages.

use super::types::{
    ApplicationMessage, Content, EditMessage, FbMessage, Payload, ReactionMessage, Revoke,
};

/// What a message means, decided by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageCategory<'a> {
    Reaction(&'a ReactionMessage),
    Edit(&'a EditMessage),
    Revoke(&'a Revoke),
    Plain,
}

/// Classifies a message. The first match wins:
///
/// 1. a reaction content variant,
/// 2. an edit content variant,
/// 3. a revoke in the payload's application data,
/// 4. anything else is a plain message.
///
/// The content check comes first because a revoke can ride alongside any
/// content variant.
pub fn classify(message: &FbMessage) -> MessageCategory<'_> {
    let Some(payload) = consumer_payload(message) else {
        return MessageCategory::Plain;
    };

    match &payload.content {
        Some(Content::Reaction(reaction)) => return MessageCategory::Reaction(reaction),
        Some(Content::Edit(edit)) => return MessageCategory::Edit(edit),
        _ => {}
    }

    match payload
        .application_data
        .as_ref()
        .and_then(|data| data.revoke.as_ref())
    {
        Some(revoke) => MessageCategory::Revoke(revoke),
        None => MessageCategory::Plain,
    }
}

/// The consumer payload, if the message carries one.
pub(crate) fn consumer_payload(message: &FbMessage) -> Option<&Payload> {
    match message.message.as_ref()? {
        ApplicationMessage::Consumer(app) => app.payload.as_ref(),
        ApplicationMessage::Armadillo => None,
    }
}
