//! Attachment classification.
//!
//! Maps table-stream blob, sticker and link-preview rows, and the media
//! variants of encrypted content, onto canonical [`Attachment`]s. All
//! functions here are pure.

use crate::e2ee::types::{Content, MediaTransport};
use crate::table_diff::types::{BlobAttachmentRow, StickerRow, XmaRow};
use crate::types::{Attachment, AttachmentKind};

/// Closed set of blob attachment type codes used by the table stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobAttachmentType {
    None,
    Sticker,
    Image,
    AnimatedImage,
    Video,
    Audio,
    File,
    Xma,
    EphemeralImage,
    EphemeralVideo,
    SoundBite,
    Other(i64),
}

impl From<i64> for BlobAttachmentType {
    fn from(code: i64) -> Self {
        match code {
            0 => BlobAttachmentType::None,
            1 => BlobAttachmentType::Sticker,
            2 => BlobAttachmentType::Image,
            3 => BlobAttachmentType::AnimatedImage,
            4 => BlobAttachmentType::Video,
            5 => BlobAttachmentType::Audio,
            6 => BlobAttachmentType::File,
            7 => BlobAttachmentType::Xma,
            8 => BlobAttachmentType::EphemeralImage,
            9 => BlobAttachmentType::EphemeralVideo,
            12 => BlobAttachmentType::SoundBite,
            other => BlobAttachmentType::Other(other),
        }
    }
}

/// Classifies one blob row. Unrecognized type codes become files.
///
/// Durations are whole seconds, truncated from the row's milliseconds.
pub fn classify_blob(blob: &BlobAttachmentRow) -> Attachment {
    let playable_url = non_empty(&blob.playable_url);
    let preview_url = non_empty(&blob.preview_url);
    let width = dimension(blob.preview_width);
    let height = dimension(blob.preview_height);
    let duration = seconds_from_ms(blob.playable_duration_ms);

    let mut attachment = match BlobAttachmentType::from(blob.attachment_type) {
        BlobAttachmentType::Image | BlobAttachmentType::EphemeralImage => {
            let mut att = Attachment::new(AttachmentKind::Image);
            att.url = preview_url;
            att.width = width;
            att.height = height;
            att
        }
        BlobAttachmentType::AnimatedImage => {
            let mut att = Attachment::new(AttachmentKind::Gif);
            att.url = playable_url.or_else(|| preview_url.clone());
            att.preview_url = preview_url;
            att.width = width;
            att.height = height;
            att
        }
        BlobAttachmentType::Video | BlobAttachmentType::EphemeralVideo => {
            let mut att = Attachment::new(AttachmentKind::Video);
            att.url = playable_url;
            att.preview_url = preview_url;
            att.width = width;
            att.height = height;
            att.duration = duration;
            att
        }
        BlobAttachmentType::Audio => {
            let mut att = Attachment::new(AttachmentKind::Audio);
            att.url = playable_url;
            att.duration = duration;
            att
        }
        BlobAttachmentType::SoundBite => {
            let mut att = Attachment::new(AttachmentKind::Voice);
            att.url = playable_url;
            att.duration = duration;
            att
        }
        BlobAttachmentType::File
        | BlobAttachmentType::None
        | BlobAttachmentType::Sticker
        | BlobAttachmentType::Xma
        | BlobAttachmentType::Other(_) => {
            let mut att = Attachment::new(AttachmentKind::File);
            att.url = playable_url.or(preview_url);
            att
        }
    };

    attachment.file_name = non_empty(&blob.filename);
    attachment.mime_type = non_empty(&blob.attachment_mime_type);
    attachment.file_size = (blob.filesize != 0).then_some(blob.filesize);
    attachment
}

/// Builds a sticker attachment. The explicit attachment id wins over the
/// target id; an unparsable attachment id falls back as if it were absent.
pub fn sticker_attachment(sticker: &StickerRow) -> Attachment {
    let sticker_id = sticker
        .attachment_fbid
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id != 0)
        .unwrap_or(sticker.target_id);

    let mut attachment = Attachment::new(AttachmentKind::Sticker);
    attachment.url = non_empty(&sticker.preview_url);
    attachment.sticker_id = (sticker_id != 0).then_some(sticker_id);
    attachment.width = dimension(sticker.preview_width);
    attachment.height = dimension(sticker.preview_height);
    attachment
}

/// Builds a link attachment from a share preview row. Rows without a
/// preview url are not rendered and yield `None`.
pub fn xma_attachment(xma: &XmaRow) -> Option<Attachment> {
    let preview_url = non_empty(&xma.preview_url)?;

    let mut attachment = Attachment::new(AttachmentKind::Link);
    attachment.url = non_empty(&xma.action_url);
    attachment.preview_url = Some(preview_url);
    attachment.file_name = non_empty(&xma.title_text);
    attachment.description = non_empty(&xma.subtitle_text);
    attachment.source_text = non_empty(&xma.source_text);
    Some(attachment)
}

/// Maps an encrypted content variant to its attachment, if the variant
/// carries one. Text, reaction and edit variants yield `None`, as does
/// extended text without a canonical url.
pub fn content_attachment(content: &Content) -> Option<Attachment> {
    match content {
        Content::Image(image) => {
            let mut att = Attachment::new(AttachmentKind::Image);
            att.width = image.width;
            att.height = image.height;
            apply_media(&mut att, image.media.as_ref());
            Some(att)
        }
        Content::Video(video) => {
            let mut att = Attachment::new(AttachmentKind::Video);
            att.width = video.width;
            att.height = video.height;
            att.duration = video.seconds;
            apply_media(&mut att, video.media.as_ref());
            Some(att)
        }
        Content::Audio(audio) => {
            let mut att = Attachment::new(AttachmentKind::Voice);
            att.duration = audio.seconds;
            apply_media(&mut att, audio.media.as_ref());
            Some(att)
        }
        Content::Document(document) => {
            let mut att = Attachment::new(AttachmentKind::File);
            att.file_name = non_empty(&document.file_name);
            apply_media(&mut att, document.media.as_ref());
            Some(att)
        }
        Content::Sticker(sticker) => {
            let mut att = Attachment::new(AttachmentKind::Sticker);
            att.width = sticker.width;
            att.height = sticker.height;
            apply_media(&mut att, sticker.media.as_ref());
            Some(att)
        }
        Content::Location(location) => {
            let mut att = Attachment::new(AttachmentKind::Location);
            let coordinates = location.location.clone().unwrap_or_default();
            att.latitude = Some(coordinates.degrees_latitude);
            att.longitude = Some(coordinates.degrees_longitude);
            // Address rides in the filename slot
            att.file_name = non_empty(&location.address);
            Some(att)
        }
        Content::ExtendedText(extended) => {
            let url = non_empty(&extended.canonical_url)?;
            let mut att = Attachment::new(AttachmentKind::Link);
            att.url = Some(url);
            att.file_name = non_empty(&extended.title);
            Some(att)
        }
        Content::MessageText(_) | Content::Reaction(_) | Content::Edit(_) => None,
    }
}

fn apply_media(attachment: &mut Attachment, media: Option<&MediaTransport>) {
    let Some(media) = media else {
        return;
    };
    attachment.direct_path = media.direct_path.clone().filter(|p| !p.is_empty());
    attachment.media_key = media.media_key.clone();
    attachment.media_sha256 = media.file_sha256.clone();
    attachment.media_enc_sha256 = media.file_enc_sha256.clone();
    attachment.mime_type = media.mimetype.clone().filter(|m| !m.is_empty());
    attachment.file_size = media.file_length;
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn dimension(value: i64) -> Option<i32> {
    i32::try_from(value).ok().filter(|v| *v != 0)
}

fn seconds_from_ms(ms: i64) -> Option<i64> {
    let seconds = ms / 1000;
    (seconds != 0).then_some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2ee::types::{
        DocumentMessage, ExtendedTextMessage, ImageMessage, Location, LocationMessage,
        ReactionMessage, TextBody, VideoMessage,
    };

    fn blob(code: i64) -> BlobAttachmentRow {
        BlobAttachmentRow {
            message_id: "mid.1".to_string(),
            attachment_type: code,
            filename: "f.bin".to_string(),
            attachment_mime_type: "application/octet-stream".to_string(),
            filesize: 2048,
            preview_url: "https://cdn/preview".to_string(),
            preview_width: 640,
            preview_height: 480,
            playable_url: "https://cdn/play".to_string(),
            playable_duration_ms: 125_000,
        }
    }

    #[test]
    fn test_image_uses_preview_url_and_dimensions() {
        for code in [2, 8] {
            let att = classify_blob(&blob(code));
            assert_eq!(att.kind, AttachmentKind::Image);
            assert_eq!(att.url.as_deref(), Some("https://cdn/preview"));
            assert_eq!(att.width, Some(640));
            assert_eq!(att.height, Some(480));
            assert_eq!(att.duration, None);
            assert_eq!(att.file_name.as_deref(), Some("f.bin"));
            assert_eq!(att.file_size, Some(2048));
        }
    }

    #[test]
    fn test_video_duration_truncates() {
        let att = classify_blob(&blob(4));
        assert_eq!(att.kind, AttachmentKind::Video);
        assert_eq!(att.duration, Some(125));
        assert_eq!(att.url.as_deref(), Some("https://cdn/play"));
        assert_eq!(att.preview_url.as_deref(), Some("https://cdn/preview"));

        let mut row = blob(9);
        row.playable_duration_ms = 1_999;
        assert_eq!(classify_blob(&row).duration, Some(1));
    }

    #[test]
    fn test_gif_falls_back_to_preview_url() {
        let mut row = blob(3);
        row.playable_url.clear();
        let att = classify_blob(&row);
        assert_eq!(att.kind, AttachmentKind::Gif);
        assert_eq!(att.url.as_deref(), Some("https://cdn/preview"));
        assert_eq!(att.preview_url.as_deref(), Some("https://cdn/preview"));

        let att = classify_blob(&blob(3));
        assert_eq!(att.url.as_deref(), Some("https://cdn/play"));
    }

    #[test]
    fn test_audio_and_voice() {
        let audio = classify_blob(&blob(5));
        assert_eq!(audio.kind, AttachmentKind::Audio);
        assert_eq!(audio.duration, Some(125));
        assert_eq!(audio.width, None);

        let voice = classify_blob(&blob(12));
        assert_eq!(voice.kind, AttachmentKind::Voice);
        assert_eq!(voice.url.as_deref(), Some("https://cdn/play"));
    }

    #[test]
    fn test_file_and_unknown_codes() {
        let file = classify_blob(&blob(6));
        assert_eq!(file.kind, AttachmentKind::File);
        assert_eq!(file.url.as_deref(), Some("https://cdn/play"));

        let mut row = blob(99);
        row.playable_url.clear();
        let unknown = classify_blob(&row);
        assert_eq!(unknown.kind, AttachmentKind::File);
        assert_eq!(unknown.url.as_deref(), Some("https://cdn/preview"));

        row.preview_url.clear();
        assert_eq!(classify_blob(&row).url, None);
    }

    #[test]
    fn test_sticker_id_prefers_attachment_id() {
        let mut sticker = StickerRow {
            message_id: "mid.1".to_string(),
            attachment_fbid: "369239263222822".to_string(),
            target_id: 12,
            preview_url: "https://cdn/sticker".to_string(),
            preview_width: 120,
            preview_height: 120,
        };
        let att = sticker_attachment(&sticker);
        assert_eq!(att.kind, AttachmentKind::Sticker);
        assert_eq!(att.sticker_id, Some(369239263222822));
        assert_eq!(att.width, Some(120));

        sticker.attachment_fbid = "not-a-number".to_string();
        assert_eq!(sticker_attachment(&sticker).sticker_id, Some(12));

        sticker.attachment_fbid.clear();
        assert_eq!(sticker_attachment(&sticker).sticker_id, Some(12));
    }

    #[test]
    fn test_xma_requires_preview_url() {
        let mut xma = XmaRow {
            message_id: "mid.1".to_string(),
            action_url: "https://example.com/article".to_string(),
            preview_url: "https://cdn/thumb".to_string(),
            title_text: "Article".to_string(),
            subtitle_text: "A subtitle".to_string(),
            source_text: "example.com".to_string(),
        };
        let att = xma_attachment(&xma).expect("preview url present");
        assert_eq!(att.kind, AttachmentKind::Link);
        assert_eq!(att.url.as_deref(), Some("https://example.com/article"));
        assert_eq!(att.file_name.as_deref(), Some("Article"));
        assert_eq!(att.description.as_deref(), Some("A subtitle"));
        assert_eq!(att.source_text.as_deref(), Some("example.com"));

        xma.preview_url.clear();
        assert!(xma_attachment(&xma).is_none());
    }

    #[test]
    fn test_content_media_carries_download_pointers() {
        let content = Content::Image(ImageMessage {
            caption: Some(TextBody::new("look")),
            media: Some(MediaTransport {
                direct_path: Some("/v/t62/img".to_string()),
                media_key: Some(vec![9; 32]),
                file_sha256: Some(vec![1; 32]),
                file_enc_sha256: Some(vec![2; 32]),
                mimetype: Some("image/jpeg".to_string()),
                file_length: Some(5120),
            }),
            width: Some(800),
            height: Some(600),
        });

        let att = content_attachment(&content).unwrap();
        assert_eq!(att.kind, AttachmentKind::Image);
        assert_eq!(att.direct_path.as_deref(), Some("/v/t62/img"));
        assert_eq!(att.media_key, Some(vec![9; 32]));
        assert_eq!(att.media_enc_sha256, Some(vec![2; 32]));
        assert_eq!(att.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(att.file_size, Some(5120));
        assert_eq!(att.width, Some(800));
    }

    #[test]
    fn test_content_variants_without_media() {
        let video = content_attachment(&Content::Video(VideoMessage {
            seconds: Some(31),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(video.kind, AttachmentKind::Video);
        assert_eq!(video.duration, Some(31));
        assert_eq!(video.direct_path, None);

        let doc = content_attachment(&Content::Document(DocumentMessage {
            file_name: "report.pdf".to_string(),
            media: None,
        }))
        .unwrap();
        assert_eq!(doc.kind, AttachmentKind::File);
        assert_eq!(doc.file_name.as_deref(), Some("report.pdf"));

        let location = content_attachment(&Content::Location(LocationMessage {
            location: Some(Location {
                degrees_latitude: 44.98,
                degrees_longitude: -93.27,
            }),
            address: "Minneapolis".to_string(),
        }))
        .unwrap();
        assert_eq!(location.kind, AttachmentKind::Location);
        assert_eq!(location.latitude, Some(44.98));
        assert_eq!(location.longitude, Some(-93.27));
        assert_eq!(location.file_name.as_deref(), Some("Minneapolis"));

        assert!(content_attachment(&Content::Reaction(ReactionMessage::default())).is_none());
        assert!(content_attachment(&Content::MessageText(TextBody::new("hi"))).is_none());
    }

    #[test]
    fn test_extended_text_link_only_with_canonical_url() {
        let mut extended = ExtendedTextMessage {
            text: Some(TextBody::new("see https://example.com")),
            canonical_url: "https://example.com".to_string(),
            title: "Example".to_string(),
        };
        let att = content_attachment(&Content::ExtendedText(extended.clone())).unwrap();
        assert_eq!(att.kind, AttachmentKind::Link);
        assert_eq!(att.url.as_deref(), Some("https://example.com"));
        assert_eq!(att.file_name.as_deref(), Some("Example"));

        extended.canonical_url.clear();
        assert!(content_attachment(&Content::ExtendedText(extended)).is_none());
    }
}
