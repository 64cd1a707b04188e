//! Media message handlers: shared files and video links become queue items.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageEntityKind};
use tracing::info;

use crate::context::AppContext;
use crate::dispatch::HandlerResult;
use crate::errors::BotError;
use crate::fetch::{self, Upload};

/// Message carries a document attachment with a video MIME type.
pub fn is_video_document(msg: &Message) -> bool {
    msg.document()
        .and_then(|doc| doc.mime_type.as_ref())
        .is_some_and(|m| m.type_() == mime::VIDEO)
}

/// Message carries an audio attachment.
pub fn is_audio(msg: &Message) -> bool {
    msg.audio().is_some()
}

/// Message carries at least one text-hyperlink entity.
pub fn has_text_link(msg: &Message) -> bool {
    msg.entities()
        .unwrap_or(&[])
        .iter()
        .any(|entity| matches!(entity.kind, MessageEntityKind::TextLink { .. }))
}

/// Handle a shared video file.
pub async fn handle_video(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let doc = msg
        .document()
        .ok_or_else(|| BotError::Fetch("message has no document attachment".to_string()))?;
    info!("Video of type {:?} received", doc.mime_type);

    enqueue_upload(&bot, &ctx, &msg, Upload::from_document(doc)).await
}

/// Handle a shared audio file.
pub async fn handle_audio(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let audio = msg
        .audio()
        .ok_or_else(|| BotError::Fetch("message has no audio attachment".to_string()))?;
    info!("Audio of type {:?} received", audio.mime_type);

    enqueue_upload(&bot, &ctx, &msg, Upload::from_audio(audio)).await
}

async fn enqueue_upload(
    bot: &Bot,
    ctx: &AppContext,
    msg: &Message,
    upload: Upload,
) -> HandlerResult {
    bot.send_message(msg.chat.id, "Thanks, adding file to queue...")
        .await?;
    bot.send_chat_action(msg.chat.id, ChatAction::RecordVoice)
        .await?;

    let path = ctx.fetcher.fetch_from_upload(bot, upload).await?;
    let uri = ctx.fetcher.library_uri(&path)?;
    let queue_len = ctx.player.enqueue(&uri).await?;

    bot.send_message(
        msg.chat.id,
        format!("Song added to queue! {queue_len} songs queued."),
    )
    .await?;
    Ok(())
}

/// Handle a message containing hyperlink entities. Only the first link that
/// matches a recognized video host is fetched; messages without one are a
/// silent no-op.
pub async fn handle_link(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let url = msg
        .entities()
        .unwrap_or(&[])
        .iter()
        .find_map(|entity| match &entity.kind {
            MessageEntityKind::TextLink { url } if fetch::is_supported_video_url(url.as_str()) => {
                Some(url.clone())
            }
            _ => None,
        });

    let Some(url) = url else {
        return Ok(());
    };

    bot.send_chat_action(msg.chat.id, ChatAction::RecordVoice)
        .await?;

    let path = ctx.fetcher.fetch_from_url(url.as_str()).await?;
    let uri = ctx.fetcher.library_uri(&path)?;
    let queue_len = ctx.player.enqueue(&uri).await?;

    bot.send_message(
        msg.chat.id,
        format!("Song added to queue! {queue_len} songs queued."),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(extra: serde_json::Value) -> Message {
        let mut base = serde_json::json!({
            "message_id": 1,
            "date": 1,
            "chat": {"id": 1, "type": "private", "first_name": "test"},
            "from": {"id": 7, "is_bot": false, "first_name": "test"},
        });
        base.as_object_mut()
            .unwrap()
            .extend(extra.as_object().unwrap().clone());
        serde_json::from_value(base).expect("valid message fixture")
    }

    #[test]
    fn video_documents_match_the_video_predicate() {
        let msg = message(serde_json::json!({
            "document": {
                "file_id": "f",
                "file_unique_id": "u",
                "file_size": 1,
                "mime_type": "video/mp4",
            }
        }));
        assert!(is_video_document(&msg));
        assert!(!is_audio(&msg));
        assert!(!has_text_link(&msg));
    }

    #[test]
    fn non_video_documents_do_not_match() {
        let msg = message(serde_json::json!({
            "document": {
                "file_id": "f",
                "file_unique_id": "u",
                "file_size": 1,
                "mime_type": "application/pdf",
            }
        }));
        assert!(!is_video_document(&msg));
    }

    #[test]
    fn audio_attachments_match_the_audio_predicate() {
        let msg = message(serde_json::json!({
            "audio": {
                "file_id": "f",
                "file_unique_id": "u",
                "file_size": 1,
                "duration": 3,
                "performer": "P",
                "title": "T",
                "mime_type": "audio/mpeg",
            }
        }));
        assert!(is_audio(&msg));
        assert!(!is_video_document(&msg));
    }

    #[test]
    fn text_links_match_the_link_predicate() {
        let msg = message(serde_json::json!({
            "text": "this one",
            "entities": [
                {"type": "text_link", "offset": 0, "length": 4, "url": "https://youtu.be/x"}
            ],
        }));
        assert!(has_text_link(&msg));
    }

    #[test]
    fn plain_text_matches_no_media_predicate() {
        let msg = message(serde_json::json!({"text": "hello"}));
        assert!(!is_video_document(&msg));
        assert!(!is_audio(&msg));
        assert!(!has_text_link(&msg));
    }
}
