//! Playback control commands, thin orchestration over the player client.

use std::sync::Arc;

use mpd::State;
use teloxide::prelude::*;

use crate::context::AppContext;
use crate::dispatch::HandlerResult;
use crate::format::QueueEntry;

/// Handle the /clear command.
pub async fn clear(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    ctx.player.clear().await?;
    bot.send_message(msg.chat.id, "Queue cleared!").await?;
    Ok(())
}

/// Handle the /skip command.
pub async fn skip(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    ctx.player.skip().await?;
    bot.send_message(msg.chat.id, "Skipping.").await?;
    Ok(())
}

/// Handle the /play command. Consume mode is enabled so played songs leave
/// the queue.
pub async fn play(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    ctx.player.play().await?;
    bot.send_message(msg.chat.id, "Playing music.").await?;
    Ok(())
}

/// Handle the /stop command.
pub async fn stop(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    ctx.player.stop().await?;
    bot.send_message(msg.chat.id, "Stopping music.").await?;
    Ok(())
}

/// Handle the /np command.
pub async fn now_playing(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let reply = match ctx.player.current_song().await? {
        Some(song) => describe_song(QueueEntry::from(song)),
        None => "Nothing is playing.".to_string(),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handle the /status command.
pub async fn status(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let status = ctx.player.status().await?;
    let state = match status.state {
        State::Play => "playing",
        State::Pause => "paused",
        State::Stop => "stopped",
    };
    let reply = format!(
        "State: {state}\nVolume: {}\nSongs in queue: {}",
        status.volume, status.queue_len
    );
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

fn describe_song(entry: QueueEntry) -> String {
    match (entry.artist.is_empty(), entry.title.is_empty()) {
        (false, false) => format!("{} – {}", entry.artist, entry.title),
        (false, true) => entry.artist,
        (true, false) => entry.title,
        (true, true) => entry.file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_song_with_whatever_metadata_exists() {
        let full = QueueEntry {
            artist: "A".to_string(),
            title: "B".to_string(),
            file: "ab.mp3".to_string(),
            duration: None,
        };
        assert_eq!(describe_song(full), "A – B");

        let bare = QueueEntry {
            file: "ab.mp3".to_string(),
            ..QueueEntry::default()
        };
        assert_eq!(describe_song(bare), "ab.mp3");
    }
}
