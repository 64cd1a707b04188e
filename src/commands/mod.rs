//! Command and message handlers.

mod media;
mod playback;
mod queue;
mod restart;
mod start;

use crate::dispatch::DispatchBuilder;
use crate::errors::BotError;

/// Register every handler. Called exactly once at startup, before the
/// dispatch table is finalized.
pub fn register_all(builder: &mut DispatchBuilder) -> Result<(), BotError> {
    builder.register_command("start", Some("Welcome message."), start::start)?;
    builder.register_command("friends", Some("Shows my inline friends."), start::friends)?;
    builder.register_command("clear", Some("Clears the queue."), playback::clear)?;
    builder.register_command("skip", Some("Skips the current song."), playback::skip)?;
    builder.register_command("play", Some("Starts playing."), playback::play)?;
    builder.register_command("stop", Some("Stops playing."), playback::stop)?;
    builder.register_command(
        "np",
        Some("Information about the current song."),
        playback::now_playing,
    )?;
    builder.register_command("status", Some("Current player status."), playback::status)?;
    builder.register_command("queue", Some("Lists upcoming songs."), queue::queue)?;
    builder.register_command("restart", Some("Restarts the bot."), restart::restart)?;

    builder.register_message_handler(
        "video-document",
        vec![media::is_video_document],
        media::handle_video,
    );
    builder.register_message_handler("audio", vec![media::is_audio], media::handle_audio);
    builder.register_message_handler(
        "text-link",
        vec![media::has_text_link],
        media::handle_link,
    );

    Ok(())
}
