//! Error taxonomy for the bot.

use thiserror::Error;

/// All failure classes a handler can produce.
///
/// Handlers let these propagate; the dispatcher's error path decides what the
/// user sees. Nothing in this crate retries a failed operation.
#[derive(Debug, Error)]
pub enum BotError {
    /// Invalid or missing startup configuration, including bad handler
    /// registrations. Fatal before the receive loop starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A player-daemon call failed (timeout, refused connection, malformed
    /// response). Surfaced to the user as a generic failure reply.
    #[error("player daemon error: {0}")]
    Protocol(#[from] mpd::error::Error),

    /// A download failed, a URL is unsupported, or an upload carried no
    /// usable filename metadata. Aborts the enqueue pipeline.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A command argument did not parse. The message is replied to the user
    /// verbatim instead of the generic failure text.
    #[error("{0}")]
    Argument(String),

    #[error("telegram request failed: {0}")]
    Transport(#[from] teloxide::RequestError),

    #[error("telegram download failed: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
