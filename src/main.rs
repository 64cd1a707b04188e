//! Telegram bot for controlling an MPD instance and queueing songs.

mod commands;
mod config;
mod context;
mod dispatch;
mod errors;
mod fetch;
mod format;
mod player;
mod resources;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tokio::sync::Notify;
use tracing::info;

use config::Config;
use context::AppContext;
use dispatch::DispatchBuilder;
use fetch::MediaFetcher;
use player::PlayerClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting mixtape bot...");
    info!("MPD address: {}", config.mpd_address);

    let player = PlayerClient::new(
        &config.mpd_address,
        config.mpd_timeout,
        config.mpd_idle_timeout,
    );

    // Without an explicit MUSIC_DIR the daemon's first mount decides where
    // downloads land.
    let music_dir = match &config.music_dir {
        Some(dir) => dir.clone(),
        None => player
            .music_directory()
            .await
            .context("MUSIC_DIR not set and the music directory could not be derived from MPD")?,
    };
    info!("Music directory: {}", music_dir.display());

    let ctx = Arc::new(AppContext {
        fetcher: MediaFetcher::new(music_dir, player.clone()),
        player,
        restart: Notify::new(),
    });

    // Registrations happen here and nowhere else; the table is immutable
    // once built.
    let mut builder = DispatchBuilder::new();
    commands::register_all(&mut builder)?;
    let table = Arc::new(builder.build());
    info!("BotFather command list:\n{}", table.command_summary());

    let bot = Bot::new(config.telegram_token.clone());

    let handler = Update::filter_message().endpoint({
        let table = Arc::clone(&table);
        let ctx = Arc::clone(&ctx);
        move |bot: Bot, msg: Message| {
            let table = Arc::clone(&table);
            let ctx = Arc::clone(&ctx);
            async move {
                table.dispatch(bot, ctx, msg).await;
                respond(())
            }
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build();
    let shutdown = dispatcher.shutdown_token();

    info!("Connecting to Telegram...");
    tokio::select! {
        _ = dispatcher.dispatch() => {
            info!("Receive loop stopped");
        }
        _ = ctx.restart.notified() => {
            info!("Restart requested, stopping receive loop");
            if let Ok(stopped) = shutdown.shutdown() {
                stopped.await;
            }
            reexec()?;
        }
    }

    Ok(())
}

/// Replace the process image with a fresh copy of this executable, keeping
/// the original arguments. Only returns on failure.
fn reexec() -> Result<()> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe().context("cannot resolve current executable")?;
    info!("Re-executing {}", exe.display());
    let err = std::process::Command::new(exe)
        .args(std::env::args_os().skip(1))
        .exec();
    Err(anyhow::Error::from(err).context("re-exec failed"))
}
