//! Configuration management for the bot.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub telegram_token: String,

    /// Address of the MPD instance, host:port
    pub mpd_address: String,

    /// Timeout for individual MPD commands
    pub mpd_timeout: Duration,

    /// Timeout for idle waits (library rescan notifications)
    pub mpd_idle_timeout: Duration,

    /// Music storage directory; when unset it is derived from the daemon's
    /// first mount at startup
    pub music_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let telegram_token = env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN environment variable not set")?;

        let mpd_address = env::var("MPD_ADDRESS")
            .unwrap_or_else(|_| "127.0.0.1:6600".to_string());

        let mpd_timeout = duration_from_env("MPD_TIMEOUT_SECS", 10)?;
        let mpd_idle_timeout = duration_from_env("MPD_IDLE_TIMEOUT_SECS", 10)?;

        let music_dir = env::var("MUSIC_DIR").ok().map(PathBuf::from);

        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            telegram_token,
            mpd_address,
            mpd_timeout,
            mpd_idle_timeout,
            music_dir,
            log_level,
        })
    }
}

fn duration_from_env(key: &str, default_secs: u64) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Duration::from_secs)
            .with_context(|| format!("{key} must be a whole number of seconds")),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}
