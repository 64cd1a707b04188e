//! MPD client module for controlling the player daemon.

mod client;

pub use client::PlayerClient;
