//! Shared state handed to every handler.

use tokio::sync::Notify;

use crate::fetch::MediaFetcher;
use crate::player::PlayerClient;

/// Immutable application context, built once before the receive loop starts.
pub struct AppContext {
    pub player: PlayerClient,
    pub fetcher: MediaFetcher,
    /// Fired by the restart command after its reply went out; the entry
    /// point reacts by stopping the receive loop and re-executing.
    pub restart: Notify,
}
