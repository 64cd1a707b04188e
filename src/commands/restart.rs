//! /restart - stop the receive loop and re-execute the process image.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use crate::context::AppContext;
use crate::dispatch::HandlerResult;

/// Handle the /restart command.
///
/// The reply is awaited before the restart signal fires, so it is on the
/// wire before the entry point tears the receive loop down. The actual
/// shutdown and re-exec happen in `main`.
pub async fn restart(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Restarting.").await?;
    info!("Restart requested by chat {}", msg.chat.id);
    ctx.restart.notify_one();
    Ok(())
}
