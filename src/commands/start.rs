//! /start and /friends - bundled resource replies.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::context::AppContext;
use crate::dispatch::HandlerResult;
use crate::resources;

/// Handle the /start command.
pub async fn start(bot: Bot, _ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let first_name = msg
        .from
        .as_ref()
        .map(|user| user.first_name.clone())
        .unwrap_or_default();

    bot.send_message(msg.chat.id, resources::welcome_message(&first_name))
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

/// Handle the /friends command.
pub async fn friends(bot: Bot, _ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, resources::friends_message())
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}
