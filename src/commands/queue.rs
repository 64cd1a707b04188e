//! /queue - lists upcoming songs.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::context::AppContext;
use crate::dispatch::{self, HandlerResult};
use crate::format::{render_queue, QueueEntry};

const DEFAULT_LIMIT: u32 = 5;

/// Handle the /queue command. Accepts an optional number of songs to list.
pub async fn queue(bot: Bot, ctx: Arc<AppContext>, msg: Message) -> HandlerResult {
    let args = dispatch::command_args(msg.text().unwrap_or_default());
    let limit = match args.first().copied() {
        Some(raw) => dispatch::parse_arg(raw, "a number of songs")?,
        None => DEFAULT_LIMIT,
    };

    let entries: Vec<QueueEntry> = ctx
        .player
        .upcoming(limit)
        .await?
        .into_iter()
        .map(QueueEntry::from)
        .collect();

    bot.send_message(msg.chat.id, render_queue(&entries))
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}
