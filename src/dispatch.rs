//! Command/message dispatch.
//!
//! Handlers are registered into a [`DispatchBuilder`] during startup; the
//! finalized [`DispatchTable`] is immutable and handed to the transport
//! before the receive loop starts. Command routing and message-handler
//! routing are mutually exclusive: a message carrying a command token never
//! reaches a message handler, and each inbound message triggers at most one
//! handler.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{debug, error};

use crate::context::AppContext;
use crate::errors::BotError;

/// What every handler returns.
pub type HandlerResult = Result<(), BotError>;

type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;
type Handler = Arc<dyn Fn(Bot, Arc<AppContext>, Message) -> HandlerFuture + Send + Sync>;

/// Boolean predicate over an inbound message's metadata.
pub type Predicate = fn(&Message) -> bool;

struct MessageEntry {
    name: &'static str,
    predicates: Vec<Predicate>,
    handler: Handler,
}

/// Startup-time registration of commands and message handlers.
#[derive(Default)]
pub struct DispatchBuilder {
    commands: HashMap<String, Handler>,
    summary: Vec<String>,
    message_handlers: Vec<MessageEntry>,
}

impl DispatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slash command.
    ///
    /// `name` must be a non-empty token of alphanumerics and underscores and
    /// must not already be registered. `description` feeds the BotFather
    /// command-list summary; `None` is listed as undocumented.
    pub fn register_command<F, Fut>(
        &mut self,
        name: &str,
        description: Option<&str>,
        handler: F,
    ) -> Result<(), BotError>
    where
        F: Fn(Bot, Arc<AppContext>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(BotError::Configuration(format!(
                "invalid command name '{name}'"
            )));
        }
        if self.commands.contains_key(name) {
            return Err(BotError::Configuration(format!(
                "command '{name}' registered twice"
            )));
        }

        self.summary
            .push(format!("{name} - {}", description.unwrap_or("Undocumented")));
        self.commands
            .insert(name.to_string(), wrap(handler));
        Ok(())
    }

    /// Register a message handler guarded by OR-combined predicates.
    ///
    /// An empty predicate set defaults to "plain text that is not a
    /// command". `name` only labels log lines.
    pub fn register_message_handler<F, Fut>(
        &mut self,
        name: &'static str,
        predicates: Vec<Predicate>,
        handler: F,
    ) where
        F: Fn(Bot, Arc<AppContext>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.message_handlers.push(MessageEntry {
            name,
            predicates,
            handler: wrap(handler),
        });
    }

    /// Finalize the table. No registrations happen after this point.
    pub fn build(self) -> DispatchTable {
        DispatchTable {
            commands: self.commands,
            message_handlers: self.message_handlers,
            summary: self.summary.join("\n"),
        }
    }
}

fn wrap<F, Fut>(handler: F) -> Handler
where
    F: Fn(Bot, Arc<AppContext>, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |bot, ctx, msg| Box::pin(handler(bot, ctx, msg)))
}

/// Immutable dispatch table driving the receive loop.
pub struct DispatchTable {
    commands: HashMap<String, Handler>,
    message_handlers: Vec<MessageEntry>,
    summary: String,
}

struct Resolved<'a> {
    label: String,
    handler: &'a Handler,
}

impl DispatchTable {
    /// Human-readable command list, one "name - description" line each.
    pub fn command_summary(&self) -> &str {
        &self.summary
    }

    /// Pick the handler responsible for a message, if any.
    fn resolve(&self, msg: &Message) -> Option<Resolved<'_>> {
        if let Some(text) = msg.text() {
            if let Some((name, _)) = parse_command(text) {
                // Command messages never fall through to message handlers;
                // unknown commands are ignored.
                return self.commands.get(name).map(|handler| Resolved {
                    label: format!("/{name}"),
                    handler,
                });
            }
        }

        self.message_handlers
            .iter()
            .find(|entry| {
                if entry.predicates.is_empty() {
                    is_plain_text(msg)
                } else {
                    entry.predicates.iter().any(|p| p(msg))
                }
            })
            .map(|entry| Resolved {
                label: entry.name.to_string(),
                handler: &entry.handler,
            })
    }

    #[cfg(test)]
    pub(crate) fn resolve_label(&self, msg: &Message) -> Option<String> {
        self.resolve(msg).map(|r| r.label)
    }

    /// Route one inbound message and run its handler.
    ///
    /// Handler errors end up here: argument errors are replied verbatim,
    /// everything else is logged in full and answered with a generic apology.
    pub async fn dispatch(&self, bot: Bot, ctx: Arc<AppContext>, msg: Message) {
        let Some(resolved) = self.resolve(&msg) else {
            return;
        };

        debug!("Handler {} called", resolved.label);
        let result = (resolved.handler)(bot.clone(), ctx, msg.clone()).await;
        debug!("Handler {} finished", resolved.label);

        if let Err(err) = result {
            match err {
                BotError::Argument(reason) => {
                    if let Err(e) = bot.send_message(msg.chat.id, reason).await {
                        error!("Failed to send argument-error reply: {}", e);
                    }
                }
                err => {
                    error!("Handler {} failed: {}", resolved.label, err);
                    let apology = "Sorry, but something went wrong...";
                    if let Err(e) = bot.send_message(msg.chat.id, apology).await {
                        error!("Failed to send error reply: {}", e);
                    }
                }
            }
        }
    }
}

/// Split `/name tail` into the command name (bot-mention stripped) and the
/// trailing text. Returns `None` for non-command text.
pub fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (token, tail) = rest.split_at(token_end);
    if token.is_empty() {
        return None;
    }
    let name = token.split('@').next().unwrap_or(token);
    Some((name, tail.trim_start()))
}

/// Whitespace-split arguments following the command token.
pub fn command_args(text: &str) -> Vec<&str> {
    parse_command(text)
        .map(|(_, tail)| tail.split_whitespace().collect())
        .unwrap_or_default()
}

/// Convert one raw argument, turning parse failures into user-facing
/// [`BotError::Argument`] replies.
pub fn parse_arg<T: FromStr>(raw: &str, expected: &str) -> Result<T, BotError> {
    raw.parse()
        .map_err(|_| BotError::Argument(format!("Expected {expected}, got '{raw}'.")))
}

fn is_plain_text(msg: &Message) -> bool {
    msg.text().is_some_and(|text| parse_command(text).is_none())
}
