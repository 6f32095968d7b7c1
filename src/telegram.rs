//! Telegram Bot integration
//!
//! Long-polling teloxide dispatcher feeding `BotHandlers`, plus the
//! `ChannelSender` implementation used to reply.
//!
//! Uses explicit Dispatcher pattern for reliable message polling.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{ParseMode as TgParseMode, Update},
};

use crate::channels::{ChannelError, ChannelSender, InboundMessage, ParseMode};
use crate::handlers::BotHandlers;

/// Longest chunk sent in one Telegram message
pub const MAX_MESSAGE_LEN: usize = 4000;

/// `ChannelSender` backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    async fn send_text(&self, chat_id: i64, text: &str, mode: ParseMode) -> Result<(), ChannelError> {
        let chat_id = ChatId(chat_id);

        if text.is_empty() {
            self.bot
                .send_message(chat_id, "(no response)")
                .await
                .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
            return Ok(());
        }

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            if mode == ParseMode::MarkdownV2 {
                match self
                    .bot
                    .send_message(chat_id, chunk)
                    .parse_mode(TgParseMode::MarkdownV2)
                    .await
                {
                    Ok(_) => continue,
                    Err(e) => {
                        // Malformed markup, fall back to plain text
                        tracing::debug!("MarkdownV2 send failed ({}), retrying as plain text", e);
                    }
                }
            }

            self.bot
                .send_message(chat_id, chunk)
                .await
                .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        }

        Ok(())
    }
}

/// Split `text` into pieces of at most `max` bytes on char boundaries
pub fn split_message(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = remaining
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or_else(|| remaining.chars().next().map_or(remaining.len(), char::len_utf8));
        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk);
        remaining = rest;
    }
    chunks
}

/// Transport-neutral view of a Telegram message.
///
/// `None` for non-text updates and for messages without a sender (channel
/// posts), which have no user to key a resume on.
pub fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text()?;
    let user = msg.from.as_ref()?;

    Some(InboundMessage {
        chat_id: msg.chat.id.0,
        user_id: user.id.0 as i64,
        first_name: user.first_name.clone(),
        text: text.to_string(),
    })
}

/// Check the token with getMe and clear any webhook so polling works
pub async fn verify_bot(bot: &Bot) -> Result<()> {
    tracing::info!("Verifying bot token...");
    match bot.get_me().await {
        Ok(me) => {
            tracing::info!(
                "Bot authenticated: @{} (ID: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            );
        }
        Err(e) => {
            tracing::error!("Failed to authenticate bot: {}", e);
            anyhow::bail!("Bot authentication failed: {}", e);
        }
    }

    tracing::info!("Clearing webhook (if any)...");
    if let Err(e) = bot.delete_webhook().await {
        tracing::warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    Ok(())
}

/// Run the long-polling dispatcher until Ctrl-C
pub async fn run_telegram_bot(bot: Bot, handlers: Arc<BotHandlers>) -> Result<()> {
    let handler = dptree::entry().branch(Update::filter_message().endpoint(message_handler));

    tracing::info!("Starting dispatcher with long polling...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![handlers])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in message handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::warn!("Dispatcher stopped");
    Ok(())
}

/// Message handler endpoint for the dispatcher
async fn message_handler(msg: Message, handlers: Arc<BotHandlers>) -> ResponseResult<()> {
    let Some(inbound) = to_inbound(&msg) else {
        tracing::debug!("Ignoring non-text or senderless message in chat {}", msg.chat.id);
        return Ok(());
    };

    tracing::info!(
        ">>> Message received: user={}, chat={}, text={:?}",
        inbound.user_id,
        inbound.chat_id,
        inbound.preview()
    );

    // Workflows run detached; their handles are not needed here
    let _ = handlers.dispatch(inbound).await;

    Ok(())
}
