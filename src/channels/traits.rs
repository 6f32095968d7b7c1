//! Channel Trait Definitions
//!
//! Transport-neutral message types and the sending interface the
//! command handlers talk to.

use async_trait::async_trait;
use std::fmt;

/// Error types for channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Parse mode for message formatting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Telegram MarkdownV2; caller is responsible for escaping
    MarkdownV2,
    #[default]
    Plain,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::MarkdownV2 => write!(f, "markdown_v2"),
            ParseMode::Plain => write!(f, "plain"),
        }
    }
}

/// Inbound text message, stripped of platform specifics
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Chat to reply into
    pub chat_id: i64,

    /// Sender; keys the resume store
    pub user_id: i64,

    /// Sender display name
    pub first_name: String,

    /// Message body
    pub text: String,
}

impl InboundMessage {
    pub fn new(chat_id: i64, user_id: i64, first_name: &str, text: &str) -> Self {
        Self {
            chat_id,
            user_id,
            first_name: first_name.to_string(),
            text: text.to_string(),
        }
    }

    /// Short preview for log lines
    pub fn preview(&self) -> String {
        self.text.chars().take(50).collect()
    }
}

/// Sender trait for outbound replies
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, mode: ParseMode) -> Result<(), ChannelError>;
}
