//! Chat transport abstraction
//!
//! Command handlers only see `ChannelSender` and `InboundMessage`; the
//! Telegram implementation lives in `crate::telegram`.

pub mod traits;

pub use traits::{ChannelError, ChannelSender, InboundMessage, ParseMode};
