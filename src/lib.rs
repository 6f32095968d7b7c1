//! resumebot
//!
//! Telegram bot that tailors a stored resume and a cover letter to a job
//! description using an OpenAI-compatible chat completion API.
//!
//! # Commands
//!
//! - `/hello` - greeting
//! - `/start` - greeting with setup instructions
//! - `/setup <resume>` - store the sender's resume
//! - `/generate <job description>` - tailored resume, then a cover letter
//!   seeded with that generated resume
//! - anything else is echoed back
//!
//! # Architecture
//!
//! ```text
//! Telegram ──► teloxide Dispatcher ──► BotHandlers ──► ResumeStore (resumes.json)
//!                                          │
//!                                          ├── prompt::build_prompt
//!                                          └── CompletionClient ──► LLM API
//!
//! HTTP ──► axum fallback route ──► "Hello from resumebot"
//! ```

pub mod channels;
pub mod commands;
pub mod completion;
pub mod config;
pub mod handlers;
pub mod health;
pub mod prompt;
pub mod store;
pub mod telegram;


pub use channels::{ChannelError, ChannelSender, InboundMessage, ParseMode};
pub use commands::{Argument, Command};
pub use completion::{Completer, CompletionClient, CompletionError};
pub use config::{Config, ConfigError};
pub use handlers::BotHandlers;
pub use prompt::{build_prompt, ArtifactKind, GenerationRequest};
pub use store::{ResumeStore, StoreError};
pub use telegram::TelegramSender;
