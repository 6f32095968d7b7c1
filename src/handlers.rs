//! Command handlers
//!
//! `/hello`, `/start` and echo replies are sent inline. `/setup` and
//! `/generate` run on their own task so a slow store or completion call
//! never holds up the update loop; a semaphore caps how many of those
//! tasks do work at the same time.

use std::sync::Arc;
use teloxide::utils::markdown;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channels::{ChannelSender, InboundMessage, ParseMode};
use crate::commands::{Argument, Command};
use crate::completion::{Completer, CompletionError};
use crate::prompt::{ArtifactKind, GenerationRequest};
use crate::store::ResumeStore;

pub const SETUP_USAGE: &str = "please provide your resume too. Like '/setup ...'";
pub const SETUP_TOO_SHORT: &str = "resume too short";
pub const SETUP_DONE: &str = "resume saved";
pub const GENERATE_USAGE: &str = "please provide job description too. Like '/generate ...'";
pub const GENERATE_TOO_SHORT: &str = "job description too short";
pub const NO_RESUME: &str = "resume is not provided. Do /setup first";
pub const GENERATING_RESUME: &str = "generating resume";
pub const GENERATING_COVER_LETTER: &str = "generating cover letter";

/// Shared dependencies of every command workflow
pub struct BotHandlers {
    store: Arc<ResumeStore>,
    completer: Arc<dyn Completer>,
    sender: Arc<dyn ChannelSender>,
    jobs: Arc<Semaphore>,
}

impl BotHandlers {
    pub fn new(
        store: Arc<ResumeStore>,
        completer: Arc<dyn Completer>,
        sender: Arc<dyn ChannelSender>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            store,
            completer,
            sender,
            jobs: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Route one inbound message.
    ///
    /// Returns the handle of the spawned workflow for `/setup` and
    /// `/generate`; the caller may drop it.
    pub async fn dispatch(self: &Arc<Self>, msg: InboundMessage) -> Option<JoinHandle<()>> {
        let command = Command::parse(&msg.text);
        debug!("Dispatching {} for user {}", command.name(), msg.user_id);

        match command {
            Command::Hello => {
                self.hello(&msg).await;
                None
            }
            Command::Start => {
                self.start(&msg).await;
                None
            }
            Command::Echo => {
                self.respond_with(msg.chat_id, &msg.text, ParseMode::Plain).await;
                None
            }
            Command::Setup(arg) => Some(self.spawn_job(msg, move |this, msg| async move {
                this.setup(&msg, arg).await
            })),
            Command::Generate(arg) => Some(self.spawn_job(msg, move |this, msg| async move {
                this.generate(&msg, arg).await
            })),
        }
    }

    fn spawn_job<F, Fut>(self: &Arc<Self>, msg: InboundMessage, job: F) -> JoinHandle<()>
    where
        F: FnOnce(Arc<Self>, InboundMessage) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let permit = match Arc::clone(&this.jobs).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Job queue closed, dropping message from user {}", msg.user_id);
                    return;
                }
            };
            job(Arc::clone(&this), msg).await;
            drop(permit);
        })
    }

    async fn hello(&self, msg: &InboundMessage) {
        let text = format!("Hello, *{}*", markdown::escape(&msg.first_name));
        self.respond_with(msg.chat_id, &text, ParseMode::MarkdownV2).await;
    }

    async fn start(&self, msg: &InboundMessage) {
        let text = format!(
            "Hello {}, please provide your resume via command /setup ...",
            msg.first_name
        );
        self.respond(msg.chat_id, &text).await;
    }

    async fn setup(&self, msg: &InboundMessage, arg: Argument) {
        let resume_text = match arg {
            Argument::Missing => return self.respond(msg.chat_id, SETUP_USAGE).await,
            Argument::Blank => return self.respond(msg.chat_id, SETUP_TOO_SHORT).await,
            Argument::Text(text) => text,
        };

        match self.store.save(msg.user_id, &resume_text).await {
            Ok(()) => {
                info!("Stored resume for user {} ({} bytes)", msg.user_id, resume_text.len());
                self.respond(msg.chat_id, SETUP_DONE).await;
            }
            Err(e) => {
                error!("Failed to store resume for user {}: {}", msg.user_id, e);
                self.respond(msg.chat_id, &format!("could not save resume: {}", e)).await;
            }
        }
    }

    async fn generate(&self, msg: &InboundMessage, arg: Argument) {
        let job_description = match arg {
            Argument::Missing => return self.respond(msg.chat_id, GENERATE_USAGE).await,
            Argument::Blank => return self.respond(msg.chat_id, GENERATE_TOO_SHORT).await,
            Argument::Text(text) => text,
        };

        let resume = match self.store.load(msg.user_id).await {
            Ok(resume) => resume,
            Err(e) => {
                error!("Failed to load resume for user {}: {}", msg.user_id, e);
                return self.respond(msg.chat_id, &format!("could not load resume: {}", e)).await;
            }
        };

        if resume.is_empty() {
            return self.respond(msg.chat_id, NO_RESUME).await;
        }

        self.respond(msg.chat_id, GENERATING_RESUME).await;
        let generated_resume = match self
            .generate_artifact(ArtifactKind::Resume, &job_description, &resume)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                return self
                    .respond(msg.chat_id, &format!("could not generate resume: {}", e))
                    .await
            }
        };
        self.respond(msg.chat_id, &generated_resume).await;

        // The cover letter is seeded with the freshly generated resume
        self.respond(msg.chat_id, GENERATING_COVER_LETTER).await;
        match self
            .generate_artifact(ArtifactKind::CoverLetter, &job_description, &generated_resume)
            .await
        {
            Ok(text) => self.respond(msg.chat_id, &text).await,
            Err(e) => {
                self.respond(msg.chat_id, &format!("could not generate cover letter: {}", e))
                    .await
            }
        }
    }

    async fn generate_artifact(
        &self,
        kind: ArtifactKind,
        job_description: &str,
        resume_seed: &str,
    ) -> Result<String, CompletionError> {
        let request = GenerationRequest {
            kind,
            job_description,
            resume_seed,
        };

        self.completer.complete(&request.prompt()).await.map_err(|e| {
            warn!("Failed to generate {}: {}", kind, e);
            e
        })
    }

    async fn respond(&self, chat_id: i64, text: &str) {
        self.respond_with(chat_id, text, ParseMode::Plain).await
    }

    async fn respond_with(&self, chat_id: i64, text: &str, mode: ParseMode) {
        debug!("respond chat={} mode={} len={}", chat_id, mode, text.len());
        if let Err(e) = self.sender.send_text(chat_id, text, mode).await {
            warn!("Failed to reply in chat {}: {}", chat_id, e);
        }
    }
}
